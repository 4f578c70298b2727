use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::query::NumericParam;

/// Server-assigned creation timestamp field
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Storage identifier field
pub const ID_FIELD: &str = "_id";

/// A stored product.
///
/// Products are schemaless: whatever fields a client posted are kept as-is,
/// plus `_id` and `createdAt` added on insert. The query builder only looks
/// at `name`, `brand`, `category`, `price` and `createdAt`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub fields: Map<String, Value>,
}

impl Product {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Value::as_f64)
    }

    pub fn id(&self) -> Option<&Value> {
        self.get(ID_FIELD)
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("name")
    }

    pub fn brand(&self) -> Option<&str> {
        self.get_str("brand")
    }

    pub fn category(&self) -> Option<&str> {
        self.get_str("category")
    }

    pub fn price(&self) -> Option<f64> {
        self.get_f64("price")
    }

    /// Creation time, if the product carries a parseable `createdAt`
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.get_str(CREATED_AT_FIELD)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// A product about to be inserted, already stamped with its creation time
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    /// Client fields, without any client-supplied `createdAt`
    pub fields: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl NewProduct {
    /// Stamp a request body with the server clock, replacing any client value
    pub fn stamped(mut fields: Map<String, Value>, now: DateTime<Utc>) -> Self {
        fields.remove(CREATED_AT_FIELD);
        Self {
            fields,
            created_at: now,
        }
    }

    /// Client-supplied `_id`, if any
    pub fn id(&self) -> Option<&Value> {
        self.fields.get(ID_FIELD)
    }

    /// Materialize the stored form under the given identifier
    pub fn into_product(self, id: Value) -> Product {
        let mut fields = self.fields;
        fields.insert(ID_FIELD.to_string(), id);
        fields.insert(
            CREATED_AT_FIELD.to_string(),
            Value::String(format_timestamp(&self.created_at)),
        );
        Product { fields }
    }
}

/// Storage acknowledgement of an insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InsertAck {
    pub acknowledged: bool,
    #[serde(rename = "insertedId")]
    #[schema(value_type = String, example = "665f1c2e8b3e4a0012a3b4c5")]
    pub inserted_id: Value,
}

impl InsertAck {
    pub fn new(inserted_id: Value) -> Self {
        Self {
            acknowledged: true,
            inserted_id,
        }
    }
}

/// One page of `GET /products`
///
/// `totalPages` and `currentPage` echo the coerced numbers and may be `null`
/// when the request carried non-numeric paging values.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductPage {
    pub products: Vec<Product>,
    #[schema(value_type = Option<i64>)]
    pub total_pages: NumericParam,
    #[schema(value_type = Option<i64>)]
    pub current_page: NumericParam,
    pub total_products: u64,
}

/// ISO-8601 UTC with millisecond precision, e.g. `2025-01-02T03:04:05.678Z`
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_product_roundtrips_arbitrary_fields() {
        let body = json!({ "_id": "abc", "name": "Phone", "specs": { "ram": 8 } });
        let product: Product = serde_json::from_value(body.clone()).unwrap();

        assert_eq!(product.name(), Some("Phone"));
        assert_eq!(product.id(), Some(&json!("abc")));
        assert_eq!(serde_json::to_value(&product).unwrap(), body);
    }

    #[test]
    fn test_product_accessors_ignore_wrong_types() {
        let product = Product::new(fields(json!({ "price": "cheap", "brand": 3 })));
        assert_eq!(product.price(), None);
        assert_eq!(product.brand(), None);
        assert_eq!(product.category(), None);
        assert_eq!(product.created_at(), None);
    }

    #[test]
    fn test_stamped_replaces_client_created_at() {
        let now = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();
        let new_product =
            NewProduct::stamped(fields(json!({ "name": "X", "createdAt": "1999" })), now);

        assert!(!new_product.fields.contains_key("createdAt"));
        assert_eq!(new_product.created_at, now);

        let product = new_product.into_product(json!("id-1"));
        assert_eq!(product.get_str("createdAt"), Some("2025-03-04T05:06:07.000Z"));
        assert_eq!(product.created_at(), Some(now));
        assert_eq!(product.id(), Some(&json!("id-1")));
    }

    #[test]
    fn test_format_timestamp_uses_millis_and_z() {
        let dt = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert_eq!(format_timestamp(&dt), "2023-11-14T22:13:20.123Z");
    }

    #[test]
    fn test_insert_ack_shape() {
        let ack = InsertAck::new(json!("665f1c2e8b3e4a0012a3b4c5"));
        assert_eq!(
            serde_json::to_value(ack).unwrap(),
            json!({ "acknowledged": true, "insertedId": "665f1c2e8b3e4a0012a3b4c5" })
        );
    }

    #[test]
    fn test_page_serializes_camel_case() {
        let page = ProductPage {
            products: vec![],
            total_pages: NumericParam::new(0.0),
            current_page: NumericParam::new(f64::NAN),
            total_products: 0,
        };
        assert_eq!(
            serde_json::to_value(page).unwrap(),
            json!({ "products": [], "totalPages": 0, "currentPage": null, "totalProducts": 0 })
        );
    }
}
