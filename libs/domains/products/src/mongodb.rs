//! MongoDB implementation of ProductRepository

use async_trait::async_trait;
use database::mongodb::DEFAULT_COLLECTION;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{self, doc, Bson, Document},
    options::FindOptions,
    Collection, Database,
};
use serde_json::{Map, Value};
use tracing::instrument;

use crate::error::ProductResult;
use crate::models::{format_timestamp, InsertAck, NewProduct, Product, CREATED_AT_FIELD};
use crate::query::{FieldCondition, ProductFilter, ProductQuery, SortOrder};
use crate::repository::ProductRepository;

/// MongoDB implementation of the ProductRepository
///
/// Documents are read and written untyped so that arbitrary client fields
/// survive a round-trip.
#[derive(Clone)]
pub struct MongoProductRepository {
    collection: Collection<Document>,
}

impl MongoProductRepository {
    /// Use the default `products` collection
    pub fn new(db: &Database) -> Self {
        Self::with_collection(db, DEFAULT_COLLECTION)
    }

    /// Create a new MongoProductRepository with a custom collection name
    pub fn with_collection(db: &Database, collection_name: &str) -> Self {
        Self::from_collection(db.collection::<Document>(collection_name))
    }

    pub fn from_collection(collection: Collection<Document>) -> Self {
        Self { collection }
    }

    /// Get the underlying collection for advanced operations
    pub fn collection(&self) -> &Collection<Document> {
        &self.collection
    }

    /// Build a MongoDB filter document from a ProductFilter
    fn build_filter(filter: &ProductFilter) -> Document {
        let mut doc = doc! {};

        for condition in &filter.conditions {
            match condition {
                FieldCondition::Contains { field, needle } => {
                    doc.insert(
                        *field,
                        doc! { "$regex": regex::escape(needle), "$options": "i" },
                    );
                }
                FieldCondition::Equals { field, value } => {
                    doc.insert(*field, value.as_str());
                }
                FieldCondition::Between { field, min, max } => {
                    doc.insert(*field, doc! { "$gte": *min, "$lte": *max });
                }
            }
        }

        doc
    }

    fn build_sort(sort: SortOrder) -> Document {
        let mut doc = Document::new();
        doc.insert(sort.field(), sort.direction());
        doc
    }

    fn find_options(query: &ProductQuery) -> FindOptions {
        FindOptions::builder()
            .skip(query.skip_count())
            .limit(query.page_size())
            .sort(query.sort.map(Self::build_sort))
            .build()
    }
}

#[async_trait]
impl ProductRepository for MongoProductRepository {
    #[instrument(skip(self))]
    async fn find(&self, query: &ProductQuery) -> ProductResult<Vec<Product>> {
        let filter = Self::build_filter(&query.filter);

        let cursor = self
            .collection
            .find(filter)
            .with_options(Self::find_options(query))
            .await?;
        let documents: Vec<Document> = cursor.try_collect().await?;

        Ok(documents.into_iter().map(document_to_product).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self, filter: &ProductFilter) -> ProductResult<u64> {
        let count = self
            .collection
            .count_documents(Self::build_filter(filter))
            .await?;
        Ok(count)
    }

    #[instrument(skip(self, product))]
    async fn insert(&self, product: NewProduct) -> ProductResult<InsertAck> {
        let mut document = bson::to_document(&product.fields)?;
        document.insert(
            CREATED_AT_FIELD,
            bson::DateTime::from_millis(product.created_at.timestamp_millis()),
        );

        let result = self.collection.insert_one(document).await?;
        let inserted_id = bson_to_json(result.inserted_id);

        tracing::info!(product_id = %inserted_id, "Product created successfully");
        Ok(InsertAck::new(inserted_id))
    }
}

fn document_to_product(document: Document) -> Product {
    Product::new(document_to_map(document))
}

fn document_to_map(document: Document) -> Map<String, Value> {
    document
        .into_iter()
        .map(|(key, value)| (key, bson_to_json(value)))
        .collect()
}

/// Render a BSON value the way HTTP clients expect it: ObjectIds as hex
/// strings, dates as ISO-8601, everything exotic as relaxed extended JSON.
fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::ObjectId(oid) => Value::String(oid.to_hex()),
        Bson::DateTime(dt) => match chrono::DateTime::from_timestamp_millis(dt.timestamp_millis())
        {
            Some(ts) => Value::String(format_timestamp(&ts)),
            None => Bson::DateTime(dt).into_relaxed_extjson(),
        },
        Bson::Double(number) => serde_json::Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Bson::Int32(number) => Value::from(number),
        Bson::Int64(number) => Value::from(number),
        Bson::String(text) => Value::String(text),
        Bson::Boolean(flag) => Value::Bool(flag),
        Bson::Null | Bson::Undefined => Value::Null,
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Document(document) => Value::Object(document_to_map(document)),
        other => other.into_relaxed_extjson(),
    }
}
