//! Product Service - list and create orchestration

use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::instrument;

use crate::error::ProductResult;
use crate::models::{InsertAck, NewProduct, ProductPage};
use crate::query::{build_query, ListParams};
use crate::repository::ProductRepository;

/// Product service providing the list and create operations
pub struct ProductService<R: ProductRepository> {
    repository: Arc<R>,
}

impl<R: ProductRepository> ProductService<R> {
    /// Create a new ProductService with the given repository
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// Build the query, then fetch the page and count the full match set.
    ///
    /// The two reads run concurrently and are not isolated from each other,
    /// so under concurrent writes `totalProducts` may disagree with `products`.
    #[instrument(skip(self))]
    pub async fn list_products(&self, params: ListParams) -> ProductResult<ProductPage> {
        let query = build_query(&params);

        let (products, total_products) = tokio::try_join!(
            self.repository.find(&query),
            self.repository.count(&query.filter),
        )?;

        Ok(ProductPage {
            products,
            total_pages: query.total_pages(total_products),
            current_page: query.page,
            total_products,
        })
    }

    /// Stamp the body with the server clock and insert it
    #[instrument(skip(self, body))]
    pub async fn create_product(&self, body: Map<String, Value>) -> ProductResult<InsertAck> {
        let product = NewProduct::stamped(body, Utc::now());
        self.repository.insert(product).await
    }
}

impl<R: ProductRepository> Clone for ProductService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProductError;
    use crate::models::Product;
    use crate::repository::MockProductRepository;
    use serde_json::json;

    fn product(value: Value) -> Product {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_list_products_builds_envelope() {
        let mut mock = MockProductRepository::new();
        mock.expect_find()
            .withf(|query| query.skip.value() == 10.0 && query.limit.value() == 5.0)
            .returning(|_| Ok(vec![product(json!({ "name": "A" }))]));
        mock.expect_count().returning(|_| Ok(12));

        let service = ProductService::new(mock);
        let page = service
            .list_products(ListParams {
                page: Some("3".to_string()),
                limit: Some("5".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.products.len(), 1);
        assert_eq!(page.total_products, 12);
        assert_eq!(page.total_pages.value(), 3.0);
        assert_eq!(page.current_page.value(), 3.0);
    }

    #[tokio::test]
    async fn test_list_products_passes_same_filter_to_count() {
        let mut mock = MockProductRepository::new();
        mock.expect_find().returning(|_| Ok(vec![]));
        mock.expect_count()
            .withf(|filter| filter.conditions.len() == 2)
            .returning(|_| Ok(0));

        let service = ProductService::new(mock);
        let page = service
            .list_products(ListParams {
                brand: Some("Acme".to_string()),
                search: Some("wid".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total_pages.value(), 0.0);
    }

    #[tokio::test]
    async fn test_list_products_fails_when_find_fails() {
        let mut mock = MockProductRepository::new();
        mock.expect_find()
            .returning(|_| Err(ProductError::Database("connection refused".to_string())));
        mock.expect_count().returning(|_| Ok(3));

        let service = ProductService::new(mock);
        let err = service
            .list_products(ListParams::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "connection refused");
    }

    #[tokio::test]
    async fn test_list_products_fails_when_count_fails() {
        let mut mock = MockProductRepository::new();
        mock.expect_find().returning(|_| Ok(vec![]));
        mock.expect_count()
            .returning(|_| Err(ProductError::Database("count timed out".to_string())));

        let service = ProductService::new(mock);
        let result = service.list_products(ListParams::default()).await;
        assert!(matches!(result, Err(ProductError::Database(_))));
    }

    #[tokio::test]
    async fn test_create_product_overrides_created_at() {
        let before = Utc::now();

        let mut mock = MockProductRepository::new();
        mock.expect_insert()
            .withf(move |product| {
                !product.fields.contains_key("createdAt")
                    && product.created_at >= before
                    && product.fields.get("name") == Some(&json!("Widget"))
            })
            .times(1)
            .returning(|_| Ok(InsertAck::new(json!("665f1c2e8b3e4a0012a3b4c5"))));

        let service = ProductService::new(mock);
        let body = match json!({ "name": "Widget", "createdAt": "2001-01-01T00:00:00.000Z" }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };

        let ack = service.create_product(body).await.unwrap();
        assert!(ack.acknowledged);
    }

    #[tokio::test]
    async fn test_create_product_propagates_storage_failure() {
        let mut mock = MockProductRepository::new();
        mock.expect_insert()
            .returning(|_| Err(ProductError::Database("not primary".to_string())));

        let service = ProductService::new(mock);
        let err = service.create_product(Map::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "not primary");
    }
}
