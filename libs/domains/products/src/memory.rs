//! In-memory implementation of ProductRepository

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{ProductError, ProductResult};
use crate::models::{InsertAck, NewProduct, Product};
use crate::query::{ProductFilter, ProductQuery};
use crate::repository::ProductRepository;

/// Process-local product store with the same filter, sort and pagination
/// semantics as the MongoDB repository. Unsorted reads return insertion order.
#[derive(Clone, Default)]
pub struct InMemoryProductRepository {
    products: Arc<RwLock<Vec<Product>>>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with already-stored products
    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            products: Arc::new(RwLock::new(products)),
        }
    }

    pub async fn len(&self) -> usize {
        self.products.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.products.read().await.is_empty()
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn find(&self, query: &ProductQuery) -> ProductResult<Vec<Product>> {
        let products = self.products.read().await;

        let mut matched: Vec<Product> = products
            .iter()
            .filter(|p| query.filter.matches(p))
            .cloned()
            .collect();

        if let Some(sort) = query.sort {
            matched.sort_by(|a, b| sort.compare(a, b));
        }

        let skip = usize::try_from(query.skip_count()).unwrap_or(usize::MAX);
        let take = match query.page_size() {
            0 => usize::MAX,
            size => usize::try_from(size.unsigned_abs()).unwrap_or(usize::MAX),
        };

        Ok(matched.into_iter().skip(skip).take(take).collect())
    }

    async fn count(&self, filter: &ProductFilter) -> ProductResult<u64> {
        let products = self.products.read().await;
        Ok(products.iter().filter(|p| filter.matches(p)).count() as u64)
    }

    async fn insert(&self, product: NewProduct) -> ProductResult<InsertAck> {
        let mut products = self.products.write().await;

        let id = match product.id() {
            Some(id) => id.clone(),
            None => Value::String(ObjectId::new().to_hex()),
        };

        if products.iter().any(|p| p.id() == Some(&id)) {
            return Err(ProductError::Database(format!(
                "E11000 duplicate key error collection: products index: _id_ dup key: {{ _id: {} }}",
                id
            )));
        }

        products.push(product.into_product(id.clone()));

        tracing::info!(product_id = %id, "Product created successfully");
        Ok(InsertAck::new(id))
    }
}
