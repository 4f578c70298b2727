use async_trait::async_trait;

use crate::error::ProductResult;
use crate::models::{InsertAck, NewProduct, Product};
use crate::query::{ProductFilter, ProductQuery};

/// Repository trait for Product persistence
///
/// `find` and `count` receive the same filter for one list request but are
/// independent reads; no snapshot ties them together.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Fetch one page of products matching the query, in its sort order
    async fn find(&self, query: &ProductQuery) -> ProductResult<Vec<Product>>;

    /// Count every product matching the filter, ignoring pagination
    async fn count(&self, filter: &ProductFilter) -> ProductResult<u64>;

    /// Insert a stamped product
    async fn insert(&self, product: NewProduct) -> ProductResult<InsertAck>;
}
