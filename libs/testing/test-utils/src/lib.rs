//! Shared test utilities for domain testing
//!
//! - `TestMongo`: MongoDB container with automatic cleanup (feature: "mongo")
//! - `TestDataBuilder`: Deterministic test data generation (always available)
//! - `assertions`: Custom assertion helpers (always available)
//!
//! # Features
//!
//! - `mongo` (default): Enables MongoDB test infrastructure
//! - `all`: Enables all database test infrastructure
//!
//! # Usage
//!
//! ```rust,no_run
//! use test_utils::{TestDataBuilder, TestMongo};
//!
//! #[tokio::test]
//! async fn my_mongo_test() {
//!     let mongo = TestMongo::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_test");
//!
//!     let db = mongo.database(&builder.database_name());
//!     let product_name = builder.name("product", "main");
//! }
//! ```

#[cfg(feature = "mongo")]
mod mongo;

#[cfg(feature = "mongo")]
pub use mongo::TestMongo;

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded values.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_list_products");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Generate a unique name for testing
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::new(42);
    /// assert_eq!(builder.name("product", "main"), "test-product-42-main");
    /// ```
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }

    /// Database name private to this seed (MongoDB caps names at 63 bytes)
    pub fn database_name(&self) -> String {
        format!("test_{:x}", self.seed)
    }

    /// A price in `[1, 1000)` derived from the seed and an index
    pub fn price(&self, index: u64) -> u64 {
        (self.seed.wrapping_add(index.wrapping_mul(7919)) % 999) + 1
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }

    /// Assert that values never increase from one element to the next
    pub fn assert_non_increasing<T: PartialOrd + std::fmt::Debug>(values: &[T], context: &str) {
        for pair in values.windows(2) {
            assert!(
                pair[0] >= pair[1],
                "{}: {:?} is not in non-increasing order",
                context,
                values
            );
        }
    }

    /// Assert that values never decrease from one element to the next
    pub fn assert_non_decreasing<T: PartialOrd + std::fmt::Debug>(values: &[T], context: &str) {
        for pair in values.windows(2) {
            assert!(
                pair[0] <= pair[1],
                "{}: {:?} is not in non-decreasing order",
                context,
                values
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_builder_deterministic() {
        let builder1 = TestDataBuilder::new(42);
        let builder2 = TestDataBuilder::new(42);

        assert_eq!(builder1.database_name(), builder2.database_name());
        assert_eq!(
            builder1.name("product", "test"),
            builder2.name("product", "test")
        );
        assert_eq!(builder1.price(3), builder2.price(3));
    }

    #[test]
    fn test_data_builder_different_names() {
        let builder1 = TestDataBuilder::from_test_name("test1");
        let builder2 = TestDataBuilder::from_test_name("test2");

        assert_ne!(builder1.database_name(), builder2.database_name());
    }

    #[test]
    fn test_price_range() {
        let builder = TestDataBuilder::from_test_name("prices");
        for i in 0..50 {
            let price = builder.price(i);
            assert!((1..1000).contains(&price));
        }
    }

    #[test]
    fn test_order_assertions() {
        assertions::assert_non_increasing(&[3, 2, 2, 1], "desc");
        assertions::assert_non_decreasing(&[1.0, 1.5, 2.0], "asc");
    }

    #[test]
    #[should_panic(expected = "not in non-decreasing order")]
    fn test_order_assertion_panics() {
        assertions::assert_non_decreasing(&[2, 1], "asc");
    }
}
