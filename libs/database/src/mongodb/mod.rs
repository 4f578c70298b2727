//! MongoDB connector and utilities
//!
//! Provides connection management and MongoDB-specific helpers.

mod config;
mod connector;
mod health;

pub use config::{DEFAULT_COLLECTION, DEFAULT_DATABASE, MongoConfig};
pub use connector::{client_options, connect, connect_from_config, connect_from_config_with_retry};
pub use health::ping;

// Re-export MongoDB types for convenience
pub use mongodb::{Client, Collection, Database};
