//! Products API routes

use axum::Router;
use domain_products::{handlers, MongoProductRepository, ProductService};

use crate::state::AppState;

/// Create the `/products` router over the configured collection
pub fn router(state: &AppState) -> Router {
    let repository =
        MongoProductRepository::with_collection(&state.db, state.config.mongodb.collection());
    let service = ProductService::new(repository);
    handlers::router(service)
}
