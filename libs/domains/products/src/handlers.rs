//! HTTP handlers for Products API

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use axum_helpers::{
    errors::responses::{BadRequestResponse, InternalServerErrorResponse},
    AppError, JsonBody,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::models::{InsertAck, Product, ProductPage};
use crate::query::ListParams;
use crate::repository::ProductRepository;
use crate::service::ProductService;

/// OpenAPI documentation for Products API
#[derive(OpenApi)]
#[openapi(
    paths(list_products, create_product),
    components(
        schemas(Product, ProductPage, InsertAck, ListParams),
        responses(BadRequestResponse, InternalServerErrorResponse)
    ),
    tags(
        (name = "Products", description = "Product catalog endpoints")
    )
)]
pub struct ApiDoc;

/// Collection path served by [`router`]
pub const PRODUCTS_PATH: &str = "/products";

/// Create the products router, serving `/products` with and without a trailing slash
pub fn router<R: ProductRepository + 'static>(service: ProductService<R>) -> Router {
    let shared_service = Arc::new(service);
    let collection = get(list_products::<R>).post(create_product::<R>);

    Router::new()
        .route(PRODUCTS_PATH, collection.clone())
        .route("/products/", collection)
        .with_state(shared_service)
}

/// List products with filters, sorting and pagination
#[utoipa::path(
    get,
    path = "",
    tag = "Products",
    params(ListParams),
    responses(
        (status = 200, description = "One page of matching products", body = ProductPage),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_products<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    pairs: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Json<ProductPage>, AppError> {
    let Query(pairs) = pairs?;
    let page = service.list_products(ListParams::from_pairs(pairs)).await?;
    Ok(Json(page))
}

/// Insert a product; any client `createdAt` is replaced by the server time
#[utoipa::path(
    post,
    path = "",
    tag = "Products",
    request_body(content = Product, description = "Arbitrary product fields"),
    responses(
        (status = 200, description = "Insert acknowledged", body = InsertAck),
        (status = 400, response = BadRequestResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn create_product<R: ProductRepository>(
    State(service): State<Arc<ProductService<R>>>,
    JsonBody(body): JsonBody<Map<String, Value>>,
) -> Result<Json<InsertAck>, AppError> {
    let ack = service.create_product(body).await?;
    Ok(Json(ack))
}
