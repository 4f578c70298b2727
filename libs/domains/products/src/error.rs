use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use mongodb::bson;
use thiserror::Error;

/// Failures surfaced by the products domain.
///
/// Both variants are storage-side problems; the client always sees a 500
/// whose `message` is the underlying error text.
#[derive(Debug, Error)]
pub enum ProductError {
    #[error("{0}")]
    Database(String),

    #[error("{0}")]
    Encoding(String),
}

pub type ProductResult<T> = Result<T, ProductError>;

impl From<ProductError> for AppError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::Database(msg) => AppError::InternalServerError(msg),
            ProductError::Encoding(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for ProductError {
    fn into_response(self) -> Response {
        let app_error: AppError = self.into();
        app_error.into_response()
    }
}

impl From<mongodb::error::Error> for ProductError {
    fn from(err: mongodb::error::Error) -> Self {
        ProductError::Database(err.to_string())
    }
}

impl From<bson::ser::Error> for ProductError {
    fn from(err: bson::ser::Error) -> Self {
        ProductError::Encoding(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_database_error_keeps_raw_message() {
        let err = ProductError::Database("connection refused".to_string());
        assert_eq!(err.to_string(), "connection refused");
    }

    #[test]
    fn test_errors_map_to_internal_server_error() {
        let response = ProductError::Database("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = ProductError::Encoding("bad value".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
