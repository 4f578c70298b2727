//! JSON extractor whose rejections use the standard error body.

use crate::errors::AppError;
use axum::extract::{FromRequest, Json, Request};
use serde::de::DeserializeOwned;

/// JSON body extractor.
///
/// Behaves like [`axum::Json`] but rejects with [`AppError`], so malformed or
/// mistyped bodies produce `{ "message": ... }` instead of plain text.
///
/// # Example
/// ```ignore
/// use axum_helpers::extractors::JsonBody;
/// use serde_json::{Map, Value};
///
/// async fn create(JsonBody(body): JsonBody<Map<String, Value>>) -> String {
///     format!("{} fields", body.len())
/// }
/// ```
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(data))
    }
}
