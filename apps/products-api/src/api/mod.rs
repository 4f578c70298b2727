//! API routes module

pub mod health;
pub mod products;

use axum::{routing::get, Router};

use crate::state::AppState;

/// Plain-text liveness message served at `/`
pub const ROOT_MESSAGE: &str = "Vista mart server is running";

/// Create all API routes
pub fn routes(state: &AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .merge(products::router(state))
        .merge(health::router(state.clone()))
}

async fn root() -> &'static str {
    ROOT_MESSAGE
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_root_returns_plain_text() {
        let app = Router::new().route("/", get(root));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], ROOT_MESSAGE.as_bytes());
    }
}
