use tower_http::cors::{Any, CorsLayer};

/// Accepts cross-origin requests from any origin with any method and header.
pub fn create_permissive_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_permissive_cors_allows_any_origin() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(create_permissive_cors_layer());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("origin", "https://shop.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }
}
