//! Health check endpoints

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use axum_helpers::{health_router, run_health_checks, HealthCheckFuture};

use crate::state::AppState;

/// Readiness: 200 when MongoDB answers a ping, 503 otherwise
async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let checks: Vec<(&str, HealthCheckFuture)> = vec![(
        "mongodb",
        Box::pin(async {
            database::mongodb::ping(&state.mongo_client)
                .await
                .map_err(|e| e.to_string())
        }),
    )];

    run_health_checks(checks).await
}

pub fn router(state: AppState) -> Router {
    let app_info = state.config.app;

    Router::new()
        .route("/ready", get(ready))
        .with_state(state)
        .merge(health_router(app_info))
}
