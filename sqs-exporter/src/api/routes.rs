//! Scrape and health routes.

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::get,
};

use crate::api::server::AppState;
use crate::metrics::CONTENT_TYPE;

/// Path of the Prometheus scrape endpoint.
pub const METRICS_PATH: &str = "/metrics";

/// Path of the health endpoint.
pub const HEALTH_PATH: &str = "/healthz";

/// Create the router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(METRICS_PATH, get(metrics))
        .route(HEALTH_PATH, get(healthcheck))
        .with_state(state)
}

/// Current metric snapshot in Prometheus text format.
async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, CONTENT_TYPE)],
        state.exporter.export(),
    )
}

/// Empty 200 response for health checks.
async fn healthcheck() -> StatusCode {
    StatusCode::OK
}
