//! Liveness endpoint
//!
//! `/health` answers from the process alone. It never contacts an identity
//! provider, so an outage at Google or Steam does not pull authgate out of a
//! load balancer pool.

use axum::{response::IntoResponse, routing::get, Router};

use crate::http::AppState;

pub fn create_health_router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// Plain-text `OK` while the listener is up
pub async fn health_check() -> impl IntoResponse {
    "OK"
}
