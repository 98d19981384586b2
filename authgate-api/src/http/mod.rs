// Module: http
// Browser-facing login endpoints

pub mod error;
pub mod health;
pub mod home;
pub mod login;

use axum::Router;
use authgate_core::bootstrap::Services;
use authgate_core::{CredentialStore, LoginService};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub login_service: LoginService,
    pub credentials: Arc<CredentialStore>,
    pub success_path: Arc<str>,
}

impl From<Services> for AppState {
    fn from(services: Services) -> Self {
        Self {
            login_service: services.login_service,
            credentials: services.credentials,
            success_path: services.success_path.into(),
        }
    }
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Liveness for load balancers
        .merge(health::create_health_router())
        .merge(home::create_home_router())
        // One login and one callback route per configured provider
        .merge(login::create_login_router(&state))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::not_found("Not found")
}
