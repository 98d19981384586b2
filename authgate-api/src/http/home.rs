//! Home and logout endpoints

use axum::{extract::State, response::Response, routing::get, Json, Router};
use authgate_core::CredentialRecord;
use serde::Serialize;
use tracing::info;

use super::login::found;
use super::AppState;

#[derive(Debug, Serialize)]
pub struct ProviderLink {
    pub id: String,
    pub kind: String,
    pub login_url: String,
}

#[derive(Debug, Serialize)]
pub struct HomeResponse {
    pub providers: Vec<ProviderLink>,
    pub credentials: Vec<CredentialRecord>,
}

pub fn create_home_router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/logout/", get(logout))
}

/// Configured providers with their login links, plus the logins seen so far
pub async fn home(State(state): State<AppState>) -> Json<HomeResponse> {
    let providers = state
        .login_service
        .providers()
        .into_iter()
        .map(|p| ProviderLink {
            id: p.id,
            kind: p.kind,
            login_url: p.login_path,
        })
        .collect();

    Json(HomeResponse {
        providers,
        credentials: state.credentials.list(),
    })
}

pub async fn logout(State(state): State<AppState>) -> Response {
    let cleared = state.credentials.len();
    state.credentials.clear();
    info!(cleared, "Credential store cleared");
    found("/")
}
