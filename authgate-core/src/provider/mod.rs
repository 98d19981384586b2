//! Identity provider adapters
//!
//! Every configured provider is served by one adapter. Three variants exist:
//!
//! 1. **Generic OAuth2**: authorization code + PKCE, optional userinfo fetch
//! 2. **OIDC**: the same code flow plus discovery and ID token validation
//!    (Google, Twitch and custom OIDC providers)
//! 3. **OpenID 2.0**: indirect identifier assertions checked back with the
//!    provider (Steam)
//!
//! Adapters never touch shared state. Whatever a callback needs later is
//! handed back in [`AuthRedirect::pending`] and stored by the caller.

pub mod config;
pub mod flow;
pub mod generic;
pub mod oidc;
pub mod openid;

pub use config::{
    Protocol, ProviderConfig, ProviderEndpoints, ProviderKind, ProviderSettings, TokenAuthMethod,
};
pub use generic::OAuth2Adapter;
pub use oidc::OidcAdapter;
pub use openid::OpenIdAdapter;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::models::{AuthRedirect, AuthRequest, CallbackRequest, Credential};
use crate::{Error, Result};

/// Provider adapter trait
///
/// `build_redirect` produces the location the browser is sent to,
/// `handle_callback` turns the provider's answer into a [`Credential`].
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Configured instance id (e.g. "google", "my_provider")
    fn id(&self) -> &str;

    fn kind(&self) -> ProviderKind;

    /// Build the provider authorization redirect for one login attempt
    async fn build_redirect(&self, request: &AuthRequest) -> Result<AuthRedirect>;

    /// Verify the callback and normalize the result
    async fn handle_callback(&self, callback: CallbackRequest) -> Result<Credential>;
}

/// Outbound HTTP client shared by the adapters.
///
/// Redirects are never followed: token, userinfo and verification endpoints
/// must answer directly.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(timeout)
        .user_agent(concat!("authgate/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {e}")))
}

/// Create the adapter for a resolved provider
pub fn create_adapter(settings: ProviderSettings) -> Result<Arc<dyn ProviderAdapter>> {
    let http = http_client(settings.timeout)?;

    let adapter: Arc<dyn ProviderAdapter> = match settings.endpoints.clone() {
        ProviderEndpoints::OAuth2 {
            authorize_url,
            token_url,
            userinfo_url,
        } => Arc::new(OAuth2Adapter::new(
            settings,
            &authorize_url,
            &token_url,
            userinfo_url,
            http,
        )),
        ProviderEndpoints::Oidc { discovery_url } => {
            Arc::new(OidcAdapter::new(settings, discovery_url, http))
        }
        ProviderEndpoints::OpenId2 { login_url } => Arc::new(OpenIdAdapter::new(settings, login_url, http)),
    };

    tracing::debug!(
        provider = adapter.id(),
        kind = %adapter.kind(),
        "Provider adapter created"
    );

    Ok(adapter)
}
