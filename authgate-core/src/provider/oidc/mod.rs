//! OpenID Connect adapter (Google, Twitch, custom OIDC providers)

pub mod discovery;
pub mod jwks;
pub mod validation;

#[cfg(test)]
mod fixtures;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use url::Url;

use self::discovery::discover;
use self::jwks::{JwksCache, JWKS_TTL};
use self::validation::{validate_id_token, Expectations};
use super::config::{ProviderKind, ProviderSettings};
use super::flow::CodeFlow;
use super::ProviderAdapter;
use crate::models::{AuthRedirect, AuthRequest, CallbackRequest, Credential};
use crate::{Error, Result};

/// Provider state derived from the metadata document
struct Discovered {
    issuer: String,
    flow: CodeFlow,
    jwks: JwksCache,
}

/// OIDC provider
///
/// Metadata is discovered on first use and kept for the adapter's lifetime;
/// a failed discovery is retried on the next request.
pub struct OidcAdapter {
    settings: ProviderSettings,
    discovery_url: Url,
    http: reqwest::Client,
    discovered: OnceCell<Discovered>,
}

impl OidcAdapter {
    #[must_use]
    pub fn new(settings: ProviderSettings, discovery_url: Url, http: reqwest::Client) -> Self {
        Self {
            settings,
            discovery_url,
            http,
            discovered: OnceCell::new(),
        }
    }

    async fn discovered(&self) -> Result<&Discovered> {
        self.discovered
            .get_or_try_init(|| async {
                let metadata = discover(&self.http, &self.discovery_url).await?;
                let flow = CodeFlow::new(
                    &self.settings,
                    &metadata.authorization_url()?,
                    &metadata.token_url()?,
                    self.http.clone(),
                );
                let jwks = JwksCache::new(self.http.clone(), metadata.jwks_url()?, JWKS_TTL);

                tracing::info!(
                    provider = %self.settings.id,
                    issuer = %metadata.issuer,
                    "OIDC provider metadata discovered"
                );

                Ok::<_, Error>(Discovered {
                    issuer: metadata.issuer,
                    flow,
                    jwks,
                })
            })
            .await
    }
}

#[async_trait]
impl ProviderAdapter for OidcAdapter {
    fn id(&self) -> &str {
        &self.settings.id
    }

    fn kind(&self) -> ProviderKind {
        self.settings.kind
    }

    async fn build_redirect(&self, request: &AuthRequest) -> Result<AuthRedirect> {
        let discovered = self.discovered().await?;
        discovered.flow.authorize(request, Some(nanoid::nanoid!(32)))
    }

    async fn handle_callback(&self, callback: CallbackRequest) -> Result<Credential> {
        let discovered = self.discovered().await?;
        let exchanged = discovered.flow.exchange(callback).await?;

        let id_token = exchanged.token.id_token.as_ref().ok_or_else(|| {
            Error::ProviderRejected("token response carries no id_token".to_string())
        })?;

        let expected = Expectations {
            issuer: &discovered.issuer,
            audience: &self.settings.client_id,
            nonce: exchanged.pending.nonce.as_deref(),
        };
        let claims = validate_id_token(id_token.secret(), &discovered.jwks, &expected).await?;

        Ok(Credential {
            token: Some(exchanged.token),
            user: Some(claims),
        })
    }
}
