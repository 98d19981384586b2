//! OpenID 2.0 indirect identifier flow (Steam)
//!
//! There is no token exchange: the assertion arrives in the callback query and
//! is only trusted after the provider confirms it through a
//! `check_authentication` call.

use async_trait::async_trait;
use indexmap::IndexMap;
use url::Url;

use super::config::{ProviderKind, ProviderSettings};
use super::ProviderAdapter;
use crate::models::{AuthRedirect, AuthRequest, CallbackParams, CallbackRequest, Credential, UserClaims};
use crate::{Error, Result};

pub const OPENID_NS: &str = "http://specs.openid.net/auth/2.0";
pub const IDENTIFIER_SELECT: &str = "http://specs.openid.net/auth/2.0/identifier_select";

/// Fields every positive assertion must carry
const REQUIRED_FIELDS: [&str; 4] = ["openid.assoc_handle", "openid.signed", "openid.sig", "openid.ns"];

const VALID_MARKER: &str = "is_valid:true";

/// Builds redirects to an OpenID 2.0 provider and confirms its assertions
#[derive(Debug, Clone)]
pub struct OpenIdVerifier {
    endpoint: Url,
    http: reqwest::Client,
}

impl OpenIdVerifier {
    #[must_use]
    pub const fn new(endpoint: Url, http: reqwest::Client) -> Self {
        Self { endpoint, http }
    }

    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Directed identity `checkid_setup` redirect; `return_to` doubles as realm
    #[must_use]
    pub fn redirect_url(&self, return_to: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("openid.ns", OPENID_NS)
            .append_pair("openid.mode", "checkid_setup")
            .append_pair("openid.return_to", return_to)
            .append_pair("openid.realm", return_to)
            .append_pair("openid.identity", IDENTIFIER_SELECT)
            .append_pair("openid.claimed_id", IDENTIFIER_SELECT);
        url
    }

    /// Confirm an assertion with the provider.
    ///
    /// Fails with [`Error::MalformedAssertion`] before any network I/O when the
    /// assertion is incomplete, with [`Error::SignatureInvalid`] when the
    /// provider does not vouch for it.
    pub async fn verify(&self, params: &CallbackParams) -> Result<()> {
        let payload = verification_payload(params)?;

        let body = self
            .http
            .post(self.endpoint.clone())
            .form(&payload)
            .send()
            .await
            .map_err(confirmation_failed)?
            .text()
            .await
            .map_err(confirmation_failed)?;

        if body.contains(VALID_MARKER) {
            Ok(())
        } else {
            Err(Error::SignatureInvalid)
        }
    }
}

/// Any failure of the confirmation round trip leaves the assertion unconfirmed
fn confirmation_failed(err: reqwest::Error) -> Error {
    Error::ProviderUnreachable(format!("check_authentication failed: {err}"))
}

/// `check_authentication` form built from a callback, in submission order
pub fn verification_payload(params: &CallbackParams) -> Result<IndexMap<String, String>> {
    let mut payload = IndexMap::with_capacity(REQUIRED_FIELDS.len() + 8);
    for field in REQUIRED_FIELDS {
        let value = params
            .get(field)
            .ok_or_else(|| Error::MalformedAssertion(format!("missing {field}")))?;
        payload.insert(field.to_string(), value.clone());
    }

    let signed = payload["openid.signed"].clone();
    for name in signed.split(',') {
        let key = format!("openid.{name}");
        let value = params
            .get(&key)
            .ok_or_else(|| Error::MalformedAssertion(format!("signed field {key} is missing")))?;
        if !payload.contains_key(&key) {
            payload.insert(key, value.clone());
        }
    }

    payload.insert("openid.mode".to_string(), "check_authentication".to_string());
    Ok(payload)
}

/// Steam ID64 from a `.../openid/id/<steamid>` claimed identifier
#[must_use]
pub fn steam_id(claimed_id: &str) -> Option<u64> {
    claimed_id
        .strip_prefix("https://steamcommunity.com/openid/id/")
        .and_then(|id| id.trim_end_matches('/').parse().ok())
}

/// OpenID 2.0 provider adapter
pub struct OpenIdAdapter {
    id: String,
    kind: ProviderKind,
    verifier: OpenIdVerifier,
}

impl OpenIdAdapter {
    #[must_use]
    pub fn new(settings: ProviderSettings, login_url: Url, http: reqwest::Client) -> Self {
        Self {
            id: settings.id,
            kind: settings.kind,
            verifier: OpenIdVerifier::new(login_url, http),
        }
    }
}

#[async_trait]
impl ProviderAdapter for OpenIdAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn build_redirect(&self, request: &AuthRequest) -> Result<AuthRedirect> {
        Url::parse(&request.callback_url)
            .map_err(|e| Error::InvalidInput(format!("Invalid callback URL: {e}")))?;

        Ok(AuthRedirect {
            location: self.verifier.redirect_url(&request.callback_url).to_string(),
            pending: None,
        })
    }

    async fn handle_callback(&self, callback: CallbackRequest) -> Result<Credential> {
        let params = callback.params;

        if let Err(e) = self.verifier.verify(&params).await {
            tracing::warn!(provider = %self.id, error = %e, "OpenID assertion rejected");
            return Err(e);
        }

        let steam_id64 = params
            .get("openid.claimed_id")
            .map(String::as_str)
            .and_then(steam_id);
        tracing::info!(provider = %self.id, steam_id = ?steam_id64, "OpenID assertion verified");

        let user: UserClaims = params
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();

        Ok(Credential {
            token: None,
            user: Some(user),
        })
    }
}
