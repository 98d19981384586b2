//! Values passed between the orchestrator and the provider adapters

use oauth2::{AccessToken, RefreshToken};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Flat query mapping of an inbound callback (last occurrence of a key wins)
pub type CallbackParams = BTreeMap<String, String>;

/// User claims reported by a provider (ID token claims, userinfo document,
/// or the verified OpenID 2.0 query parameters)
pub type UserClaims = serde_json::Map<String, serde_json::Value>;

/// Input of a redirect construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub provider: String,
    /// Absolute URL the provider sends the browser back to
    pub callback_url: String,
}

/// Output of a redirect construction
#[derive(Debug, Clone)]
pub struct AuthRedirect {
    pub location: String,
    /// Data the callback needs to finish the flow; the orchestrator keeps it
    pub pending: Option<PendingAuthorization>,
}

/// Per-attempt secrets of an authorization-code flow, keyed by `state`
#[derive(Clone)]
pub struct PendingAuthorization {
    pub provider: String,
    pub state: String,
    pub pkce_verifier: String,
    pub nonce: Option<String>,
    pub redirect_uri: String,
}

impl fmt::Debug for PendingAuthorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingAuthorization")
            .field("provider", &self.provider)
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

/// Inbound callback as seen by an adapter
#[derive(Debug, Clone, Default)]
pub struct CallbackRequest {
    pub params: CallbackParams,
    pub pending: Option<PendingAuthorization>,
}

impl CallbackRequest {
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Raw ID token (compact JWS)
#[derive(Clone, PartialEq, Eq)]
pub struct IdToken(String);

impl IdToken {
    #[must_use]
    pub const fn new(raw: String) -> Self {
        Self(raw)
    }

    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for IdToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdToken([redacted])")
    }
}

/// Tokens issued by an OAuth2/OIDC provider
#[derive(Debug, Clone)]
pub struct ProviderToken {
    pub access_token: AccessToken,
    pub token_type: String,
    pub expires_in: Option<Duration>,
    pub refresh_token: Option<RefreshToken>,
    pub scopes: Vec<String>,
    pub id_token: Option<IdToken>,
}

/// Normalized result of a successful provider round trip
#[derive(Debug, Clone, Default)]
pub struct Credential {
    pub token: Option<ProviderToken>,
    pub user: Option<UserClaims>,
}

impl Credential {
    /// Best-effort subject identifier, used for logging
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        let user = self.user.as_ref()?;
        ["sub", "id", "openid.claimed_id", "email"]
            .iter()
            .find_map(|key| match user.get(*key)? {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }
}

/// Notification published after every successful callback
#[derive(Debug, Clone)]
pub struct CredentialsObtained {
    pub provider: String,
    pub credential: Credential,
}

/// Public description of a configured provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSummary {
    pub id: String,
    pub kind: String,
    pub login_path: String,
    pub callback_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subject_prefers_sub() {
        let user = json!({ "email": "a@example.com", "sub": "1234" });
        let credential = Credential {
            token: None,
            user: user.as_object().cloned(),
        };
        assert_eq!(credential.subject().as_deref(), Some("1234"));

        let numeric = json!({ "id": 42 });
        let credential = Credential {
            token: None,
            user: numeric.as_object().cloned(),
        };
        assert_eq!(credential.subject().as_deref(), Some("42"));

        assert_eq!(Credential::default().subject(), None);
    }

    #[test]
    fn test_secrets_redacted_in_debug() {
        let token = ProviderToken {
            access_token: AccessToken::new("at-secret".to_string()),
            token_type: "bearer".to_string(),
            expires_in: None,
            refresh_token: Some(RefreshToken::new("rt-secret".to_string())),
            scopes: vec![],
            id_token: Some(IdToken::new("id-secret".to_string())),
        };
        let pending = PendingAuthorization {
            provider: "google".to_string(),
            state: "state".to_string(),
            pkce_verifier: "verifier-secret".to_string(),
            nonce: Some("nonce".to_string()),
            redirect_uri: "http://localhost/google_callback/".to_string(),
        };

        let rendered = format!("{token:?} {pending:?}");
        assert!(!rendered.contains("secret"), "{rendered}");
    }
}
