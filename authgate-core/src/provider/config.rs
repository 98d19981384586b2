//! Provider configuration and preset resolution
//!
//! A provider instance is declared under `providers.<id>`. Its `type` selects
//! either a preset (`google`, `twitch`, `steam`) or a generic variant
//! (`oauth2`, `oidc`). When `type` is omitted the instance id is used, so a
//! bare `[providers.google]` section is enough for Google.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::{Error, Result};

pub const GOOGLE_DISCOVERY_URL: &str = "https://accounts.google.com/.well-known/openid-configuration";
pub const TWITCH_DISCOVERY_URL: &str = "https://id.twitch.tv/oauth2/.well-known/openid-configuration";
pub const STEAM_LOGIN_URL: &str = "https://steamcommunity.com/openid/login";

/// Twitch only returns email claims in the ID token when they are requested explicitly
const TWITCH_CLAIMS: &str = r#"{"id_token":{"email":null,"email_verified":null}}"#;

/// Configured provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderKind {
    #[serde(rename = "google")]
    Google,
    #[serde(rename = "twitch")]
    Twitch,
    #[serde(rename = "steam")]
    Steam,
    #[serde(rename = "oauth2")]
    OAuth2,
    #[serde(rename = "oidc")]
    Oidc,
}

impl ProviderKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Twitch => "twitch",
            Self::Steam => "steam",
            Self::OAuth2 => "oauth2",
            Self::Oidc => "oidc",
        }
    }

    /// Protocol family the adapter implements
    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        match self {
            Self::OAuth2 => Protocol::OAuth2,
            Self::Google | Self::Twitch | Self::Oidc => Protocol::Oidc,
            Self::Steam => Protocol::OpenId2,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "google" => Ok(Self::Google),
            "twitch" => Ok(Self::Twitch),
            "steam" => Ok(Self::Steam),
            "oauth2" => Ok(Self::OAuth2),
            "oidc" => Ok(Self::Oidc),
            other => Err(Error::Config(format!("unknown provider type: {other}"))),
        }
    }
}

/// Adapter variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    OAuth2,
    Oidc,
    OpenId2,
}

/// How the client authenticates to the token endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenAuthMethod {
    /// HTTP Basic with client id and secret
    Basic,
    /// `client_id` / `client_secret` form fields
    RequestBody,
}

/// Raw provider section as it appears in the config file
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ProviderKind>,
    pub client_id: String,
    pub client_secret: String,
    /// Space separated scopes; preset default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// OIDC metadata document
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorize_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub userinfo_url: Option<String>,
    /// OpenID 2.0 login endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_auth: Option<TokenAuthMethod>,
    /// Extra query parameters appended to the authorization request
    pub authorize_params: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("scope", &self.scope)
            .field("discovery_url", &self.discovery_url)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .field("endpoint", &self.endpoint)
            .field("token_auth", &self.token_auth)
            .field("authorize_params", &self.authorize_params)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Endpoints of a resolved provider, one shape per protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEndpoints {
    OAuth2 {
        authorize_url: Url,
        token_url: Url,
        userinfo_url: Option<Url>,
    },
    Oidc {
        discovery_url: Url,
    },
    OpenId2 {
        login_url: Url,
    },
}

/// Fully resolved, immutable provider settings
#[derive(Clone)]
pub struct ProviderSettings {
    pub id: String,
    pub kind: ProviderKind,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub scopes: Vec<String>,
    pub endpoints: ProviderEndpoints,
    pub token_auth: TokenAuthMethod,
    pub authorize_params: Vec<(String, String)>,
    pub timeout: Duration,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("client_id", &self.client_id)
            .field("scopes", &self.scopes)
            .field("endpoints", &self.endpoints)
            .field("token_auth", &self.token_auth)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ProviderSettings {
    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        self.kind.protocol()
    }
}

/// Provider ids end up in URL paths (`/login_<id>/`)
fn validate_id(id: &str) -> Result<()> {
    if !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "provider id \"{id}\" must match [a-z0-9_]+"
        )))
    }
}

fn parse_url(id: &str, field: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value)
        .map_err(|e| Error::Config(format!("providers.{id}.{field}: invalid URL \"{value}\": {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "providers.{id}.{field}: only http and https URLs are allowed"
        )));
    }
    Ok(url)
}

fn required_url(id: &str, field: &str, value: Option<&str>) -> Result<Url> {
    let value = value.ok_or_else(|| Error::Config(format!("providers.{id}.{field} is required")))?;
    parse_url(id, field, value)
}

impl ProviderConfig {
    /// Determine the provider type, falling back to the instance id
    pub fn effective_kind(&self, id: &str) -> Result<ProviderKind> {
        match self.kind {
            Some(kind) => Ok(kind),
            None => id.parse().map_err(|_| {
                Error::Config(format!(
                    "providers.{id}: missing `type` and \"{id}\" is not a known provider type"
                ))
            }),
        }
    }

    /// Apply preset defaults and validate into [`ProviderSettings`]
    pub fn resolve(&self, id: &str, default_timeout: Duration) -> Result<ProviderSettings> {
        validate_id(id)?;
        let kind = self.effective_kind(id)?;

        let endpoints = match kind {
            ProviderKind::Google => ProviderEndpoints::Oidc {
                discovery_url: parse_url(
                    id,
                    "discovery_url",
                    self.discovery_url.as_deref().unwrap_or(GOOGLE_DISCOVERY_URL),
                )?,
            },
            ProviderKind::Twitch => ProviderEndpoints::Oidc {
                discovery_url: parse_url(
                    id,
                    "discovery_url",
                    self.discovery_url.as_deref().unwrap_or(TWITCH_DISCOVERY_URL),
                )?,
            },
            ProviderKind::Oidc => ProviderEndpoints::Oidc {
                discovery_url: required_url(id, "discovery_url", self.discovery_url.as_deref())?,
            },
            ProviderKind::OAuth2 => ProviderEndpoints::OAuth2 {
                authorize_url: required_url(id, "authorize_url", self.authorize_url.as_deref())?,
                token_url: required_url(id, "token_url", self.token_url.as_deref())?,
                userinfo_url: self
                    .userinfo_url
                    .as_deref()
                    .map(|u| parse_url(id, "userinfo_url", u))
                    .transpose()?,
            },
            ProviderKind::Steam => ProviderEndpoints::OpenId2 {
                login_url: parse_url(
                    id,
                    "endpoint",
                    self.endpoint.as_deref().unwrap_or(STEAM_LOGIN_URL),
                )?,
            },
        };

        if kind.protocol() != Protocol::OpenId2 && self.client_id.trim().is_empty() {
            return Err(Error::Config(format!("providers.{id}.client_id is required")));
        }

        let scope = self.scope.as_deref().unwrap_or(match kind {
            ProviderKind::Google | ProviderKind::Oidc => "openid email",
            ProviderKind::Twitch => "openid",
            ProviderKind::OAuth2 | ProviderKind::Steam => "",
        });
        let scopes = scope.split_whitespace().map(str::to_string).collect();

        let mut authorize_params = self.authorize_params.clone();
        if kind == ProviderKind::Twitch {
            authorize_params
                .entry("claims".to_string())
                .or_insert_with(|| TWITCH_CLAIMS.to_string());
        }

        let token_auth = self.token_auth.unwrap_or(match kind {
            ProviderKind::Twitch => TokenAuthMethod::RequestBody,
            _ => TokenAuthMethod::Basic,
        });

        let client_secret = Some(self.client_secret.clone()).filter(|s| !s.is_empty());

        Ok(ProviderSettings {
            id: id.to_string(),
            kind,
            client_id: self.client_id.clone(),
            client_secret,
            scopes,
            endpoints,
            token_auth,
            authorize_params: authorize_params.into_iter().collect(),
            timeout: self.timeout_seconds.map_or(default_timeout, Duration::from_secs),
        })
    }
}
