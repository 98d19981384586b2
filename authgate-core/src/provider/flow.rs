//! Authorization code flow shared by the OAuth2 and OIDC adapters

use oauth2::basic::{
    BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse,
    BasicTokenType,
};
use oauth2::helpers::{deserialize_untagged_enum_case_insensitive, serialize_space_delimited_vec};
use oauth2::{
    AccessToken, AuthType, AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, HttpClientError, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl,
    RefreshToken, RequestTokenError, Scope, StandardRevocableToken, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::time::Duration;
use url::Url;

use super::config::{ProviderSettings, TokenAuthMethod};
use crate::models::{
    AuthRedirect, AuthRequest, CallbackRequest, IdToken, PendingAuthorization, ProviderToken,
    UserClaims,
};
use crate::{Error, Result};

/// Token endpoint response, OAuth2 fields plus the OIDC `id_token`
///
/// `scope` is accepted as a space delimited string or as a JSON array;
/// Twitch sends the latter.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderTokenResponse {
    access_token: AccessToken,
    #[serde(deserialize_with = "deserialize_untagged_enum_case_insensitive")]
    token_type: BasicTokenType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<RefreshToken>,
    #[serde(
        rename = "scope",
        default,
        deserialize_with = "deserialize_scopes",
        serialize_with = "serialize_space_delimited_vec",
        skip_serializing_if = "Option::is_none"
    )]
    scopes: Option<Vec<Scope>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id_token: Option<String>,
}

impl ProviderTokenResponse {
    #[must_use]
    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref()
    }
}

impl TokenResponse for ProviderTokenResponse {
    type TokenType = BasicTokenType;

    fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    fn token_type(&self) -> &BasicTokenType {
        &self.token_type
    }

    fn expires_in(&self) -> Option<Duration> {
        self.expires_in.map(Duration::from_secs)
    }

    fn refresh_token(&self) -> Option<&RefreshToken> {
        self.refresh_token.as_ref()
    }

    fn scopes(&self) -> Option<&Vec<Scope>> {
        self.scopes.as_ref()
    }
}

fn deserialize_scopes<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<Scope>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scopes {
        Delimited(String),
        List(Vec<String>),
    }

    let scopes = Option::<Scopes>::deserialize(deserializer)?.map(|scopes| match scopes {
        Scopes::Delimited(scopes) => scopes
            .split_whitespace()
            .map(|scope| Scope::new(scope.to_string()))
            .collect(),
        Scopes::List(scopes) => scopes.into_iter().map(Scope::new).collect(),
    });
    Ok(scopes)
}

type CodeClient = Client<
    BasicErrorResponse,
    ProviderTokenResponse,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Result of a successful code exchange
#[derive(Debug)]
pub struct Exchanged {
    pub token: ProviderToken,
    pub pending: PendingAuthorization,
}

/// Authorization code + PKCE flow against one provider
pub struct CodeFlow {
    provider: String,
    client: CodeClient,
    scopes: Vec<Scope>,
    extra_params: Vec<(String, String)>,
    http: reqwest::Client,
}

impl CodeFlow {
    pub fn new(
        settings: &ProviderSettings,
        authorize_url: &Url,
        token_url: &Url,
        http: reqwest::Client,
    ) -> Self {
        let auth_type = match settings.token_auth {
            TokenAuthMethod::Basic => AuthType::BasicAuth,
            TokenAuthMethod::RequestBody => AuthType::RequestBody,
        };

        let mut client: CodeClient = Client::new(ClientId::new(settings.client_id.clone()))
            .set_auth_uri(AuthUrl::from_url(authorize_url.clone()))
            .set_token_uri(TokenUrl::from_url(token_url.clone()))
            .set_auth_type(auth_type);
        if let Some(secret) = &settings.client_secret {
            client = client.set_client_secret(ClientSecret::new(secret.clone()));
        }

        Self {
            provider: settings.id.clone(),
            client,
            scopes: settings.scopes.iter().cloned().map(Scope::new).collect(),
            extra_params: settings.authorize_params.clone(),
            http,
        }
    }

    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Build the authorization URL with a fresh state and PKCE challenge
    pub fn authorize(&self, request: &AuthRequest, nonce: Option<String>) -> Result<AuthRedirect> {
        let redirect_url = RedirectUrl::new(request.callback_url.clone())
            .map_err(|e| Error::InvalidInput(format!("Invalid callback URL: {e}")))?;
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut authorization = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().cloned())
            .set_pkce_challenge(pkce_challenge)
            .set_redirect_uri(Cow::Borrowed(&redirect_url));
        for (name, value) in &self.extra_params {
            authorization = authorization.add_extra_param(name.as_str(), value.as_str());
        }
        if let Some(nonce) = &nonce {
            authorization = authorization.add_extra_param("nonce", nonce.as_str());
        }
        let (location, state) = authorization.url();

        Ok(AuthRedirect {
            location: location.to_string(),
            pending: Some(PendingAuthorization {
                provider: self.provider.clone(),
                state: state.secret().clone(),
                pkce_verifier: pkce_verifier.secret().clone(),
                nonce,
                redirect_uri: request.callback_url.clone(),
            }),
        })
    }

    /// Check the callback against the pending authorization and redeem the code
    pub async fn exchange(&self, callback: CallbackRequest) -> Result<Exchanged> {
        let CallbackRequest { params, pending } = callback;

        if let Some(error) = params.get("error") {
            let reason = params
                .get("error_description")
                .map_or_else(|| error.clone(), |description| format!("{error}: {description}"));
            return Err(Error::ProviderRejected(reason));
        }

        let pending = pending.ok_or_else(|| {
            Error::ProviderRejected("no pending authorization for this callback".to_string())
        })?;
        if params.get("state") != Some(&pending.state) {
            return Err(Error::ProviderRejected("state mismatch".to_string()));
        }
        let code = params
            .get("code")
            .filter(|code| !code.is_empty())
            .ok_or_else(|| Error::ProviderRejected("missing authorization code".to_string()))?;

        let redirect_url = RedirectUrl::new(pending.redirect_uri.clone())
            .map_err(|e| Error::Internal(format!("Invalid stored redirect URI: {e}")))?;

        let response = self
            .client
            .exchange_code(AuthorizationCode::new(code.clone()))
            .set_pkce_verifier(PkceCodeVerifier::new(pending.pkce_verifier.clone()))
            .set_redirect_uri(Cow::Owned(redirect_url))
            .request_async(&self.http)
            .await
            .map_err(token_error)?;

        tracing::debug!(provider = %self.provider, "Authorization code exchanged");

        Ok(Exchanged {
            token: provider_token(&response),
            pending,
        })
    }
}

/// Fetch a userinfo document with the bearer token
pub async fn fetch_userinfo(
    http: &reqwest::Client,
    userinfo_url: &Url,
    token: &ProviderToken,
) -> Result<UserClaims> {
    let claims = http
        .get(userinfo_url.clone())
        .bearer_auth(token.access_token.secret())
        .send()
        .await?
        .error_for_status()?
        .json::<UserClaims>()
        .await?;
    Ok(claims)
}

fn provider_token(response: &ProviderTokenResponse) -> ProviderToken {
    ProviderToken {
        access_token: response.access_token().clone(),
        token_type: response.token_type().as_ref().to_string(),
        expires_in: response.expires_in(),
        refresh_token: response.refresh_token().cloned(),
        scopes: response
            .scopes()
            .map(|scopes| scopes.iter().map(|s| s.to_string()).collect())
            .unwrap_or_default(),
        id_token: response.id_token().map(|raw| IdToken::new(raw.to_string())),
    }
}

fn token_error(err: RequestTokenError<HttpClientError<reqwest::Error>, BasicErrorResponse>) -> Error {
    match err {
        RequestTokenError::ServerResponse(response) => {
            Error::ProviderRejected(format!("token endpoint refused the code: {response}"))
        }
        RequestTokenError::Request(HttpClientError::Reqwest(err)) => Error::from(*err),
        RequestTokenError::Request(err) => Error::ProviderUnreachable(err.to_string()),
        RequestTokenError::Parse(err, _) => {
            Error::ProviderRejected(format!("unparsable token response: {err}"))
        }
        RequestTokenError::Other(message) => Error::ProviderRejected(message),
    }
}
