//! Generic OAuth2 provider with explicit endpoints

use async_trait::async_trait;
use url::Url;

use super::config::{ProviderKind, ProviderSettings};
use super::flow::{fetch_userinfo, CodeFlow};
use super::ProviderAdapter;
use crate::models::{AuthRedirect, AuthRequest, CallbackRequest, Credential};
use crate::Result;

/// Plain OAuth2 provider
///
/// Without a `userinfo_url` the credential carries only the token.
pub struct OAuth2Adapter {
    id: String,
    kind: ProviderKind,
    flow: CodeFlow,
    userinfo_url: Option<Url>,
}

impl OAuth2Adapter {
    pub fn new(
        settings: ProviderSettings,
        authorize_url: &Url,
        token_url: &Url,
        userinfo_url: Option<Url>,
        http: reqwest::Client,
    ) -> Self {
        let flow = CodeFlow::new(&settings, authorize_url, token_url, http);
        Self {
            id: settings.id,
            kind: settings.kind,
            flow,
            userinfo_url,
        }
    }
}

#[async_trait]
impl ProviderAdapter for OAuth2Adapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn build_redirect(&self, request: &AuthRequest) -> Result<AuthRedirect> {
        self.flow.authorize(request, None)
    }

    async fn handle_callback(&self, callback: CallbackRequest) -> Result<Credential> {
        let exchanged = self.flow.exchange(callback).await?;

        let user = match &self.userinfo_url {
            Some(url) => Some(fetch_userinfo(self.flow.http(), url, &exchanged.token).await?),
            None => None,
        };

        Ok(Credential {
            token: Some(exchanged.token),
            user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::config::ProviderConfig;
    use crate::Error;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(base: &str, with_userinfo: bool) -> OAuth2Adapter {
        let settings = ProviderConfig {
            kind: Some(ProviderKind::OAuth2),
            client_id: "client-1".to_string(),
            client_secret: "s3cret".to_string(),
            authorize_url: Some(format!("{base}/oauth/authorize")),
            token_url: Some(format!("{base}/oauth/token")),
            userinfo_url: with_userinfo.then(|| format!("{base}/users/me/")),
            ..ProviderConfig::default()
        }
        .resolve("my_provider", Duration::from_secs(5))
        .unwrap();
        let authorize = Url::parse(&format!("{base}/oauth/authorize")).unwrap();
        let token = Url::parse(&format!("{base}/oauth/token")).unwrap();
        let userinfo = with_userinfo.then(|| Url::parse(&format!("{base}/users/me/")).unwrap());
        OAuth2Adapter::new(settings, &authorize, &token, userinfo, reqwest::Client::new())
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at-1",
                "token_type": "Bearer"
            })))
            .mount(server)
            .await;
    }

    async fn login(adapter: &OAuth2Adapter) -> Result<Credential> {
        let redirect = adapter
            .build_redirect(&AuthRequest {
                provider: "my_provider".to_string(),
                callback_url: "http://localhost:8000/my_provider_callback/".to_string(),
            })
            .await
            .unwrap();
        let pending = redirect.pending.unwrap();
        adapter
            .handle_callback(CallbackRequest {
                params: [
                    ("code".to_string(), "abc".to_string()),
                    ("state".to_string(), pending.state.clone()),
                ]
                .into(),
                pending: Some(pending),
            })
            .await
    }

    #[tokio::test]
    async fn test_token_only_without_userinfo() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        let credential = login(&adapter(&server.uri(), false)).await.unwrap();
        assert_eq!(credential.token.unwrap().access_token.secret(), "at-1");
        assert!(credential.user.is_none());
    }

    #[tokio::test]
    async fn test_userinfo_attached() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/users/me/"))
            .and(header("authorization", "Bearer at-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 7,
                "email": "user@example.com"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let credential = login(&adapter(&server.uri(), true)).await.unwrap();
        let user = credential.user.unwrap();
        assert_eq!(user["email"], "user@example.com");
        assert_eq!(user["id"], 7);
    }

    #[tokio::test]
    async fn test_userinfo_failure_rejects() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/users/me/"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = login(&adapter(&server.uri(), true)).await.unwrap_err();
        assert!(matches!(err, Error::ProviderRejected(_)), "{err:?}");
    }
}
