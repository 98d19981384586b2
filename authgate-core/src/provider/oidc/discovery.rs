//! OIDC provider discovery via the `.well-known` metadata document

use serde::Deserialize;
use url::Url;

use crate::{Error, Result};

/// Subset of the provider metadata the login flow needs
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
}

impl ProviderMetadata {
    pub fn authorization_url(&self) -> Result<Url> {
        endpoint("authorization_endpoint", &self.authorization_endpoint)
    }

    pub fn token_url(&self) -> Result<Url> {
        endpoint("token_endpoint", &self.token_endpoint)
    }

    pub fn jwks_url(&self) -> Result<Url> {
        endpoint("jwks_uri", &self.jwks_uri)
    }
}

fn endpoint(field: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value)
        .map_err(|e| Error::ProviderRejected(format!("Invalid {field} in provider metadata: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::ProviderRejected(format!(
            "Unsupported {field} scheme in provider metadata: {}",
            url.scheme()
        )));
    }
    Ok(url)
}

/// Fetch the metadata document
pub async fn discover(http: &reqwest::Client, discovery_url: &Url) -> Result<ProviderMetadata> {
    let metadata: ProviderMetadata = http
        .get(discovery_url.clone())
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_discover_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "issuer": "https://id.example.com",
                "authorization_endpoint": "https://id.example.com/authorize",
                "token_endpoint": "https://id.example.com/token",
                "jwks_uri": "https://id.example.com/jwks",
                "id_token_signing_alg_values_supported": ["RS256"]
            })))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/.well-known/openid-configuration", server.uri())).unwrap();
        let metadata = discover(&reqwest::Client::new(), &url).await.unwrap();

        assert_eq!(metadata.issuer, "https://id.example.com");
        assert_eq!(metadata.token_url().unwrap().path(), "/token");
    }

    #[tokio::test]
    async fn test_discover_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let http = reqwest::Client::new();
        let broken = Url::parse(&format!("{}/broken", server.uri())).unwrap();
        assert!(matches!(
            discover(&http, &broken).await,
            Err(Error::ProviderRejected(_))
        ));
        let missing = Url::parse(&format!("{}/missing", server.uri())).unwrap();
        assert!(matches!(
            discover(&http, &missing).await,
            Err(Error::ProviderRejected(_))
        ));
    }

    #[test]
    fn test_metadata_endpoint_scheme() {
        let metadata = ProviderMetadata {
            issuer: "https://id.example.com".to_string(),
            authorization_endpoint: "javascript:alert(1)".to_string(),
            token_endpoint: "https://id.example.com/token".to_string(),
            jwks_uri: "not a url".to_string(),
        };
        assert!(metadata.authorization_url().is_err());
        assert!(metadata.token_url().is_ok());
        assert!(metadata.jwks_url().is_err());
    }
}
