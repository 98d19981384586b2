//! JWKS (JSON Web Key Set) fetching and caching

use jsonwebtoken::jwk::{Jwk, JwkSet};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::{Error, Result};

/// How long a fetched key set is trusted before it is fetched again
pub const JWKS_TTL: Duration = Duration::from_secs(3600);

/// Signing keys of one provider
///
/// A token naming a key id that is not in the cached set triggers exactly one
/// refetch, which covers provider key rotation.
pub struct JwksCache {
    http: reqwest::Client,
    jwks_uri: Url,
    keys: Cache<(), Arc<JwkSet>>,
}

impl JwksCache {
    #[must_use]
    pub fn new(http: reqwest::Client, jwks_uri: Url, ttl: Duration) -> Self {
        Self {
            http,
            jwks_uri,
            keys: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    /// Cached key set, fetched on first use or after expiry
    pub async fn keys(&self) -> Result<Arc<JwkSet>> {
        self.keys
            .try_get_with((), fetch_jwks(&self.http, &self.jwks_uri))
            .await
            .map_err(|e| (*e).clone())
    }

    /// Drop the cached set and fetch it again
    pub async fn refresh(&self) -> Result<Arc<JwkSet>> {
        self.keys.invalidate(&()).await;
        self.keys().await
    }

    /// Key used to sign a token
    ///
    /// Tokens without a `kid` are accepted only when the set holds a single key.
    pub async fn key_for(&self, kid: Option<&str>) -> Result<Jwk> {
        let keys = self.keys().await?;
        if let Some(jwk) = select(&keys, kid) {
            return Ok(jwk.clone());
        }

        tracing::debug!(jwks_uri = %self.jwks_uri, kid = ?kid, "Signing key not cached, refreshing JWKS");
        let keys = self.refresh().await?;
        select(&keys, kid).cloned().ok_or_else(|| {
            Error::ProviderRejected(format!(
                "ID token signed with unknown key: {}",
                kid.unwrap_or("<none>")
            ))
        })
    }
}

fn select<'a>(keys: &'a JwkSet, kid: Option<&str>) -> Option<&'a Jwk> {
    match kid {
        Some(kid) => keys.find(kid),
        None if keys.keys.len() == 1 => keys.keys.first(),
        None => None,
    }
}

async fn fetch_jwks(http: &reqwest::Client, jwks_uri: &Url) -> Result<Arc<JwkSet>> {
    let jwks: JwkSet = http
        .get(jwks_uri.clone())
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    tracing::debug!(jwks_uri = %jwks_uri, keys = jwks.keys.len(), "JWKS fetched");
    Ok(Arc::new(jwks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::oidc::fixtures::JWKS_JSON;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn jwks_body() -> serde_json::Value {
        serde_json::from_str(JWKS_JSON).unwrap()
    }

    fn cache(server: &MockServer) -> JwksCache {
        let uri = Url::parse(&format!("{}/jwks", server.uri())).unwrap();
        JwksCache::new(reqwest::Client::new(), uri, JWKS_TTL)
    }

    #[tokio::test]
    async fn test_keys_are_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
            .expect(1)
            .mount(&server)
            .await;

        let cache = cache(&server);
        let first = cache.key_for(Some("test-key-1")).await.unwrap();
        let second = cache.key_for(Some("test-key-1")).await.unwrap();
        assert_eq!(first.common.key_id, second.common.key_id);
        assert!(cache.key_for(None).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_kid_refreshes_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
            .expect(2)
            .mount(&server)
            .await;

        let cache = cache(&server);
        let err = cache.key_for(Some("rotated-key")).await.unwrap_err();
        assert!(matches!(&err, Error::ProviderRejected(m) if m.contains("rotated-key")));
    }

    #[tokio::test]
    async fn test_fetch_failure_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
            .mount(&server)
            .await;

        let cache = cache(&server);
        assert!(cache.keys().await.is_err());
        assert_eq!(cache.keys().await.unwrap().keys.len(), 1);
    }
}
