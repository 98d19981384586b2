//! ID token validation with JWT signature verification

use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Header, Validation};

use super::jwks::JwksCache;
use crate::models::UserClaims;
use crate::{Error, Result};

/// Clock skew tolerated on `exp`
pub const LEEWAY_SECONDS: u64 = 60;

/// What a valid ID token must assert
#[derive(Debug, Clone, Copy)]
pub struct Expectations<'a> {
    pub issuer: &'a str,
    pub audience: &'a str,
    pub nonce: Option<&'a str>,
}

/// Validate a raw ID token against the provider's key set
pub async fn validate_id_token(
    raw: &str,
    jwks: &JwksCache,
    expected: &Expectations<'_>,
) -> Result<UserClaims> {
    let header = parse_header(raw)?;
    let jwk = jwks.key_for(header.kid.as_deref()).await?;
    verify_with_key(raw, &header, &jwk, expected)
}

/// Decode the header and refuse anything but asymmetric signatures
pub fn parse_header(raw: &str) -> Result<Header> {
    let header = decode_header(raw)
        .map_err(|e| Error::ProviderRejected(format!("Malformed ID token: {e}")))?;

    if !is_asymmetric(header.alg) {
        return Err(Error::ProviderRejected(format!(
            "ID token signed with unsupported algorithm {:?}",
            header.alg
        )));
    }

    Ok(header)
}

const fn is_asymmetric(alg: Algorithm) -> bool {
    matches!(
        alg,
        Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
            | Algorithm::ES256
            | Algorithm::ES384
            | Algorithm::EdDSA
    )
}

/// Signature, issuer, audience, expiry and nonce checks
pub fn verify_with_key(
    raw: &str,
    header: &Header,
    jwk: &Jwk,
    expected: &Expectations<'_>,
) -> Result<UserClaims> {
    let key = DecodingKey::from_jwk(jwk)
        .map_err(|e| Error::ProviderRejected(format!("Unusable provider signing key: {e}")))?;

    let mut validation = Validation::new(header.alg);
    validation.set_issuer(&[expected.issuer]);
    validation.set_audience(&[expected.audience]);
    validation.leeway = LEEWAY_SECONDS;

    let claims = decode::<UserClaims>(raw, &key, &validation)
        .map_err(|e| Error::ProviderRejected(format!("ID token rejected: {e}")))?
        .claims;

    if let Some(nonce) = expected.nonce {
        let token_nonce = claims.get("nonce").and_then(serde_json::Value::as_str);
        if token_nonce != Some(nonce) {
            return Err(Error::ProviderRejected("ID token nonce mismatch".to_string()));
        }
    }

    Ok(claims)
}
