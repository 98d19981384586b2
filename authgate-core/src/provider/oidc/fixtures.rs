//! Signing key and helpers for ID token tests

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::Value;

pub const SIGNING_KEY_PEM: &str = include_str!("../../../tests/fixtures/id_token_rsa.pem");
pub const JWKS_JSON: &str = include_str!("../../../tests/fixtures/jwks.json");
pub const KEY_ID: &str = "test-key-1";

pub fn jwks() -> jsonwebtoken::jwk::JwkSet {
    serde_json::from_str(JWKS_JSON).unwrap()
}

/// RS256 token signed with the fixture key
pub fn sign(claims: &Value) -> String {
    sign_with_kid(claims, Some(KEY_ID))
}

pub fn sign_with_kid(claims: &Value, kid: Option<&str>) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(SIGNING_KEY_PEM.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

/// Standard claims valid for ten minutes
pub fn claims(issuer: &str, audience: &str, nonce: &str) -> Value {
    let now = chrono::Utc::now().timestamp();
    serde_json::json!({
        "iss": issuer,
        "aud": audience,
        "sub": "user-42",
        "email": "user@example.com",
        "email_verified": true,
        "iat": now,
        "exp": now + 600,
        "nonce": nonce,
    })
}
