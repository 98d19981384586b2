//! In-memory stores owned by the hosting application
//!
//! - [`PendingStore`]: per-attempt secrets between redirect and callback
//! - [`CredentialStore`]: credentials obtained so far (what the home page lists)

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use parking_lot::RwLock;
use serde::Serialize;
use std::time::{Duration, Instant};

use crate::models::{CredentialsObtained, PendingAuthorization, UserClaims};
use crate::service::CredentialsObserver;

/// Upper bound on concurrently outstanding login attempts
const PENDING_CAPACITY: u64 = 10_000;

/// Pending authorizations keyed by `state`, single use, expiring after a TTL
#[derive(Clone)]
pub struct PendingStore {
    entries: Cache<String, (PendingAuthorization, Instant)>,
    ttl: Duration,
}

impl PendingStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(PENDING_CAPACITY)
                .time_to_live(ttl)
                .build(),
            ttl,
        }
    }

    pub fn insert(&self, pending: PendingAuthorization) {
        self.entries
            .insert(pending.state.clone(), (pending, Instant::now()));
    }

    /// Remove and return the entry for `state` if it has not expired
    #[must_use]
    pub fn take(&self, state: &str) -> Option<PendingAuthorization> {
        let (pending, issued_at) = self.entries.remove(state)?;
        (issued_at.elapsed() < self.ttl).then_some(pending)
    }
}

/// What is remembered about one successful login
#[derive(Debug, Clone, Serialize)]
pub struct CredentialRecord {
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub user: Option<UserClaims>,
    pub has_token: bool,
    pub scopes: Vec<String>,
    pub obtained_at: DateTime<Utc>,
}

impl From<&CredentialsObtained> for CredentialRecord {
    fn from(event: &CredentialsObtained) -> Self {
        let credential = &event.credential;
        Self {
            provider: event.provider.clone(),
            subject: credential.subject(),
            user: credential.user.clone(),
            has_token: credential.token.is_some(),
            scopes: credential
                .token
                .as_ref()
                .map(|token| token.scopes.clone())
                .unwrap_or_default(),
            obtained_at: Utc::now(),
        }
    }
}

/// Credentials obtained since startup (or the last logout)
///
/// Raw tokens are never kept.
#[derive(Debug, Default)]
pub struct CredentialStore {
    records: RwLock<Vec<CredentialRecord>>,
}

impl CredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn list(&self) -> Vec<CredentialRecord> {
        self.records.read().clone()
    }

    pub fn clear(&self) {
        self.records.write().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl CredentialsObserver for CredentialStore {
    fn on_credentials(&self, event: &CredentialsObtained) {
        self.records.write().push(CredentialRecord::from(event));
    }
}
