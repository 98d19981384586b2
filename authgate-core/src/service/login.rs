//! Login orchestration
//!
//! Routes each request to the adapter of the named provider, keeps the
//! per-attempt secrets between redirect and callback, and tells observers
//! about every successful login.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::{
    AuthRequest, CallbackParams, CallbackRequest, Credential, CredentialsObtained,
    PendingAuthorization, ProviderSummary,
};
use crate::provider::ProviderAdapter;
use crate::store::PendingStore;
use crate::{Error, Result};

/// Receives every successful login
///
/// Called synchronously on the request path; implementations must not block.
pub trait CredentialsObserver: Send + Sync {
    fn on_credentials(&self, event: &CredentialsObtained);
}

impl<F> CredentialsObserver for F
where
    F: Fn(&CredentialsObtained) + Send + Sync,
{
    fn on_credentials(&self, event: &CredentialsObtained) {
        self(event);
    }
}

#[must_use]
pub fn login_path(provider_id: &str) -> String {
    format!("/login_{provider_id}/")
}

#[must_use]
pub fn callback_path(provider_id: &str) -> String {
    format!("/{provider_id}_callback/")
}

/// Authentication orchestrator
#[derive(Clone)]
pub struct LoginService {
    adapters: Arc<BTreeMap<String, Arc<dyn ProviderAdapter>>>,
    pending: PendingStore,
    observers: Arc<RwLock<Vec<Arc<dyn CredentialsObserver>>>>,
    /// Overrides the request origin when building callback URLs
    public_url: Option<String>,
}

impl std::fmt::Debug for LoginService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginService")
            .field("providers", &self.adapters.keys().collect::<Vec<_>>())
            .field("public_url", &self.public_url)
            .finish_non_exhaustive()
    }
}

impl LoginService {
    #[must_use]
    pub fn new(
        adapters: impl IntoIterator<Item = Arc<dyn ProviderAdapter>>,
        pending: PendingStore,
    ) -> Self {
        let adapters = adapters
            .into_iter()
            .map(|adapter| (adapter.id().to_string(), adapter))
            .collect();

        Self {
            adapters: Arc::new(adapters),
            pending,
            observers: Arc::new(RwLock::new(Vec::new())),
            public_url: None,
        }
    }

    /// Build callback URLs from a fixed origin instead of the request's
    #[must_use]
    pub fn with_public_url(mut self, public_url: Option<String>) -> Self {
        self.public_url = public_url.map(|url| url.trim_end_matches('/').to_string());
        self
    }

    fn adapter(&self, provider_id: &str) -> Result<&Arc<dyn ProviderAdapter>> {
        self.adapters
            .get(provider_id)
            .ok_or_else(|| Error::UnknownProvider(provider_id.to_string()))
    }

    /// Absolute callback URL for a provider, e.g. `http://localhost:8000/google_callback/`
    #[must_use]
    pub fn callback_url(&self, provider_id: &str, origin: &str) -> String {
        let base = self
            .public_url
            .as_deref()
            .unwrap_or_else(|| origin.trim_end_matches('/'));
        format!("{base}{}", callback_path(provider_id))
    }

    /// Start a login: returns the provider location to redirect the browser to
    pub async fn begin_login(&self, provider_id: &str, origin: &str) -> Result<String> {
        let adapter = self.adapter(provider_id)?;
        let request = AuthRequest {
            provider: provider_id.to_string(),
            callback_url: self.callback_url(provider_id, origin),
        };

        let redirect = adapter.build_redirect(&request).await?;
        if let Some(pending) = redirect.pending {
            self.pending.insert(pending);
        }

        info!(
            provider = provider_id,
            callback_url = %request.callback_url,
            "Login started"
        );

        Ok(redirect.location)
    }

    /// Finish a login from the provider's callback query
    pub async fn complete_login(
        &self,
        provider_id: &str,
        origin: &str,
        query: CallbackParams,
    ) -> Result<Credential> {
        let adapter = self.adapter(provider_id)?;
        let pending = self.take_pending(provider_id, &query)?;

        let callback = CallbackRequest {
            params: query,
            pending,
        };
        let credential = match adapter.handle_callback(callback).await {
            Ok(credential) => credential,
            Err(e) => {
                warn!(provider = provider_id, error = %e, "Login failed");
                return Err(e);
            }
        };

        info!(
            provider = provider_id,
            subject = ?credential.subject(),
            callback_url = %self.callback_url(provider_id, origin),
            "Login completed"
        );

        self.publish(&CredentialsObtained {
            provider: provider_id.to_string(),
            credential: credential.clone(),
        });

        Ok(credential)
    }

    /// The pending entry named by `state` is consumed whatever happens next
    fn take_pending(
        &self,
        provider_id: &str,
        query: &CallbackParams,
    ) -> Result<Option<PendingAuthorization>> {
        let Some(state) = query.get("state") else {
            return Ok(None);
        };

        match self.pending.take(state) {
            Some(pending) if pending.provider == provider_id => Ok(Some(pending)),
            Some(pending) => {
                warn!(
                    provider = provider_id,
                    issued_for = %pending.provider,
                    "Callback state was issued for another provider"
                );
                Err(Error::ProviderRejected(
                    "state was issued for another provider".to_string(),
                ))
            }
            None => {
                debug!(provider = provider_id, "No pending authorization for callback state");
                Ok(None)
            }
        }
    }

    /// Register an observer for successful logins
    pub fn subscribe(&self, observer: Arc<dyn CredentialsObserver>) {
        self.observers.write().push(observer);
    }

    fn publish(&self, event: &CredentialsObtained) {
        let observers = self.observers.read().clone();
        for observer in observers {
            observer.on_credentials(event);
        }
    }

    /// Configured providers in id order
    #[must_use]
    pub fn providers(&self) -> Vec<ProviderSummary> {
        self.adapters
            .values()
            .map(|adapter| ProviderSummary {
                id: adapter.id().to_string(),
                kind: adapter.kind().to_string(),
                login_path: login_path(adapter.id()),
                callback_path: callback_path(adapter.id()),
            })
            .collect()
    }

    #[must_use]
    pub fn has_provider(&self, provider_id: &str) -> bool {
        self.adapters.contains_key(provider_id)
    }
}
