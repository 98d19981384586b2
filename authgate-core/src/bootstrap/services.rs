//! Service initialization and dependency injection

use std::sync::Arc;
use tracing::info;

use crate::provider::create_adapter;
use crate::service::LoginService;
use crate::store::{CredentialStore, PendingStore};
use crate::Config;

/// Container for all initialized services
#[derive(Clone)]
pub struct Services {
    /// Login orchestrator with one adapter per configured provider
    pub login_service: LoginService,
    /// Credentials obtained so far; subscribed to `login_service`
    pub credentials: Arc<CredentialStore>,
    /// Where the browser lands after a successful callback
    pub success_path: String,
}

/// Build every provider adapter and wire the stores
pub fn init_services(config: &Config) -> anyhow::Result<Services> {
    let timeout = config.auth.http_timeout();

    let mut adapters = Vec::with_capacity(config.providers.len());
    for (id, provider) in &config.providers {
        let settings = provider.resolve(id, timeout)?;
        adapters.push(create_adapter(settings)?);
    }

    let login_service = LoginService::new(adapters, PendingStore::new(config.auth.pending_ttl()))
        .with_public_url(config.server.public_url.clone());

    let credentials = Arc::new(CredentialStore::new());
    login_service.subscribe(credentials.clone());

    info!(
        providers = ?login_service
            .providers()
            .iter()
            .map(|p| p.id.as_str())
            .collect::<Vec<_>>(),
        "Login providers initialized"
    );

    Ok(Services {
        login_service,
        credentials,
        success_path: config.server.success_path.clone(),
    })
}
