pub mod bootstrap;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod provider;
pub mod service;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::Config;
pub use error::{Error, Result};
pub use models::{CallbackParams, Credential, CredentialsObtained, ProviderSummary};
pub use service::{CredentialsObserver, LoginService};
pub use store::{CredentialRecord, CredentialStore, PendingStore};
