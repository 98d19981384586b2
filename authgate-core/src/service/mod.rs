//! Service layer

pub mod login;

pub use login::{callback_path, login_path, CredentialsObserver, LoginService};
