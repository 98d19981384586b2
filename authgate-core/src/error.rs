use thiserror::Error;

/// Failure taxonomy of a login attempt.
///
/// Every verification failure maps to one of the rejecting variants; nothing
/// ambiguous is ever turned into a success.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Malformed assertion: {0}")]
    MalformedAssertion(String),

    #[error("Assertion signature rejected by provider")]
    SignatureInvalid,

    #[error("Provider unreachable: {0}")]
    ProviderUnreachable(String),

    #[error("Provider rejected login: {0}")]
    ProviderRejected(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the user may simply try again later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderUnreachable(_))
    }

    /// Whether the provider (or the assertion it returned) refused the login.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::MalformedAssertion(_) | Self::SignatureInvalid | Self::ProviderRejected(_)
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::ProviderUnreachable(format!("request timed out: {err}"))
        } else if err.is_decode() {
            Self::ProviderRejected(format!("unparsable provider response: {err}"))
        } else if err.is_status() {
            Self::ProviderRejected(format!("provider returned an error status: {err}"))
        } else {
            Self::ProviderUnreachable(err.to_string())
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(Error::ProviderUnreachable("timeout".into()).is_retryable());
        assert!(!Error::SignatureInvalid.is_retryable());

        assert!(Error::SignatureInvalid.is_rejection());
        assert!(Error::MalformedAssertion("openid.sig".into()).is_rejection());
        assert!(Error::ProviderRejected("bad code".into()).is_rejection());
        assert!(!Error::UnknownProvider("nope".into()).is_rejection());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Error::UnknownProvider("github".into()).to_string(),
            "Unknown provider: github"
        );
        assert_eq!(
            Error::SignatureInvalid.to_string(),
            "Assertion signature rejected by provider"
        );
    }
}
