// HTTP error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for HTTP handlers
pub type AppResult<T> = Result<T, AppError>;

/// Application error with HTTP status code
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for AppError {}

/// Error response JSON structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
            status: status.as_u16(),
        });

        (status, body).into_response()
    }
}

/// Convert authgate_core errors to HTTP errors
impl From<authgate_core::Error> for AppError {
    fn from(err: authgate_core::Error) -> Self {
        use authgate_core::Error;

        match err {
            Error::UnknownProvider(_) => Self::not_found(err.to_string()),
            Error::MalformedAssertion(_) | Error::SignatureInvalid | Error::ProviderRejected(_) => {
                Self::unauthorized(err.to_string())
            }
            Error::ProviderUnreachable(msg) => {
                tracing::warn!("Identity provider unreachable: {}", msg);
                Self::bad_gateway("Identity provider unreachable, try again later")
            }
            Error::InvalidInput(msg) => Self::bad_request(msg),
            Error::Config(msg) | Error::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                Self::internal_server_error("Internal server error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authgate_core::Error;

    #[test]
    fn test_core_error_status_mapping() {
        let cases = [
            (Error::UnknownProvider("github".into()), StatusCode::NOT_FOUND),
            (Error::MalformedAssertion("missing openid.sig".into()), StatusCode::UNAUTHORIZED),
            (Error::SignatureInvalid, StatusCode::UNAUTHORIZED),
            (Error::ProviderRejected("state mismatch".into()), StatusCode::UNAUTHORIZED),
            (Error::ProviderUnreachable("timeout".into()), StatusCode::BAD_GATEWAY),
            (Error::InvalidInput("bad host".into()), StatusCode::BAD_REQUEST),
            (Error::Config("oops".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (Error::Internal("db".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(AppError::from(err).status, status);
        }
    }

    #[test]
    fn test_internal_details_not_exposed() {
        let err = AppError::from(Error::Internal("secret detail".into()));
        assert_eq!(err.message, "Internal server error");

        let err = AppError::from(Error::ProviderUnreachable("10.0.0.1 refused".into()));
        assert!(!err.message.contains("10.0.0.1"));
    }
}
