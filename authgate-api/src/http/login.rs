//! Per-provider login and callback endpoints
//!
//! `GET /login_<id>/` sends the browser to the provider and
//! `GET /<id>_callback/` finishes the login. Both paths are registered once
//! per configured provider, so anything else falls through to 404.

use axum::{
    extract::{rejection::QueryRejection, FromRequestParts, Query, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use authgate_core::service::{callback_path, login_path};
use authgate_core::CallbackParams;
use tracing::debug;

use super::{AppError, AppResult, AppState};

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Scheme and host the browser used to reach us, e.g. `http://localhost:8000`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin(pub String);

impl<S> FromRequestParts<S> for RequestOrigin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let scheme = match parts
            .headers
            .get(X_FORWARDED_PROTO)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(',').next().unwrap_or(v).trim().to_ascii_lowercase())
        {
            Some(proto) if proto == "https" => "https",
            _ => "http",
        };

        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| parts.uri.authority().map(|a| a.as_str()))
            .ok_or_else(|| AppError::bad_request("Missing Host header"))?;

        if !is_valid_host(host) {
            return Err(AppError::bad_request("Invalid Host header"));
        }

        Ok(Self(format!("{scheme}://{host}")))
    }
}

/// Host names, IPv4/IPv6 literals and an optional port; nothing that could
/// smuggle a path or userinfo into the callback URL.
fn is_valid_host(host: &str) -> bool {
    !host.is_empty()
        && host.len() <= 255
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '[' | ']' | '_'))
}

/// `302 Found` to `location`
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Login and callback routes for every configured provider
pub fn create_login_router(state: &AppState) -> Router<AppState> {
    let mut router = Router::new();

    for summary in state.login_service.providers() {
        let id = summary.id.clone();
        router = router.route(
            &login_path(&id),
            get(move |state: State<AppState>, origin: RequestOrigin| {
                begin_login(state, origin, id)
            }),
        );

        let id = summary.id;
        router = router.route(
            &callback_path(&id),
            get(
                move |state: State<AppState>,
                      origin: RequestOrigin,
                      query: Result<Query<CallbackParams>, QueryRejection>| {
                    complete_login(state, origin, query, id)
                },
            ),
        );
    }

    router
}

async fn begin_login(
    State(state): State<AppState>,
    RequestOrigin(origin): RequestOrigin,
    provider: String,
) -> AppResult<Response> {
    let location = state.login_service.begin_login(&provider, &origin).await?;
    debug!(provider = %provider, "Redirecting to identity provider");
    Ok(found(&location))
}

async fn complete_login(
    State(state): State<AppState>,
    RequestOrigin(origin): RequestOrigin,
    query: Result<Query<CallbackParams>, QueryRejection>,
    provider: String,
) -> AppResult<Response> {
    let Query(params) =
        query.map_err(|e| AppError::bad_request(format!("Invalid callback query: {e}")))?;

    state
        .login_service
        .complete_login(&provider, &origin, params)
        .await?;

    Ok(found(&state.success_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn origin_of(request: Request<()>) -> Result<RequestOrigin, AppError> {
        let (mut parts, ()) = request.into_parts();
        RequestOrigin::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_origin_from_host_header() {
        let request = Request::builder()
            .uri("/login_steam/")
            .header(header::HOST, "localhost:8000")
            .body(())
            .unwrap();
        assert_eq!(
            origin_of(request).await.unwrap(),
            RequestOrigin("http://localhost:8000".to_string())
        );
    }

    #[tokio::test]
    async fn test_origin_honours_forwarded_proto() {
        let request = Request::builder()
            .uri("/login_steam/")
            .header(header::HOST, "login.example.com")
            .header(X_FORWARDED_PROTO, "https, http")
            .body(())
            .unwrap();
        assert_eq!(origin_of(request).await.unwrap().0, "https://login.example.com");

        let request = Request::builder()
            .uri("/login_steam/")
            .header(header::HOST, "login.example.com")
            .header(X_FORWARDED_PROTO, "gopher")
            .body(())
            .unwrap();
        assert_eq!(origin_of(request).await.unwrap().0, "http://login.example.com");
    }

    #[tokio::test]
    async fn test_origin_rejects_bad_host() {
        let request = Request::builder()
            .uri("/login_steam/")
            .header(header::HOST, "evil.example/steal?")
            .body(())
            .unwrap();
        let err = origin_of(request).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let request = Request::builder().uri("/login_steam/").body(()).unwrap();
        let err = origin_of(request).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_valid_hosts() {
        assert!(is_valid_host("localhost"));
        assert!(is_valid_host("127.0.0.1:8000"));
        assert!(is_valid_host("[::1]:8000"));
        assert!(!is_valid_host(""));
        assert!(!is_valid_host("user@host"));
    }
}
