//! Request middleware: response headers and API token authorization.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, SERVER},
        HeaderMap, HeaderName, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::Response,
};
use log::{debug, info, warn};

use crate::error::ApiError;
use crate::models::{ErrorCode, RequestId};
use crate::state::AppState;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");
pub const X_REQUEST_DURATION: HeaderName = HeaderName::from_static("x-request-duration");
pub const X_INSTANCE: HeaderName = HeaderName::from_static("x-instance");

/// Generates a request id of 32 lowercase hexadecimal characters.
fn new_request_id() -> String {
    let mut bytes = [0u8; 16];
    if getrandom::getrandom(&mut bytes).is_err() {
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        return format!("{:032x}", nanos);
    }
    hex::encode(bytes)
}

/// Adds `X-Request-Id` and `X-Request-Duration` to every response and removes `Server`.
///
/// The request id is also stored as a [`RequestId`] extension so handlers can
/// include it in error bodies.
pub async fn response_headers(mut request: Request, next: Next) -> Response {
    let started = Instant::now();
    let request_id = new_request_id();

    debug!(
        "{} {} assigned request id {}",
        request.method(),
        request.uri().path(),
        request_id
    );
    request
        .extensions_mut()
        .insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    let headers = response.headers_mut();
    headers.remove(SERVER);

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert(X_REQUEST_ID, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("{:.2}ms", elapsed_ms)) {
        headers.insert(X_REQUEST_DURATION, value);
    }

    response
}

/// Extracts the first address from `X-Forwarded-For`, if present.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

/// Rejects requests without a configured `Authorization: Bearer` token.
///
/// # Returns
///
/// - `401 Unauthorized`: If no bearer token was supplied
/// - `403 Forbidden`: If the token is not one of the configured API tokens
pub async fn require_api_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let request_id = request.extensions().get::<RequestId>().cloned();
    let client = client_ip(request.headers()).unwrap_or_else(|| "unknown".to_string());

    let token = match bearer_token(request.headers()) {
        Some(token) => token,
        None => {
            warn!(
                "Rejected {} {} from {}: no API token",
                request.method(),
                request.uri().path(),
                client
            );
            return Err(ApiError::new(
                StatusCode::UNAUTHORIZED,
                ErrorCode::Unauthorized,
                "No API token was specified.",
            )
            .with_request_id(request_id.as_ref()));
        }
    };

    if !state.api_tokens.contains(token) {
        warn!(
            "Rejected {} {} from {}: unknown API token",
            request.method(),
            request.uri().path(),
            client
        );
        return Err(ApiError::new(
            StatusCode::FORBIDDEN,
            ErrorCode::Forbidden,
            "The specified API token is not valid.",
        )
        .with_request_id(request_id.as_ref()));
    }

    info!(
        "Authorized {} {} from {}",
        request.method(),
        request.uri().path(),
        client
    );

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_id() {
        let first = new_request_id();
        assert_eq!(first.len(), 32);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(first, new_request_id());
    }

    #[test]
    fn test_client_ip() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers), None);

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer my-api-token"));
        assert_eq!(bearer_token(&headers), Some("my-api-token"));
    }
}
