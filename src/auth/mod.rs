//! PSK-based authentication module.
//!
//! Clients present the service key in the `apikey` header (or `x-api-key`),
//! or as a bearer token. Comparison is constant-time.

use axum::{
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;

use crate::errors::{codes, ErrorResponse};

/// Primary header carrying the service key.
pub const API_KEY_HEADER: &str = "apikey";

/// Legacy header name, still accepted.
pub const LEGACY_API_KEY_HEADER: &str = "x-api-key";

/// PSK authentication layer function that takes the expected PSK as a parameter.
pub async fn psk_auth_layer(
    expected_psk: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    // No PSK configured: dev mode
    let Some(expected) = expected_psk else {
        return next.run(request).await;
    };

    match presented_key(request.headers()) {
        Some(key) if constant_time_compare(key, &expected) => next.run(request).await,
        Some(_) => unauthorized_response("Invalid API key"),
        None => unauthorized_response("Missing API key"),
    }
}

/// Extract the key from the first header that carries one.
fn presented_key(headers: &HeaderMap) -> Option<&str> {
    let from_header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    from_header(API_KEY_HEADER)
        .or_else(|| from_header(LEGACY_API_KEY_HEADER))
        .or_else(|| {
            from_header(header::AUTHORIZATION.as_str()).and_then(|s| s.strip_prefix("Bearer "))
        })
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorResponse::new(codes::UNAUTHORIZED, message);
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
