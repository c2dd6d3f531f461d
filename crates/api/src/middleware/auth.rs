//! Admin authentication middleware.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::error::ApiError;

/// Header carrying the admin key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// Middleware for destructive routes (participant delete, resets).
///
/// The `X-API-Key` header must equal `security.admin_api_key`. When no key is
/// configured, the routes are disabled rather than left open.
pub async fn require_admin(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let expected = state.config.security.admin_api_key.as_str();
    if expected.is_empty() {
        return ApiError::Forbidden("Admin operations are disabled".into()).into_response();
    }

    let provided = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match provided {
        None => ApiError::Unauthorized("Invalid or missing API key".into()).into_response(),
        Some(key) if !keys_match(key, expected) => {
            tracing::warn!(path = %req.uri().path(), "Rejected admin request with wrong API key");
            ApiError::Unauthorized("Invalid or missing API key".into()).into_response()
        }
        Some(_) => next.run(req).await,
    }
}

/// Compares without short-circuiting on the first differing byte.
fn keys_match(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_match() {
        assert!(keys_match("s3cret", "s3cret"));
        assert!(!keys_match("s3cret", "s3creT"));
        assert!(!keys_match("s3cret", "s3cret-longer"));
        assert!(!keys_match("", "x"));
    }

    #[test]
    fn test_api_key_header_name() {
        assert_eq!(API_KEY_HEADER, "X-API-Key");
    }
}
