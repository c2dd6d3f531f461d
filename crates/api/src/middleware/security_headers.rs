//! Security headers middleware.

use axum::{
    body::Body,
    http::{header, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

/// Response header names set by [`security_headers_middleware`].
pub mod headers {
    pub const X_CONTENT_TYPE_OPTIONS: &str = "x-content-type-options";
    pub const X_FRAME_OPTIONS: &str = "x-frame-options";
    pub const REFERRER_POLICY: &str = "referrer-policy";
}

/// Adds hardening headers to every response.
///
/// Ledger state changes with every scan, so `Cache-Control: no-store` is set
/// unless the handler already chose a caching policy (QR images do).
pub async fn security_headers_middleware(req: Request<Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    let response_headers = response.headers_mut();

    response_headers.insert(
        header::HeaderName::from_static(headers::X_CONTENT_TYPE_OPTIONS),
        HeaderValue::from_static("nosniff"),
    );
    response_headers.insert(
        header::HeaderName::from_static(headers::X_FRAME_OPTIONS),
        HeaderValue::from_static("DENY"),
    );
    // Scan URLs carry participant tokens in the query string.
    response_headers.insert(
        header::HeaderName::from_static(headers::REFERRER_POLICY),
        HeaderValue::from_static("no-referrer"),
    );
    if !response_headers.contains_key(header::CACHE_CONTROL) {
        response_headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};
    use tower::ServiceExt;

    async fn cached() -> ([(header::HeaderName, &'static str); 1], &'static str) {
        ([(header::CACHE_CONTROL, "public, max-age=3600")], "png")
    }

    fn app() -> Router {
        Router::new()
            .route("/plain", get(|| async { "ok" }))
            .route("/cached", get(cached))
            .layer(axum::middleware::from_fn(security_headers_middleware))
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_headers_added() {
        let response = app().oneshot(get_request("/plain")).await.unwrap();
        let h = response.headers();
        assert_eq!(h[headers::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(h[headers::X_FRAME_OPTIONS], "DENY");
        assert_eq!(h[headers::REFERRER_POLICY], "no-referrer");
        assert_eq!(h[header::CACHE_CONTROL], "no-store");
    }

    #[tokio::test]
    async fn test_existing_cache_control_kept() {
        let response = app().oneshot(get_request("/cached")).await.unwrap();
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "public, max-age=3600"
        );
    }
}
