//! Common test utilities for integration tests.
//!
//! Tests drive the full router over the in-memory ledger store, so no
//! database is required.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request},
    Router,
};
use domain::models::{EventDay, MealSlot};
use domain::services::{LedgerStore, MemoryLedgerStore};
use meal_checkin_api::app::{create_app, AppState};
use meal_checkin_api::config::{
    Config, DatabaseConfig, EventConfig, LedgerConfig, LoggingConfig, QrConfig, SecurityConfig,
    ServerConfig, StorageBackend, StorageConfig,
};
use meal_checkin_api::services::{MockQrRenderer, QrRenderer};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const ADMIN_KEY: &str = "test-admin-key";
pub const PUBLIC_BASE_URL: &str = "https://meals.test";

/// Test configuration: memory backend, fixed scan context (day 0, breakfast),
/// no retry delay.
pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
        },
        database: DatabaseConfig {
            url: String::new(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout_secs: 10,
            idle_timeout_secs: 600,
        },
        storage: StorageConfig {
            backend: StorageBackend::Memory,
        },
        logging: LoggingConfig {
            level: "debug".to_string(),
            format: "pretty".to_string(),
        },
        security: SecurityConfig {
            cors_origins: vec![],
            admin_api_key: ADMIN_KEY.to_string(),
        },
        event: EventConfig {
            default_day: 0,
            default_slot: Some(MealSlot::Breakfast),
        },
        ledger: LedgerConfig {
            max_attempts: 3,
            retry_base_delay_ms: 0,
            recent_limit: 12,
        },
        qr: QrConfig {
            public_base_url: PUBLIC_BASE_URL.to_string(),
            renderer_url: "https://qr.test/render".to_string(),
            size: 300,
            margin: 10,
            timeout_ms: 1000,
        },
    }
}

/// A router over a fresh memory store, plus the store for direct inspection.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryLedgerStore>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with(
            test_config(),
            Arc::new(MemoryLedgerStore::new()),
            Arc::new(MockQrRenderer::new()),
        )
    }

    pub fn with(
        config: Config,
        store: Arc<MemoryLedgerStore>,
        renderer: Arc<dyn QrRenderer>,
    ) -> Self {
        let state = AppState::new(config, store.clone() as Arc<dyn LedgerStore>, renderer)
            .expect("valid test state");
        Self {
            router: create_app(state),
            store,
        }
    }

    /// Scan records in the store's latest published snapshot.
    pub fn scan_count(&self) -> usize {
        self.store.subscribe().current().scan_count()
    }

    pub fn participant_count(&self) -> usize {
        self.store.subscribe().current().participant_count()
    }

    /// Send a request and return status and parsed JSON body.
    pub async fn send(&self, request: Request<Body>) -> (axum::http::StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        (status, parse_response_body(response).await)
    }

    /// Add a participant through the API and return its JSON.
    pub async fn add_participant(&self, name: &str, email: Option<&str>) -> Value {
        let (status, body) = self
            .send(json_request(
                Method::POST,
                "/api/v1/participants",
                serde_json::json!({ "name": name, "email": email }),
            ))
            .await;
        assert_eq!(status, axum::http::StatusCode::CREATED, "{}", body);
        body
    }

    /// Scan `code` for an explicit day and slot.
    pub async fn scan(&self, code: &str, day: EventDay, slot: MealSlot) -> Value {
        let (status, body) = self
            .send(json_request(
                Method::POST,
                "/api/v1/scans",
                serde_json::json!({ "code": code, "day": day.index(), "slot": slot }),
            ))
            .await;
        assert_eq!(status, axum::http::StatusCode::OK, "{}", body);
        body
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

pub fn day(index: u8) -> EventDay {
    EventDay::new(index).unwrap()
}

/// Build a JSON request.
pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a JSON request carrying an admin API key.
pub fn json_request_with_api_key(
    method: Method,
    uri: &str,
    body: Value,
    api_key: &str,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-API-Key", api_key)
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

/// Build a GET request.
pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Build a DELETE request, optionally with an API key.
pub fn delete_request(uri: &str, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::DELETE).uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("X-API-Key", key);
    }
    builder.body(Body::empty()).unwrap()
}

/// Parse response body as JSON; `Null` for empty or non-JSON bodies.
pub async fn parse_response_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}
