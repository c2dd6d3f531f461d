//! Integration tests for administrative reset.

mod common;

use axum::http::{Method, StatusCode};
use common::{day, json_request, json_request_with_api_key, test_config, TestApp, ADMIN_KEY};
use domain::models::MealSlot;
use domain::services::MemoryLedgerStore;
use meal_checkin_api::services::MockQrRenderer;
use serde_json::json;
use std::sync::Arc;

async fn seeded() -> (TestApp, String) {
    let app = TestApp::new();
    let alice = app.add_participant("Alice", None).await;
    let code = alice["qrCode"].as_str().unwrap().to_string();
    app.scan(&code, day(0), MealSlot::Breakfast).await;
    app.scan(&code, day(0), MealSlot::Lunch).await;
    (app, code)
}

#[tokio::test]
async fn test_reset_requires_api_key() {
    let (app, _) = seeded().await;

    let (status, body) = app
        .send(json_request(
            Method::POST,
            "/api/v1/admin/reset",
            json!({ "scope": "scans", "confirm": "reset-scans" }),
        ))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
    assert_eq!(app.scan_count(), 2);
}

#[tokio::test]
async fn test_reset_disabled_without_configured_key() {
    let mut config = test_config();
    config.security.admin_api_key = String::new();
    let app = TestApp::with(
        config,
        Arc::new(MemoryLedgerStore::new()),
        Arc::new(MockQrRenderer::new()),
    );

    let (status, _) = app
        .send(json_request_with_api_key(
            Method::POST,
            "/api/v1/admin/reset",
            json!({ "scope": "all", "confirm": "reset-all" }),
            "",
        ))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_reset_requires_confirmation() {
    let (app, _) = seeded().await;

    for confirm in [json!(null), json!(""), json!("reset-all"), json!("RESET-SCANS")] {
        let mut body = json!({ "scope": "scans" });
        if !confirm.is_null() {
            body["confirm"] = confirm;
        }
        let (status, response) = app
            .send(json_request_with_api_key(
                Method::POST,
                "/api/v1/admin/reset",
                body,
                ADMIN_KEY,
            ))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(response["message"].as_str().unwrap().contains("reset-scans"));
    }

    assert_eq!(app.scan_count(), 2);
}

#[tokio::test]
async fn test_reset_scans_reopens_slots() {
    let (app, code) = seeded().await;

    let (status, body) = app
        .send(json_request_with_api_key(
            Method::POST,
            "/api/v1/admin/reset",
            json!({ "scope": "scans", "confirm": "reset-scans" }),
            ADMIN_KEY,
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "scope": "scans", "participantsRemoved": 0, "scansRemoved": 2 })
    );
    assert_eq!(app.scan_count(), 0);
    assert_eq!(app.participant_count(), 1);

    let again = app.scan(&code, day(0), MealSlot::Breakfast).await;
    assert_eq!(again["outcome"], "accepted");
}

#[tokio::test]
async fn test_reset_all() {
    let (app, code) = seeded().await;

    let (status, body) = app
        .send(json_request_with_api_key(
            Method::POST,
            "/api/v1/admin/reset",
            json!({ "scope": "all", "confirm": "reset-all" }),
            ADMIN_KEY,
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["participantsRemoved"], 1);
    assert_eq!(body["scansRemoved"], 2);
    assert_eq!(app.participant_count(), 0);

    let after = app.scan(&code, day(0), MealSlot::Breakfast).await;
    assert_eq!(after["outcome"], "invalid_code");
}

#[tokio::test]
async fn test_reset_unknown_scope() {
    let (app, _) = seeded().await;

    let (status, _) = app
        .send(json_request_with_api_key(
            Method::POST,
            "/api/v1/admin/reset",
            json!({ "scope": "everything", "confirm": "reset-all" }),
            ADMIN_KEY,
        ))
        .await;

    assert!(status.is_client_error());
    assert_eq!(app.scan_count(), 2);
}
