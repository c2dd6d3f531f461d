//! Health check endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::app::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub storage: StorageHealth,
    pub ledger: LedgerHealth,
}

/// Ledger store health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct StorageHealth {
    pub backend: &'static str,
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

/// Size of the most recently published snapshot.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LedgerHealth {
    pub participants: usize,
    pub scans: usize,
}

/// Simple status response for liveness/readiness probes.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Full health check endpoint.
pub async fn health_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let store = state.ledger.store();
    let start = std::time::Instant::now();
    let connected = store.ping().await.is_ok();
    let latency_ms = start.elapsed().as_millis() as u64;

    let snapshot = state.ledger.subscribe().current();
    let response = HealthResponse {
        status: if connected { "healthy" } else { "unhealthy" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        storage: StorageHealth {
            backend: store.backend(),
            connected,
            latency_ms: connected.then_some(latency_ms),
        },
        ledger: LedgerHealth {
            participants: snapshot.participant_count(),
            scans: snapshot.scan_count(),
        },
    };

    let status = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

/// Liveness probe endpoint.
///
/// Returns 200 OK if the process is running.
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 OK if the ledger store is reachable.
pub async fn ready(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    match state.ledger.store().ping().await {
        Ok(()) => Ok(Json(StatusResponse {
            status: "ready".to_string(),
        })),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
