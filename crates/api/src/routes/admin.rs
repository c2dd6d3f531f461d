//! Administrative endpoint handlers.

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_reset;
use domain::services::{ResetConfirmation, ResetReport, ResetScope};

/// Body of a reset request.
#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub scope: ResetScope,
    /// Must equal the scope's confirmation phrase (`reset-scans` or `reset-all`).
    #[serde(default)]
    pub confirm: String,
}

/// Clear scan records, or scan records and participants.
///
/// POST /api/v1/admin/reset
pub async fn reset(
    State(state): State<AppState>,
    Json(request): Json<ResetRequest>,
) -> Result<Json<ResetReport>, ApiError> {
    let confirmation = ResetConfirmation::confirm(request.scope, &request.confirm)?;
    let report = state.ledger.reset(confirmation).await?;
    record_reset(report.scope);
    Ok(Json(report))
}
