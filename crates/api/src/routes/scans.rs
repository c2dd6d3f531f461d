//! Scan endpoint handlers.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::{record_scan as record_scan_metric, record_scan_failure};
use crate::services::extract_code;
use domain::models::{EventDay, MealSlot, ScanContext, ScanRecord, SlotWindow};
use domain::services::{stats, LedgerError, ScanOutcome};

/// Query parameters of the QR entry URL.
#[derive(Debug, Deserialize)]
pub struct ScanLinkQuery {
    pub code: Option<String>,
}

/// Body of a station scan.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordScanRequest {
    /// Raw scanner input: a bare token or the full scan URL.
    pub code: String,
    /// Overrides the current scan context day.
    pub day: Option<u8>,
    /// Overrides the current scan context slot.
    pub slot: Option<MealSlot>,
}

/// Outcome of a scan plus what was scanned.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResponse {
    #[serde(flatten)]
    pub outcome: ScanOutcome,
    pub code: String,
    pub day: EventDay,
    pub slot: MealSlot,
    /// Station display text.
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ListScansQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ListScansResponse {
    pub scans: Vec<ScanRecord>,
    pub total: usize,
}

/// Body of a scan context update.
#[derive(Debug, Deserialize)]
pub struct SetScanContextRequest {
    pub day: u8,
    pub slot: MealSlot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotInfo {
    pub slot: MealSlot,
    pub label: &'static str,
    pub window: SlotWindow,
}

#[derive(Debug, Serialize)]
pub struct DayInfo {
    pub day: EventDay,
    pub label: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotsResponse {
    pub slots: Vec<SlotInfo>,
    pub days: Vec<DayInfo>,
    /// Slot whose window contains the server's local time, if any.
    pub current_slot: Option<MealSlot>,
}

fn parse_day(day: u8) -> Result<EventDay, ApiError> {
    EventDay::try_from(day).map_err(|e| ApiError::Validation(e.to_string()))
}

fn outcome_message(outcome: &ScanOutcome, code: &str, day: EventDay, slot: MealSlot) -> String {
    match outcome {
        ScanOutcome::Accepted(record) => format!(
            "{} served: {} ({})",
            record.participant.name,
            slot.label(),
            day.label()
        ),
        ScanOutcome::Duplicate(record) => format!(
            "{} already served {} ({}) at {}",
            record.participant.name,
            slot.label(),
            day.label(),
            record
                .time
                .with_timezone(&chrono::Local)
                .format("%H:%M")
        ),
        ScanOutcome::InvalidCode => format!("Code \"{}\" is unknown", code),
    }
}

async fn scan(
    state: &AppState,
    raw: &str,
    day: Option<EventDay>,
    slot: Option<MealSlot>,
) -> Result<ScanResponse, ApiError> {
    let code = extract_code(raw);
    if code.is_empty() {
        return Err(ApiError::Validation("code must not be empty".to_string()));
    }

    let context = *state.scan_context.read().await;
    let day = day.unwrap_or(context.day);
    let slot = slot.unwrap_or(context.slot);

    let outcome = match state.ledger.validate_and_record(&code, day, slot).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if matches!(e, LedgerError::Transport(_)) {
                record_scan_failure();
            }
            return Err(e.into());
        }
    };
    record_scan_metric(&outcome);

    Ok(ScanResponse {
        message: outcome_message(&outcome, &code, day, slot),
        outcome,
        code,
        day,
        slot,
    })
}

/// Scan via the URL encoded in a participant's QR code, using the current
/// scan context.
///
/// GET /scan?code=<token>
pub async fn scan_from_link(
    State(state): State<AppState>,
    Query(query): Query<ScanLinkQuery>,
) -> Result<Json<ScanResponse>, ApiError> {
    let code = query
        .code
        .ok_or_else(|| ApiError::Validation("code query parameter is required".to_string()))?;
    Ok(Json(scan(&state, &code, None, None).await?))
}

/// Validate a scanned code and record the meal.
///
/// POST /api/v1/scans
pub async fn record_scan(
    State(state): State<AppState>,
    Json(request): Json<RecordScanRequest>,
) -> Result<Json<ScanResponse>, ApiError> {
    let day = request.day.map(parse_day).transpose()?;
    Ok(Json(scan(&state, &request.code, day, request.slot).await?))
}

/// All scan records, newest first.
///
/// GET /api/v1/scans?limit=<n>
pub async fn list_scans(
    State(state): State<AppState>,
    Query(query): Query<ListScansQuery>,
) -> Result<Json<ListScansResponse>, ApiError> {
    let snapshot = state.ledger.snapshot().await?;
    let total = snapshot.scan_count();
    let scans = stats::recent_activity(&snapshot, query.limit.unwrap_or(total));
    Ok(Json(ListScansResponse { scans, total }))
}

/// GET /api/v1/scan-context
pub async fn get_scan_context(State(state): State<AppState>) -> Json<ScanContext> {
    Json(*state.scan_context.read().await)
}

/// Switch the day and slot being served.
///
/// PUT /api/v1/scan-context
pub async fn set_scan_context(
    State(state): State<AppState>,
    Json(request): Json<SetScanContextRequest>,
) -> Result<Json<ScanContext>, ApiError> {
    let context = ScanContext::new(parse_day(request.day)?, request.slot);
    *state.scan_context.write().await = context;
    info!(day = %context.day, slot = %context.slot, "Scan context changed");
    Ok(Json(context))
}

/// Slot catalogue with serving windows.
///
/// GET /api/v1/slots
pub async fn list_slots() -> Json<SlotsResponse> {
    Json(SlotsResponse {
        slots: MealSlot::ALL
            .into_iter()
            .map(|slot| SlotInfo {
                slot,
                label: slot.label(),
                window: slot.window(),
            })
            .collect(),
        days: EventDay::all()
            .map(|day| DayInfo {
                day,
                label: day.label(),
            })
            .collect(),
        current_slot: MealSlot::at_time(chrono::Local::now().time()),
    })
}
