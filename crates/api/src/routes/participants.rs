//! Participant endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::record_participants_imported;
use domain::models::{
    BulkImportRequest, Completion, CreateParticipantRequest, DayStatus, LedgerSnapshot,
    Participant, SearchParticipantsQuery,
};
use domain::services::stats;

/// A participant with their scan link and progress.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantSummary {
    #[serde(flatten)]
    pub participant: Participant,
    pub scan_url: String,
    pub completion: Completion,
}

#[derive(Debug, Serialize)]
pub struct ParticipantListResponse {
    pub participants: Vec<ParticipantSummary>,
    pub total: usize,
}

/// Participant card: summary, QR image link and day-by-slot grid.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantDetailResponse {
    #[serde(flatten)]
    pub summary: ParticipantSummary,
    pub qr_image_url: String,
    pub days: Vec<DayStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub imported: usize,
    pub skipped: usize,
    pub participants: Vec<ParticipantSummary>,
}

fn summarize(state: &AppState, snapshot: &LedgerSnapshot, participant: Participant) -> ParticipantSummary {
    ParticipantSummary {
        scan_url: state.qr_links.scan_url(&participant.qr_code),
        completion: stats::participant_completion(snapshot, &participant.id),
        participant,
    }
}

fn find_participant(snapshot: &LedgerSnapshot, id: &str) -> Result<Participant, ApiError> {
    snapshot
        .participant(id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("Participant not found: {}", id)))
}

/// List participants, optionally filtered by a name or email substring.
///
/// GET /api/v1/participants?search=<text>
pub async fn search_participants(
    State(state): State<AppState>,
    Query(query): Query<SearchParticipantsQuery>,
) -> Result<Json<ParticipantListResponse>, ApiError> {
    let found = state
        .ledger
        .search_participants(query.search.as_deref())
        .await?;
    let snapshot = state.ledger.subscribe().current();

    let participants: Vec<ParticipantSummary> = found
        .into_iter()
        .map(|p| summarize(&state, &snapshot, p))
        .collect();
    Ok(Json(ParticipantListResponse {
        total: participants.len(),
        participants,
    }))
}

/// Register one participant.
///
/// POST /api/v1/participants
pub async fn create_participant(
    State(state): State<AppState>,
    Json(request): Json<CreateParticipantRequest>,
) -> Result<(StatusCode, Json<ParticipantSummary>), ApiError> {
    request.validate()?;

    let participant = state
        .ledger
        .add_participant(&request.name, request.email.as_deref())
        .await?;
    record_participants_imported(1);

    let summary = summarize(&state, &LedgerSnapshot::default(), participant);
    Ok((StatusCode::CREATED, Json(summary)))
}

/// Register participants from parsed spreadsheet rows. Rows without a name
/// are skipped.
///
/// POST /api/v1/participants/import
pub async fn import_participants(
    State(state): State<AppState>,
    Json(request): Json<BulkImportRequest>,
) -> Result<(StatusCode, Json<ImportResponse>), ApiError> {
    request.validate()?;

    let total_rows = request.rows.len();
    let imported = state.ledger.bulk_import(request.rows).await?;
    record_participants_imported(imported.len());

    let empty = LedgerSnapshot::default();
    let participants: Vec<ParticipantSummary> = imported
        .into_iter()
        .map(|p| summarize(&state, &empty, p))
        .collect();

    Ok((
        StatusCode::CREATED,
        Json(ImportResponse {
            imported: participants.len(),
            skipped: total_rows - participants.len(),
            participants,
        }),
    ))
}

/// GET /api/v1/participants/:id
pub async fn get_participant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ParticipantDetailResponse>, ApiError> {
    let snapshot = state.ledger.snapshot().await?;
    let participant = find_participant(&snapshot, &id)?;

    Ok(Json(ParticipantDetailResponse {
        qr_image_url: state.qr_links.image_url(&participant.qr_code),
        days: stats::participant_grid(&snapshot, &participant.id),
        summary: summarize(&state, &snapshot, participant),
    }))
}

/// Hard delete a participant. Their scan records are kept.
///
/// DELETE /api/v1/participants/:id
pub async fn delete_participant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.ledger.delete_participant(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// The participant's QR code as a PNG, fetched from the renderer.
///
/// GET /api/v1/participants/:id/qr.png
pub async fn get_participant_qr(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let snapshot = state.ledger.snapshot().await?;
    let participant = find_participant(&snapshot, &id)?;

    let image_url = state.qr_links.image_url(&participant.qr_code);
    let png = state
        .qr_renderer
        .render_png(&image_url)
        .await
        .map_err(|e| ApiError::ServiceUnavailable(format!("QR renderer unavailable: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            // Tokens never change for a participant.
            (header::CACHE_CONTROL, "private, max-age=86400"),
        ],
        png,
    ))
}
