use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::services::LedgerError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// An import held no row with a name.
    #[error("Empty import: {0}")]
    EmptyImport(String),

    #[error("Validation error: {} invalid field(s)", .0.len())]
    InvalidFields(Vec<ValidationDetail>),

    /// The ledger store could not be reached; the operation may be retried.
    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<Vec<ValidationDetail>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationDetail {
    pub field: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg, None),
            ApiError::EmptyImport(msg) => (StatusCode::BAD_REQUEST, "empty_import", msg, None),
            ApiError::InvalidFields(details) => {
                let message = match details.as_slice() {
                    [single] => single.message.clone(),
                    _ => format!("{} validation errors", details.len()),
                };
                (
                    StatusCode::BAD_REQUEST,
                    "validation_error",
                    message,
                    Some(details),
                )
            }
            ApiError::TransportFailure(msg) => {
                tracing::warn!("Ledger store unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "transport_failure",
                    "The ledger store is unavailable. Please retry.".into(),
                    None,
                )
            }
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg,
                None,
            ),
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::EmptyName => ApiError::Validation(err.to_string()),
            LedgerError::EmptyImport => ApiError::EmptyImport(err.to_string()),
            LedgerError::ParticipantNotFound(_) => ApiError::NotFound(err.to_string()),
            LedgerError::ConfirmationRequired(scope) => ApiError::Validation(format!(
                "Reset of {} requires confirm = \"{}\"",
                scope,
                scope.confirmation_phrase()
            )),
            LedgerError::Conflict(msg) => ApiError::Conflict(msg),
            LedgerError::Transport(msg) => ApiError::TransportFailure(msg),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationDetail> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| ValidationDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .clone()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", field)),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        ApiError::InvalidFields(details)
    }
}
