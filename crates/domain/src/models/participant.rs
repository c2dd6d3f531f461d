//! Participant domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::validation::validate_not_blank;
use validator::{Validate, ValidationError};

/// Maximum length of a participant name.
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum length of a participant email.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum rows per bulk import request.
pub const MAX_BULK_IMPORT_ROWS: usize = 2000;

/// An event participant holding a meal QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    /// Token embedded in the QR payload. Unique, distinct from `id`.
    pub qr_code: String,
    pub created_at: DateTime<Utc>,
}

impl Participant {
    /// Case-insensitive substring match on name or email.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        self.name.to_lowercase().contains(&query)
            || self
                .email
                .as_deref()
                .map(|e| e.to_lowercase().contains(&query))
                .unwrap_or(false)
    }
}

/// Request payload for adding a participant.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateParticipantRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    #[validate(custom(function = "validate_not_blank"))]
    pub name: String,

    #[validate(length(max = 254, message = "Email must be at most 254 characters"))]
    pub email: Option<String>,
}

/// One parsed spreadsheet row: column A is the name, column B the email.
///
/// A blank name is allowed here; the ledger skips such rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ImportRow {
    #[serde(default)]
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 254, message = "Email must be at most 254 characters"))]
    pub email: Option<String>,
}

impl ImportRow {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: Some(email.into()),
        }
    }
}

/// Request payload for bulk import.
///
/// Rows are validated by the ledger; blank names are skipped rather than rejected.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportRequest {
    #[validate(length(max = 2000, message = "rows must contain at most 2000 items"))]
    #[validate(custom(function = "validate_import_rows"))]
    pub rows: Vec<ImportRow>,
}

/// Applies the per-row limits, reporting the first offending row (1-based).
fn validate_import_rows(rows: &[ImportRow]) -> Result<(), ValidationError> {
    for (index, row) in rows.iter().enumerate() {
        if let Err(errors) = row.validate() {
            let reason = errors
                .field_errors()
                .values()
                .flat_map(|errs| errs.iter())
                .find_map(|e| e.message.clone())
                .unwrap_or_else(|| "invalid row".into());
            let mut err = ValidationError::new("import_row");
            err.message = Some(format!("Row {}: {}", index + 1, reason).into());
            return Err(err);
        }
    }
    Ok(())
}

/// Query parameters for participant listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParticipantsQuery {
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn participant(name: &str, email: Option<&str>) -> Participant {
        Participant {
            id: "ID000001".to_string(),
            name: name.to_string(),
            email: email.map(str::to_string),
            qr_code: "QR000001".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_matches_name_case_insensitive() {
        let p = participant("Amélie Durand", None);
        assert!(p.matches("amélie"));
        assert!(p.matches("DURAND"));
        assert!(!p.matches("martin"));
    }

    #[test]
    fn test_matches_email() {
        let p = participant("Bob", Some("Bob.Smith@Example.com"));
        assert!(p.matches("example.com"));
        assert!(!participant("Bob", None).matches("example"));
    }

    #[test]
    fn test_matches_empty_query() {
        assert!(participant("Anyone", None).matches(""));
    }

    #[test]
    fn test_participant_serializes_camel_case() {
        let value = serde_json::to_value(participant("Alice", None)).unwrap();
        assert_eq!(value["qrCode"], "QR000001");
        assert!(value.get("createdAt").is_some());
        assert!(value["email"].is_null());
    }

    #[test]
    fn test_create_request_validation() {
        let ok = CreateParticipantRequest {
            name: "Alice".to_string(),
            email: None,
        };
        assert!(ok.validate().is_ok());

        let empty = CreateParticipantRequest {
            name: String::new(),
            email: None,
        };
        assert!(empty.validate().is_err());

        let blank = CreateParticipantRequest {
            name: "   ".to_string(),
            email: None,
        };
        assert!(blank.validate().is_err());

        let too_long = CreateParticipantRequest {
            name: "x".repeat(MAX_NAME_LENGTH + 1),
            email: None,
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_import_request_deserialize_missing_fields() {
        let request: BulkImportRequest = serde_json::from_value(json!({
            "rows": [
                { "name": "Alice", "email": "" },
                { "email": "x@y.com" },
                {}
            ]
        }))
        .unwrap();
        assert_eq!(request.rows.len(), 3);
        assert_eq!(request.rows[1].name, "");
        assert!(request.rows[2].email.is_none());
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_import_rows_share_length_limits() {
        let long_name = BulkImportRequest {
            rows: vec![
                ImportRow::new("Alice", "alice@example.com"),
                ImportRow::new("x".repeat(MAX_NAME_LENGTH + 1), ""),
            ],
        };
        let errors = long_name.validate().unwrap_err();
        let message = errors.field_errors()["rows"][0].message.clone().unwrap();
        assert_eq!(message, "Row 2: Name must be at most 100 characters");

        let long_email = BulkImportRequest {
            rows: vec![ImportRow::new(
                "Bob",
                format!("{}@example.com", "b".repeat(MAX_EMAIL_LENGTH)),
            )],
        };
        assert!(long_email.validate().is_err());

        let at_limit = BulkImportRequest {
            rows: vec![ImportRow::new("x".repeat(MAX_NAME_LENGTH), "")],
        };
        assert!(at_limit.validate().is_ok());
    }

    #[test]
    fn test_import_request_too_many_rows() {
        let request = BulkImportRequest {
            rows: vec![ImportRow::default(); MAX_BULK_IMPORT_ROWS + 1],
        };
        assert!(request.validate().is_err());
    }
}
