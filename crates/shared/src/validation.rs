//! Common validation utilities.

use validator::ValidationError;

/// Trims a display name, returning `None` when nothing is left.
pub fn normalize_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Trims an optional free-text field; blank values become `None`.
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value.and_then(normalize_name)
}

/// Validates that a string contains at least one non-whitespace character.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}
