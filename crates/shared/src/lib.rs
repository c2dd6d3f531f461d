//! Shared utilities and common types for the meal check-in backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Opaque token generation for participant ids and QR codes
//! - Common validation and normalisation helpers

pub mod token;
pub mod validation;
