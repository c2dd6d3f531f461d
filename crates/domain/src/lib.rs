//! Domain layer for the meal check-in backend.
//!
//! This crate contains:
//! - Domain models (Participant, ScanRecord, MealSlot, EventDay, LedgerSnapshot)
//! - The check-in ledger and its storage seam
//! - Read-only statistics derived from ledger snapshots

pub mod models;
pub mod services;
