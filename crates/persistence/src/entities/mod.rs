//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod participant;
pub mod scan;

pub use participant::ParticipantEntity;
pub use scan::{InvalidScanRow, ScanEntity};
