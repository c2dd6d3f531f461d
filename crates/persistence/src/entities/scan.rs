//! Scan entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{EventDay, MealSlot, ParticipantRef, ScanKey, ScanRecord};
use sqlx::FromRow;
use thiserror::Error;

/// Database row mapping for the scans table.
#[derive(Debug, Clone, FromRow)]
pub struct ScanEntity {
    pub scan_key: String,
    pub participant_id: String,
    pub participant_name: String,
    pub day: i16,
    pub slot: String,
    pub scanned_at: DateTime<Utc>,
}

/// A stored scan row that does not map onto the domain model.
#[derive(Debug, Error)]
pub enum InvalidScanRow {
    #[error("scan {key} has out-of-range day {day}")]
    Day { key: String, day: i16 },
    #[error("scan {key} has unknown slot {slot}")]
    Slot { key: String, slot: String },
}

impl TryFrom<ScanEntity> for ScanRecord {
    type Error = InvalidScanRow;

    fn try_from(entity: ScanEntity) -> Result<Self, Self::Error> {
        let day = u8::try_from(entity.day)
            .ok()
            .and_then(EventDay::new)
            .ok_or_else(|| InvalidScanRow::Day {
                key: entity.scan_key.clone(),
                day: entity.day,
            })?;
        let slot = MealSlot::parse(&entity.slot).ok_or_else(|| InvalidScanRow::Slot {
            key: entity.scan_key.clone(),
            slot: entity.slot.clone(),
        })?;

        Ok(Self {
            key: ScanKey::from_stored(entity.scan_key),
            participant: ParticipantRef {
                id: entity.participant_id,
                name: entity.participant_name,
            },
            day,
            slot,
            time: entity.scanned_at,
        })
    }
}
