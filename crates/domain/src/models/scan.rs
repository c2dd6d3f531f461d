//! Scan record domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::meal_slot::{EventDay, MealSlot};
use super::participant::Participant;

/// Composite key identifying one checkable unit: `{participantId}_day{day}_{slot}`.
///
/// Slot identifiers and day digits never contain `_`, so the key splits back
/// into its parts from the right regardless of what the participant id holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanKey(String);

impl ScanKey {
    /// Derive the key for a participant, day and slot.
    pub fn derive(participant_id: &str, day: EventDay, slot: MealSlot) -> Self {
        Self(format!("{}_day{}_{}", participant_id, day.index(), slot.as_str()))
    }

    /// Wrap a key read back from storage without re-deriving it.
    pub fn from_stored(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split a key into `(participant_id, day, slot)`.
    pub fn parts(&self) -> Option<(&str, EventDay, MealSlot)> {
        let (rest, slot) = self.0.rsplit_once('_')?;
        let slot = MealSlot::parse(slot)?;
        let (participant_id, day) = rest.rsplit_once("_day")?;
        if day.is_empty() || !day.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let day = EventDay::new(day.parse().ok()?)?;
        Some((participant_id, day, slot))
    }
}

impl fmt::Display for ScanKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Participant fields copied into a record at scan time.
///
/// Kept so records stay meaningful after a rename or delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRef {
    pub id: String,
    pub name: String,
}

/// A committed meal check-in. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub key: ScanKey,
    pub participant: ParticipantRef,
    pub day: EventDay,
    pub slot: MealSlot,
    pub time: DateTime<Utc>,
}

impl ScanRecord {
    pub fn new(participant: &Participant, day: EventDay, slot: MealSlot, time: DateTime<Utc>) -> Self {
        Self {
            key: ScanKey::derive(&participant.id, day, slot),
            participant: ParticipantRef {
                id: participant.id.clone(),
                name: participant.name.clone(),
            },
            day,
            slot,
            time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn day(i: u8) -> EventDay {
        EventDay::new(i).unwrap()
    }

    #[test]
    fn test_derive_format() {
        let key = ScanKey::derive("AB12CD34", day(1), MealSlot::Lunch);
        assert_eq!(key.as_str(), "AB12CD34_day1_lunch");
        assert_eq!(key.to_string(), "AB12CD34_day1_lunch");
    }

    #[test]
    fn test_derive_deterministic() {
        let a = ScanKey::derive("P1", day(0), MealSlot::Coffee);
        let b = ScanKey::derive("P1", day(0), MealSlot::Coffee);
        assert_eq!(a, b);
    }

    #[test]
    fn test_derive_injective_over_grid() {
        let ids = ["A", "B", "A_day1", "A_day1_lunch", "day0", "_", ""];
        let mut seen = HashSet::new();
        for id in ids {
            for d in EventDay::all() {
                for slot in MealSlot::ALL {
                    let key = ScanKey::derive(id, d, slot);
                    assert!(seen.insert(key.clone()), "collision on {}", key);
                    assert_eq!(key.parts(), Some((id, d, slot)));
                }
            }
        }
        assert_eq!(seen.len(), ids.len() * 9);
    }

    #[test]
    fn test_parts_rejects_malformed() {
        assert_eq!(ScanKey::from_stored("nonsense").parts(), None);
        assert_eq!(ScanKey::from_stored("P_day9_lunch").parts(), None);
        assert_eq!(ScanKey::from_stored("P_dayx_lunch").parts(), None);
        assert_eq!(ScanKey::from_stored("P_day_lunch").parts(), None);
        assert_eq!(ScanKey::from_stored("P_day1_dinner").parts(), None);
    }

    #[test]
    fn test_record_snapshots_participant() {
        let participant = Participant {
            id: "ID000001".to_string(),
            name: "Alice".to_string(),
            email: None,
            qr_code: "QR000001".to_string(),
            created_at: Utc::now(),
        };
        let now = Utc::now();
        let record = ScanRecord::new(&participant, day(2), MealSlot::Breakfast, now);
        assert_eq!(record.key.as_str(), "ID000001_day2_breakfast");
        assert_eq!(record.participant.name, "Alice");
        assert_eq!(record.participant.id, "ID000001");
        assert_eq!(record.time, now);
    }

    #[test]
    fn test_record_serialization() {
        let record = ScanRecord {
            key: ScanKey::from_stored("P_day0_coffee"),
            participant: ParticipantRef {
                id: "P".to_string(),
                name: "Zoe".to_string(),
            },
            day: day(0),
            slot: MealSlot::Coffee,
            time: Utc::now(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["key"], "P_day0_coffee");
        assert_eq!(value["participant"]["name"], "Zoe");
        assert_eq!(value["day"], 0);
        assert_eq!(value["slot"], "coffee");
    }
}
