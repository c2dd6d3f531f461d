//! Read-only aggregate views over a ledger snapshot.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use super::meal_slot::{EventDay, MealSlot};
use super::scan::ScanRecord;

/// Served slots out of the total available, e.g. `2/9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    pub done: usize,
    pub total: usize,
}

impl Completion {
    /// Rounded percentage, 0 when there is nothing to serve.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = (self.done * 100 + self.total / 2) / self.total;
        pct.min(100) as u8
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.done >= self.total
    }
}

impl fmt::Display for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.done, self.total)
    }
}

/// Whether one slot of one day has been served to a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotStatus {
    pub slot: MealSlot,
    pub served: bool,
    pub served_at: Option<DateTime<Utc>>,
}

/// One row of a participant's attendance grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStatus {
    pub day: EventDay,
    pub label: String,
    pub slots: Vec<SlotStatus>,
}

/// Participants served in a slot across all days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotTotal {
    pub slot: MealSlot,
    pub label: String,
    pub served: Completion,
}

/// Dashboard payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub participants: usize,
    pub progress: Completion,
    pub percent: u8,
    pub slots: Vec<SlotTotal>,
    pub recent: Vec<ScanRecord>,
}
