//! Scan context: the day and slot a scanning station is currently serving.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::meal_slot::{EventDay, MealSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanContext {
    pub day: EventDay,
    pub slot: MealSlot,
}

impl ScanContext {
    pub fn new(day: EventDay, slot: MealSlot) -> Self {
        Self { day, slot }
    }

    /// Context for `day` using the slot open at `time`, falling back to breakfast.
    pub fn for_time(day: EventDay, time: NaiveTime) -> Self {
        Self {
            day,
            slot: MealSlot::at_time(time).unwrap_or(MealSlot::Breakfast),
        }
    }
}
