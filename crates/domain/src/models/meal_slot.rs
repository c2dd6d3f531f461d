//! Meal slots and event days.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of event days; valid day indices are `0..EVENT_DAY_COUNT`.
pub const EVENT_DAY_COUNT: u8 = 3;

/// One of the three daily meal windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Coffee,
}

/// Nominal serving window of a slot, in whole local hours `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotWindow {
    pub start_hour: u8,
    pub end_hour: u8,
}

impl SlotWindow {
    /// Whether the given time of day falls inside the window.
    pub fn contains(&self, time: NaiveTime) -> bool {
        let minutes = time.hour() * 60 + time.minute();
        minutes >= u32::from(self.start_hour) * 60 && minutes < u32::from(self.end_hour) * 60
    }
}

impl MealSlot {
    /// All slots in serving order.
    pub const ALL: [MealSlot; 3] = [MealSlot::Breakfast, MealSlot::Lunch, MealSlot::Coffee];

    /// Stable identifier used in keys, URLs and the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Coffee => "coffee",
        }
    }

    /// Parse from the stable identifier.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "breakfast" => Some(Self::Breakfast),
            "lunch" => Some(Self::Lunch),
            "coffee" => Some(Self::Coffee),
            _ => None,
        }
    }

    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Breakfast => "Breakfast",
            Self::Lunch => "Lunch",
            Self::Coffee => "Coffee Break",
        }
    }

    pub fn window(&self) -> SlotWindow {
        let (start_hour, end_hour) = match self {
            Self::Breakfast => (8, 10),
            Self::Lunch => (12, 14),
            Self::Coffee => (18, 20),
        };
        SlotWindow {
            start_hour,
            end_hour,
        }
    }

    /// The slot whose window contains `time`, if any.
    ///
    /// Windows are informational only; scanning outside them is allowed.
    pub fn at_time(time: NaiveTime) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.window().contains(time))
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown meal slot identifier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown meal slot: {0}")]
pub struct ParseMealSlotError(pub String);

impl FromStr for MealSlot {
    type Err = ParseMealSlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ParseMealSlotError(s.to_string()))
    }
}

/// Ordinal event day, `0..EVENT_DAY_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct EventDay(u8);

/// Error returned for a day index outside the event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Day must be between 0 and 2, got {0}")]
pub struct InvalidEventDay(pub u8);

impl EventDay {
    /// The opening day of the event.
    pub const FIRST: EventDay = EventDay(0);

    pub fn new(index: u8) -> Option<Self> {
        (index < EVENT_DAY_COUNT).then_some(Self(index))
    }

    pub fn index(self) -> u8 {
        self.0
    }

    /// All event days in order.
    pub fn all() -> impl Iterator<Item = EventDay> {
        (0..EVENT_DAY_COUNT).map(EventDay)
    }

    /// One-based display label, e.g. `Day 1`.
    pub fn label(self) -> String {
        format!("Day {}", self.0 + 1)
    }
}

impl TryFrom<u8> for EventDay {
    type Error = InvalidEventDay;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidEventDay(value))
    }
}

impl From<EventDay> for u8 {
    fn from(day: EventDay) -> Self {
        day.0
    }
}

impl fmt::Display for EventDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_meal_slot_round_trip_str() {
        for slot in MealSlot::ALL {
            assert_eq!(MealSlot::parse(slot.as_str()), Some(slot));
            assert_eq!(slot.as_str().parse::<MealSlot>(), Ok(slot));
        }
    }

    #[test]
    fn test_meal_slot_parse_unknown() {
        assert_eq!(MealSlot::parse("dinner"), None);
        assert_eq!(MealSlot::parse("Breakfast"), None);
        let err = "supper".parse::<MealSlot>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown meal slot: supper");
    }

    #[test]
    fn test_meal_slot_serde() {
        assert_eq!(
            serde_json::to_string(&MealSlot::Coffee).unwrap(),
            "\"coffee\""
        );
        let slot: MealSlot = serde_json::from_str("\"lunch\"").unwrap();
        assert_eq!(slot, MealSlot::Lunch);
    }

    #[test]
    fn test_meal_slot_at_time() {
        assert_eq!(MealSlot::at_time(time(8, 0)), Some(MealSlot::Breakfast));
        assert_eq!(MealSlot::at_time(time(9, 59)), Some(MealSlot::Breakfast));
        assert_eq!(MealSlot::at_time(time(10, 0)), None);
        assert_eq!(MealSlot::at_time(time(13, 30)), Some(MealSlot::Lunch));
        assert_eq!(MealSlot::at_time(time(18, 15)), Some(MealSlot::Coffee));
        assert_eq!(MealSlot::at_time(time(20, 0)), None);
        assert_eq!(MealSlot::at_time(time(3, 0)), None);
    }

    #[test]
    fn test_event_day_bounds() {
        assert!(EventDay::new(0).is_some());
        assert!(EventDay::new(2).is_some());
        assert!(EventDay::new(3).is_none());
        assert_eq!(EventDay::FIRST.index(), 0);
        assert_eq!(EventDay::try_from(7u8), Err(InvalidEventDay(7)));
    }

    #[test]
    fn test_event_day_all_and_label() {
        let days: Vec<u8> = EventDay::all().map(EventDay::index).collect();
        assert_eq!(days, vec![0, 1, 2]);
        assert_eq!(EventDay::new(0).unwrap().label(), "Day 1");
        assert_eq!(EventDay::new(2).unwrap().label(), "Day 3");
    }

    #[test]
    fn test_event_day_serde_rejects_out_of_range() {
        let day: EventDay = serde_json::from_str("1").unwrap();
        assert_eq!(day.index(), 1);
        assert!(serde_json::from_str::<EventDay>("3").is_err());
        assert_eq!(serde_json::to_string(&day).unwrap(), "1");
    }

    #[test]
    fn test_invalid_event_day_message() {
        assert_eq!(
            InvalidEventDay(5).to_string(),
            "Day must be between 0 and 2, got 5"
        );
    }
}
