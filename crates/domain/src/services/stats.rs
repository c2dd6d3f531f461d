//! Attendance statistics derived from a ledger snapshot.
//!
//! Everything here is recomputed on each read; nothing is cached.

use crate::models::{
    Completion, DashboardSummary, DayStatus, EventDay, LedgerSnapshot, MealSlot, ScanKey,
    ScanRecord, SlotStatus, SlotTotal, EVENT_DAY_COUNT,
};

/// Number of records shown in the recent activity feed.
pub const DEFAULT_RECENT_LIMIT: usize = 12;

/// Checkable units per participant (`days x slots`).
pub fn slots_per_participant() -> usize {
    usize::from(EVENT_DAY_COUNT) * MealSlot::ALL.len()
}

fn is_served(snapshot: &LedgerSnapshot, participant_id: &str, day: EventDay, slot: MealSlot) -> bool {
    snapshot
        .scan(&ScanKey::derive(participant_id, day, slot))
        .is_some()
}

/// Served slots for one participant out of `days x slots`.
pub fn participant_completion(snapshot: &LedgerSnapshot, participant_id: &str) -> Completion {
    let done = EventDay::all()
        .flat_map(|day| MealSlot::ALL.into_iter().map(move |slot| (day, slot)))
        .filter(|(day, slot)| is_served(snapshot, participant_id, *day, *slot))
        .count();
    Completion {
        done,
        total: slots_per_participant(),
    }
}

/// Day-by-slot attendance grid for one participant.
pub fn participant_grid(snapshot: &LedgerSnapshot, participant_id: &str) -> Vec<DayStatus> {
    EventDay::all()
        .map(|day| DayStatus {
            day,
            label: day.label(),
            slots: MealSlot::ALL
                .into_iter()
                .map(|slot| {
                    let record = snapshot.scan(&ScanKey::derive(participant_id, day, slot));
                    SlotStatus {
                        slot,
                        served: record.is_some(),
                        served_at: record.map(|r| r.time),
                    }
                })
                .collect(),
        })
        .collect()
}

/// Per-slot totals across all days, out of `participants x days`.
///
/// Only records of current participants count; records left behind by a
/// deleted participant are ignored.
pub fn slot_totals(snapshot: &LedgerSnapshot) -> Vec<SlotTotal> {
    let participants = snapshot.participants();
    MealSlot::ALL
        .into_iter()
        .map(|slot| {
            let served = participants
                .iter()
                .flat_map(|p| EventDay::all().map(move |day| (p, day)))
                .filter(|(p, day)| is_served(snapshot, &p.id, *day, slot))
                .count();
            SlotTotal {
                slot,
                label: slot.label().to_string(),
                served: Completion {
                    done: served,
                    total: participants.len() * usize::from(EVENT_DAY_COUNT),
                },
            }
        })
        .collect()
}

/// Most recent records first, at most `limit`.
pub fn recent_activity(snapshot: &LedgerSnapshot, limit: usize) -> Vec<ScanRecord> {
    let mut records: Vec<&ScanRecord> = snapshot.scans().collect();
    records.sort_by(|a, b| b.time.cmp(&a.time).then_with(|| a.key.cmp(&b.key)));
    records.into_iter().take(limit).cloned().collect()
}

/// Full dashboard summary.
pub fn dashboard(snapshot: &LedgerSnapshot, recent_limit: usize) -> DashboardSummary {
    let slots = slot_totals(snapshot);
    let progress = Completion {
        done: slots.iter().map(|s| s.served.done).sum(),
        total: snapshot.participant_count() * slots_per_participant(),
    };

    DashboardSummary {
        participants: snapshot.participant_count(),
        percent: progress.percent(),
        progress,
        slots,
        recent: recent_activity(snapshot, recent_limit),
    }
}
