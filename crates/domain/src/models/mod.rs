//! Domain models for meal check-in.

pub mod dashboard;
pub mod meal_slot;
pub mod participant;
pub mod scan;
pub mod scan_context;
pub mod snapshot;

pub use dashboard::{Completion, DashboardSummary, DayStatus, SlotStatus, SlotTotal};
pub use meal_slot::{EventDay, MealSlot, SlotWindow, EVENT_DAY_COUNT};
pub use participant::{
    BulkImportRequest, CreateParticipantRequest, ImportRow, Participant, SearchParticipantsQuery,
};
pub use scan::{ParticipantRef, ScanKey, ScanRecord};
pub use scan_context::ScanContext;
pub use snapshot::LedgerSnapshot;
