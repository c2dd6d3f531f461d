//! Domain services for meal check-in.
//!
//! Services contain business logic that operates on domain models.

pub mod ledger;
pub mod memory_store;
pub mod stats;
pub mod store;

pub use ledger::{
    decide, CheckInLedger, Decision, LedgerError, ResetConfirmation, ResetReport, ResetScope,
    RetryPolicy, ScanOutcome,
};
pub use memory_store::MemoryLedgerStore;
pub use store::{ClearedCounts, InsertOutcome, LedgerStore, SnapshotSubscription, StoreError};
