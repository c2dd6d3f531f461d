//! Storage seam for the check-in ledger.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use crate::models::{LedgerSnapshot, Participant, ScanRecord};

/// Errors raised by a ledger store.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Backing store unreachable or the write failed. Safe to retry.
    #[error("Store unavailable: {0}")]
    Transport(String),

    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

/// Result of a conditional scan insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The key was absent and the record is now committed.
    Inserted(ScanRecord),
    /// The key was already present; carries the record that won.
    Existing(ScanRecord),
}

/// Rows removed by a bulk clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearedCounts {
    pub participants: u64,
    pub scans: u64,
}

/// Caller-owned handle receiving a fresh snapshot after every change.
#[derive(Debug, Clone)]
pub struct SnapshotSubscription {
    rx: watch::Receiver<Arc<LedgerSnapshot>>,
}

impl SnapshotSubscription {
    pub fn new(rx: watch::Receiver<Arc<LedgerSnapshot>>) -> Self {
        Self { rx }
    }

    /// The most recently published snapshot.
    pub fn current(&self) -> Arc<LedgerSnapshot> {
        self.rx.borrow().clone()
    }

    /// Wait for the next snapshot. Returns `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<Arc<LedgerSnapshot>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// Subscribable participant/scan store with a compare-and-set scan write.
///
/// `insert_scan_if_absent` is the only way a scan record is created; it must
/// be atomic per key so concurrent stations can never both commit the same
/// key.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    /// Short name for logs and health output.
    fn backend(&self) -> &'static str;

    /// Read the authoritative current state.
    async fn snapshot(&self) -> Result<Arc<LedgerSnapshot>, StoreError>;

    /// Subscribe to published snapshots.
    fn subscribe(&self) -> SnapshotSubscription;

    /// Insert new participants. All-or-nothing.
    async fn insert_participants(&self, participants: &[Participant]) -> Result<(), StoreError>;

    /// Hard delete a participant. Returns whether it existed. Scans are kept.
    async fn delete_participant(&self, id: &str) -> Result<bool, StoreError>;

    /// Commit `record` only if no record exists at its key.
    async fn insert_scan_if_absent(&self, record: &ScanRecord)
        -> Result<InsertOutcome, StoreError>;

    /// Remove every scan record.
    async fn clear_scans(&self) -> Result<u64, StoreError>;

    /// Remove every scan record and participant.
    async fn clear_all(&self) -> Result<ClearedCounts, StoreError>;

    /// Cheap connectivity check.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscription_sees_updates() {
        let (tx, rx) = watch::channel(Arc::new(LedgerSnapshot::default()));
        let mut sub = SnapshotSubscription::new(rx);
        assert_eq!(sub.current().participant_count(), 0);

        tx.send_replace(Arc::new(LedgerSnapshot::new(
            vec![Participant {
                id: "P1".to_string(),
                name: "Alice".to_string(),
                email: None,
                qr_code: "QR1".to_string(),
                created_at: chrono::Utc::now(),
            }],
            vec![],
        )));

        let next = sub.changed().await.expect("snapshot");
        assert_eq!(next.participant_count(), 1);
        assert_eq!(sub.current().participant_count(), 1);
    }

    #[tokio::test]
    async fn test_subscription_ends_when_sender_dropped() {
        let (tx, rx) = watch::channel(Arc::new(LedgerSnapshot::default()));
        let mut sub = SnapshotSubscription::new(rx);
        drop(tx);
        assert!(sub.changed().await.is_none());
    }

    #[test]
    fn test_store_error_transient() {
        assert!(StoreError::Transport("down".into()).is_transient());
        assert!(!StoreError::Conflict("dup".into()).is_transient());
    }
}
