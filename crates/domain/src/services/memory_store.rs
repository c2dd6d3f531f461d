//! In-process ledger store.
//!
//! Used for tests and single-node deployments without a database.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use super::store::{ClearedCounts, InsertOutcome, LedgerStore, SnapshotSubscription, StoreError};
use crate::models::{LedgerSnapshot, Participant, ScanKey, ScanRecord};

#[derive(Debug, Default)]
struct MemoryState {
    participants: BTreeMap<String, Participant>,
    scans: BTreeMap<ScanKey, ScanRecord>,
}

impl MemoryState {
    fn to_snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot::new(
            self.participants.values().cloned(),
            self.scans.values().cloned(),
        )
    }
}

/// Mutex-guarded maps publishing snapshots over a watch channel.
#[derive(Debug)]
pub struct MemoryLedgerStore {
    state: Mutex<MemoryState>,
    tx: watch::Sender<Arc<LedgerSnapshot>>,
    always_fail: AtomicBool,
    pending_failures: AtomicU32,
}

impl Default for MemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(LedgerSnapshot::default()));
        Self {
            state: Mutex::new(MemoryState::default()),
            tx,
            always_fail: AtomicBool::new(false),
            pending_failures: AtomicU32::new(0),
        }
    }

    /// A store whose every operation fails with a transport error.
    pub fn failing() -> Self {
        let store = Self::new();
        store.always_fail.store(true, Ordering::SeqCst);
        store
    }

    /// Make the next `count` operations fail with a transport error.
    pub fn fail_next(&self, count: u32) {
        self.pending_failures.store(count, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.always_fail.load(Ordering::SeqCst) {
            tracing::warn!("Memory store simulating failure");
            return Err(StoreError::Transport("simulated outage".to_string()));
        }
        let consumed = self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if consumed {
            tracing::warn!("Memory store simulating transient failure");
            return Err(StoreError::Transport("simulated transient failure".to_string()));
        }
        Ok(())
    }

    fn publish(&self, state: &MemoryState) {
        self.tx.send_replace(Arc::new(state.to_snapshot()));
    }
}

#[async_trait::async_trait]
impl LedgerStore for MemoryLedgerStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn snapshot(&self) -> Result<Arc<LedgerSnapshot>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(Arc::new(state.to_snapshot()))
    }

    fn subscribe(&self) -> SnapshotSubscription {
        SnapshotSubscription::new(self.tx.subscribe())
    }

    async fn insert_participants(&self, participants: &[Participant]) -> Result<(), StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;

        let mut qr_codes: HashSet<&str> = state
            .participants
            .values()
            .map(|p| p.qr_code.as_str())
            .collect();
        let mut ids: HashSet<&str> = state.participants.keys().map(String::as_str).collect();
        for p in participants {
            if !ids.insert(p.id.as_str()) {
                return Err(StoreError::Conflict(format!(
                    "participant id {} already exists",
                    p.id
                )));
            }
            if !qr_codes.insert(p.qr_code.as_str()) {
                return Err(StoreError::Conflict(format!(
                    "qr code {} already exists",
                    p.qr_code
                )));
            }
        }

        for p in participants {
            state.participants.insert(p.id.clone(), p.clone());
        }
        self.publish(&state);
        Ok(())
    }

    async fn delete_participant(&self, id: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let existed = state.participants.remove(id).is_some();
        if existed {
            self.publish(&state);
        }
        Ok(existed)
    }

    async fn insert_scan_if_absent(
        &self,
        record: &ScanRecord,
    ) -> Result<InsertOutcome, StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        if let Some(existing) = state.scans.get(&record.key) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }
        state.scans.insert(record.key.clone(), record.clone());
        self.publish(&state);
        Ok(InsertOutcome::Inserted(record.clone()))
    }

    async fn clear_scans(&self) -> Result<u64, StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let removed = state.scans.len() as u64;
        state.scans.clear();
        self.publish(&state);
        Ok(removed)
    }

    async fn clear_all(&self) -> Result<ClearedCounts, StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let counts = ClearedCounts {
            participants: state.participants.len() as u64,
            scans: state.scans.len() as u64,
        };
        state.participants.clear();
        state.scans.clear();
        self.publish(&state);
        Ok(counts)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        if self.always_fail.load(Ordering::SeqCst) {
            return Err(StoreError::Transport("simulated outage".to_string()));
        }
        Ok(())
    }
}
