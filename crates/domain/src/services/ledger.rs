//! Check-in ledger: validate-and-record plus participant administration.
//!
//! The scan decision itself is [`decide`], a pure function over a snapshot.
//! [`CheckInLedger`] feeds it the current snapshot and commits the resulting
//! write intent through the store's conditional insert, which is the only
//! path that creates scan records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::store::{InsertOutcome, LedgerStore, SnapshotSubscription, StoreError};
use crate::models::{
    EventDay, ImportRow, LedgerSnapshot, MealSlot, Participant, ScanKey, ScanRecord,
};
use shared::token::generate_unique_token;
use shared::validation::{normalize_name, normalize_optional};

/// Ledger errors. `InvalidCode` and `Duplicate` are outcomes, not errors.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Participant name must not be empty")]
    EmptyName,

    #[error("Import contained no rows with a name")]
    EmptyImport,

    #[error("Participant not found: {0}")]
    ParticipantNotFound(String),

    #[error("Reset of {0} requires explicit confirmation")]
    ConfirmationRequired(ResetScope),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store unavailable: {0}")]
    Transport(String),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Transport(msg) => Self::Transport(msg),
            StoreError::Conflict(msg) => Self::Conflict(msg),
        }
    }
}

/// Result of a validate-and-record call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "record", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// First scan of this slot; the record was committed.
    Accepted(ScanRecord),
    /// The slot was already served; carries the existing record.
    Duplicate(ScanRecord),
    /// No participant holds this code.
    InvalidCode,
}

impl ScanOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted(_) => "accepted",
            Self::Duplicate(_) => "duplicate",
            Self::InvalidCode => "invalid_code",
        }
    }

    pub fn record(&self) -> Option<&ScanRecord> {
        match self {
            Self::Accepted(r) | Self::Duplicate(r) => Some(r),
            Self::InvalidCode => None,
        }
    }
}

/// Outcome of [`decide`] plus the record to commit, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub outcome: ScanOutcome,
    pub write: Option<ScanRecord>,
}

/// Decide a scan against a snapshot without touching storage.
pub fn decide(
    snapshot: &LedgerSnapshot,
    code: &str,
    day: EventDay,
    slot: MealSlot,
    now: DateTime<Utc>,
) -> Decision {
    let Some(participant) = snapshot.find_by_qr_code(code) else {
        return Decision {
            outcome: ScanOutcome::InvalidCode,
            write: None,
        };
    };

    let key = ScanKey::derive(&participant.id, day, slot);
    if let Some(existing) = snapshot.scan(&key) {
        return Decision {
            outcome: ScanOutcome::Duplicate(existing.clone()),
            write: None,
        };
    }

    let record = ScanRecord::new(participant, day, slot, now);
    Decision {
        outcome: ScanOutcome::Accepted(record.clone()),
        write: Some(record),
    }
}

/// Scope of an administrative reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetScope {
    /// Scan records only.
    Scans,
    /// Scan records and participants.
    All,
}

impl ResetScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scans => "scans",
            Self::All => "all",
        }
    }

    /// Phrase the operator must type back to confirm.
    pub fn confirmation_phrase(&self) -> &'static str {
        match self {
            Self::Scans => "reset-scans",
            Self::All => "reset-all",
        }
    }
}

impl std::fmt::Display for ResetScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Proof that an operator confirmed a destructive reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetConfirmation {
    scope: ResetScope,
}

impl ResetConfirmation {
    /// Confirm `scope` if `phrase` matches its confirmation phrase exactly.
    pub fn confirm(scope: ResetScope, phrase: &str) -> Result<Self, LedgerError> {
        if phrase == scope.confirmation_phrase() {
            Ok(Self { scope })
        } else {
            Err(LedgerError::ConfirmationRequired(scope))
        }
    }

    pub fn scope(&self) -> ResetScope {
        self.scope
    }
}

/// Rows removed by a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetReport {
    pub scope: ResetScope,
    pub participants_removed: u64,
    pub scans_removed: u64,
}

/// Retry policy for transient store failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each failure.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * (1u32 << attempt.saturating_sub(1).min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

/// The check-in ledger service.
#[derive(Clone)]
pub struct CheckInLedger {
    store: Arc<dyn LedgerStore>,
    retry: RetryPolicy,
}

impl CheckInLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self {
            store,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    /// Current authoritative snapshot.
    pub async fn snapshot(&self) -> Result<Arc<LedgerSnapshot>, LedgerError> {
        let store = &self.store;
        Ok(self.with_retry("snapshot", move || store.snapshot()).await?)
    }

    /// Subscribe to live snapshots.
    pub fn subscribe(&self) -> SnapshotSubscription {
        self.store.subscribe()
    }

    /// Validate `code` for `(day, slot)` and record the meal if not yet served.
    ///
    /// Every attempt ends in a conditional insert, so retrying after a lost
    /// response reports the committed record as `Duplicate` rather than
    /// writing twice.
    pub async fn validate_and_record(
        &self,
        code: &str,
        day: EventDay,
        slot: MealSlot,
    ) -> Result<ScanOutcome, LedgerError> {
        let snapshot = self.snapshot().await?;
        let decision = decide(&snapshot, code, day, slot, Utc::now());

        let Some(record) = decision.write else {
            match &decision.outcome {
                ScanOutcome::Duplicate(existing) => info!(
                    participant_id = %existing.participant.id,
                    day = %day,
                    slot = %slot,
                    "Scan refused: slot already served"
                ),
                _ => info!(day = %day, slot = %slot, "Scan refused: unknown code"),
            }
            return Ok(decision.outcome);
        };

        let store = &self.store;
        let record = &record;
        let committed = self
            .with_retry("insert_scan_if_absent", move || store.insert_scan_if_absent(record))
            .await?;

        let outcome = match committed {
            InsertOutcome::Inserted(record) => {
                info!(
                    participant_id = %record.participant.id,
                    key = %record.key,
                    "Scan accepted"
                );
                ScanOutcome::Accepted(record)
            }
            InsertOutcome::Existing(existing) => {
                info!(
                    participant_id = %existing.participant.id,
                    key = %existing.key,
                    "Scan refused: slot served concurrently"
                );
                ScanOutcome::Duplicate(existing)
            }
        };
        Ok(outcome)
    }

    /// Create a participant with fresh `id` and `qr_code` tokens.
    pub async fn add_participant(
        &self,
        name: &str,
        email: Option<&str>,
    ) -> Result<Participant, LedgerError> {
        let name = normalize_name(name).ok_or(LedgerError::EmptyName)?;
        let snapshot = self.snapshot().await?;
        let mut taken = HashSet::new();
        let participant = new_participant(&snapshot, &mut taken, name, normalize_optional(email));

        let store = &self.store;
        let batch = std::slice::from_ref(&participant);
        self.with_retry("insert_participants", move || store.insert_participants(batch))
            .await?;

        info!(participant_id = %participant.id, "Participant added");
        Ok(participant)
    }

    /// Import parsed spreadsheet rows, skipping rows without a name.
    ///
    /// Fails with [`LedgerError::EmptyImport`] and writes nothing when no row
    /// has a name.
    pub async fn bulk_import(&self, rows: Vec<ImportRow>) -> Result<Vec<Participant>, LedgerError> {
        let total_rows = rows.len();
        let valid: Vec<(String, Option<String>)> = rows
            .into_iter()
            .filter_map(|row| {
                normalize_name(&row.name).map(|name| (name, normalize_optional(row.email.as_deref())))
            })
            .collect();

        if valid.is_empty() {
            warn!(rows = total_rows, "Import rejected: no row has a name");
            return Err(LedgerError::EmptyImport);
        }

        let snapshot = self.snapshot().await?;
        let mut taken = HashSet::new();
        let participants: Vec<Participant> = valid
            .into_iter()
            .map(|(name, email)| new_participant(&snapshot, &mut taken, name, email))
            .collect();

        let store = &self.store;
        let batch = participants.as_slice();
        self.with_retry("insert_participants", move || store.insert_participants(batch))
            .await?;

        info!(
            imported = participants.len(),
            skipped = total_rows - participants.len(),
            "Participants imported"
        );
        Ok(participants)
    }

    /// Hard delete a participant. Their scan records stay in the ledger.
    pub async fn delete_participant(&self, id: &str) -> Result<(), LedgerError> {
        let store = &self.store;
        let existed = self
            .with_retry("delete_participant", move || store.delete_participant(id))
            .await?;
        if !existed {
            return Err(LedgerError::ParticipantNotFound(id.to_string()));
        }
        info!(participant_id = %id, "Participant deleted");
        Ok(())
    }

    /// Participants whose name or email contains `query`, in creation order.
    pub async fn search_participants(
        &self,
        query: Option<&str>,
    ) -> Result<Vec<Participant>, LedgerError> {
        let snapshot = self.snapshot().await?;
        let query = query.map(str::trim).filter(|q| !q.is_empty());
        Ok(snapshot
            .participants()
            .into_iter()
            .filter(|p| query.map(|q| p.matches(q)).unwrap_or(true))
            .cloned()
            .collect())
    }

    /// Remove every scan record. Participants are untouched.
    pub async fn reset_scans(
        &self,
        confirmation: ResetConfirmation,
    ) -> Result<ResetReport, LedgerError> {
        if confirmation.scope() != ResetScope::Scans {
            return Err(LedgerError::ConfirmationRequired(ResetScope::Scans));
        }
        let store = &self.store;
        let scans_removed = self.with_retry("clear_scans", move || store.clear_scans()).await?;
        warn!(scans_removed, "All scan records cleared");
        Ok(ResetReport {
            scope: ResetScope::Scans,
            participants_removed: 0,
            scans_removed,
        })
    }

    /// Remove every scan record and participant.
    pub async fn reset_all(
        &self,
        confirmation: ResetConfirmation,
    ) -> Result<ResetReport, LedgerError> {
        if confirmation.scope() != ResetScope::All {
            return Err(LedgerError::ConfirmationRequired(ResetScope::All));
        }
        let store = &self.store;
        let counts = self.with_retry("clear_all", move || store.clear_all()).await?;
        warn!(
            participants_removed = counts.participants,
            scans_removed = counts.scans,
            "All ledger data cleared"
        );
        Ok(ResetReport {
            scope: ResetScope::All,
            participants_removed: counts.participants,
            scans_removed: counts.scans,
        })
    }

    /// Dispatch a confirmed reset to the matching scope.
    pub async fn reset(&self, confirmation: ResetConfirmation) -> Result<ResetReport, LedgerError> {
        match confirmation.scope() {
            ResetScope::Scans => self.reset_scans(confirmation).await,
            ResetScope::All => self.reset_all(confirmation).await,
        }
    }

    async fn with_retry<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            if attempt > 0 {
                tokio::time::sleep(self.retry.delay_for(attempt)).await;
            }
            attempt += 1;

            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    debug!(
                        operation,
                        attempt,
                        error = %err,
                        "Transient store failure, retrying"
                    );
                }
                Err(err) => {
                    if err.is_transient() {
                        warn!(operation, attempts = attempt, error = %err, "Store operation failed");
                    }
                    return Err(err);
                }
            }
        }
    }
}

fn new_participant(
    snapshot: &LedgerSnapshot,
    taken: &mut HashSet<String>,
    name: String,
    email: Option<String>,
) -> Participant {
    let id = generate_unique_token(|t| {
        taken.contains(t) || snapshot.has_participant_id(t) || snapshot.has_qr_code(t)
    });
    taken.insert(id.clone());
    let qr_code = generate_unique_token(|t| {
        taken.contains(t) || snapshot.has_participant_id(t) || snapshot.has_qr_code(t)
    });
    taken.insert(qr_code.clone());

    Participant {
        id,
        name,
        email,
        qr_code,
        created_at: Utc::now(),
    }
}
