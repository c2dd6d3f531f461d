//! PostgreSQL-backed ledger store.
//!
//! Writes go through the repositories; the scan insert relies on the
//! `scans` primary key (`ON CONFLICT DO NOTHING`) as its compare-and-set.
//! Every write fires a `ledger_changed` notification, and each instance
//! listens on that channel to reload and publish a fresh snapshot, so
//! subscribers on every node see changes made anywhere.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::entities::{ParticipantEntity, ScanEntity};
use crate::metrics::{record_pool_metrics, record_snapshot_size};
use crate::repositories::{ParticipantRepository, ScanRepository};
use domain::models::{LedgerSnapshot, Participant, ScanRecord};
use domain::services::{ClearedCounts, InsertOutcome, LedgerStore, SnapshotSubscription, StoreError};

/// Notification channel raised by the change triggers.
pub const CHANGE_CHANNEL: &str = "ledger_changed";

/// Pause before re-subscribing after the listener connection drops.
const LISTEN_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Snapshot reads see participants and scans from the same instant.
const SNAPSHOT_ISOLATION: &str = "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY";

/// Map a sqlx error onto the store error taxonomy.
///
/// Unique violations (SQLSTATE 23505) are conflicts; everything else is
/// treated as a transport failure.
pub fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some("23505") {
            return StoreError::Conflict(db_err.message().to_string());
        }
    }
    StoreError::Transport(err.to_string())
}

/// Reads full ledger state and publishes it to subscribers.
#[derive(Clone)]
struct SnapshotLoader {
    pool: PgPool,
    participants: ParticipantRepository,
    scans: ScanRepository,
    tx: Arc<watch::Sender<Arc<LedgerSnapshot>>>,
}

impl SnapshotLoader {
    async fn load(&self) -> Result<Arc<LedgerSnapshot>, StoreError> {
        let (participants, scans) = self.read_consistent().await.map_err(map_sqlx_error)?;

        let records = scans
            .into_iter()
            .filter_map(|row| match ScanRecord::try_from(row) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable scan row");
                    None
                }
            });
        let snapshot =
            LedgerSnapshot::new(participants.into_iter().map(Participant::from), records);
        record_snapshot_size(snapshot.participant_count(), snapshot.scan_count());
        Ok(Arc::new(snapshot))
    }

    /// Both tables as of a single point in time.
    async fn read_consistent(&self) -> Result<(Vec<ParticipantEntity>, Vec<ScanEntity>), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(SNAPSHOT_ISOLATION).execute(&mut *tx).await?;
        let participants = self.participants.find_all(&mut tx).await?;
        let scans = self.scans.find_all(&mut tx).await?;
        tx.commit().await?;
        Ok((participants, scans))
    }

    async fn refresh(&self) -> Result<(), StoreError> {
        let snapshot = self.load().await?;
        self.tx.send_replace(snapshot);
        Ok(())
    }

    async fn listen(self, pool: PgPool) {
        loop {
            if let Err(e) = self.listen_once(&pool).await {
                warn!(error = %e, "Ledger change listener lost its connection");
            }
            tokio::time::sleep(LISTEN_RETRY_DELAY).await;
        }
    }

    async fn listen_once(&self, pool: &PgPool) -> Result<(), sqlx::Error> {
        let mut listener = PgListener::connect_with(pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;
        info!(channel = CHANGE_CHANNEL, "Listening for ledger changes");

        // Changes made while unsubscribed were never announced.
        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Failed to reload ledger after subscribing");
        }

        loop {
            let notification = listener.recv().await?;
            debug!(table = notification.payload(), "Ledger change notification");
            if let Err(e) = self.refresh().await {
                warn!(error = %e, "Failed to reload ledger after change");
            }
        }
    }
}

/// Aborts the listener task once the last store handle is dropped.
struct ListenerHandle(JoinHandle<()>);

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Ledger store backed by the `participants` and `scans` tables.
#[derive(Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
    loader: SnapshotLoader,
    _listener: Arc<ListenerHandle>,
}

impl PgLedgerStore {
    /// Load current state and start listening for changes.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn connect(pool: PgPool) -> Result<Self, StoreError> {
        let loader = SnapshotLoader {
            pool: pool.clone(),
            participants: ParticipantRepository::new(pool.clone()),
            scans: ScanRepository::new(pool.clone()),
            tx: Arc::new(watch::channel(Arc::new(LedgerSnapshot::default())).0),
        };
        loader.refresh().await?;

        let listener = tokio::spawn(loader.clone().listen(pool.clone()));

        Ok(Self {
            pool,
            loader,
            _listener: Arc::new(ListenerHandle(listener)),
        })
    }

    /// Publish state after a local write without waiting for the notification.
    async fn refresh_after_write(&self) {
        if let Err(e) = self.loader.refresh().await {
            warn!(error = %e, "Failed to reload ledger after write");
        }
    }
}

#[async_trait::async_trait]
impl LedgerStore for PgLedgerStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn snapshot(&self) -> Result<Arc<LedgerSnapshot>, StoreError> {
        self.loader.load().await
    }

    fn subscribe(&self) -> SnapshotSubscription {
        SnapshotSubscription::new(self.loader.tx.subscribe())
    }

    async fn insert_participants(&self, participants: &[Participant]) -> Result<(), StoreError> {
        self.loader
            .participants
            .insert_many(participants)
            .await
            .map_err(map_sqlx_error)?;
        self.refresh_after_write().await;
        Ok(())
    }

    async fn delete_participant(&self, id: &str) -> Result<bool, StoreError> {
        let deleted = self
            .loader
            .participants
            .delete(id)
            .await
            .map_err(map_sqlx_error)?;
        if deleted {
            self.refresh_after_write().await;
        }
        Ok(deleted)
    }

    async fn insert_scan_if_absent(
        &self,
        record: &ScanRecord,
    ) -> Result<InsertOutcome, StoreError> {
        let scans = &self.loader.scans;

        // A concurrent reset can remove the winning row between the
        // conflicting insert and the read-back; one more round settles it.
        for _ in 0..2 {
            if let Some(row) = scans.insert_if_absent(record).await.map_err(map_sqlx_error)? {
                let inserted = ScanRecord::try_from(row)
                    .map_err(|e| StoreError::Transport(e.to_string()))?;
                self.refresh_after_write().await;
                return Ok(InsertOutcome::Inserted(inserted));
            }

            if let Some(row) = scans
                .find_by_key(record.key.as_str())
                .await
                .map_err(map_sqlx_error)?
            {
                let existing = ScanRecord::try_from(row)
                    .map_err(|e| StoreError::Transport(e.to_string()))?;
                return Ok(InsertOutcome::Existing(existing));
            }
        }

        Err(StoreError::Transport(format!(
            "scan {} could not be settled",
            record.key
        )))
    }

    async fn clear_scans(&self) -> Result<u64, StoreError> {
        let removed = self
            .loader
            .scans
            .delete_all()
            .await
            .map_err(map_sqlx_error)?;
        self.refresh_after_write().await;
        Ok(removed)
    }

    async fn clear_all(&self) -> Result<ClearedCounts, StoreError> {
        let (participants, scans) = self
            .loader
            .participants
            .delete_all_with_scans()
            .await
            .map_err(map_sqlx_error)?;
        self.refresh_after_write().await;
        Ok(ClearedCounts {
            participants,
            scans,
        })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        record_pool_metrics(&self.pool);
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
