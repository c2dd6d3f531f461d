//! Scan repository for database operations.

use sqlx::{PgConnection, PgPool};

use crate::entities::ScanEntity;
use crate::metrics::QueryTimer;
use domain::models::ScanRecord;

/// Repository for scan record database operations.
#[derive(Clone)]
pub struct ScanRepository {
    pool: PgPool,
}

impl ScanRepository {
    /// Creates a new ScanRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Reads on `conn` so a caller can combine it with other reads in one
    /// transaction.
    pub async fn find_all(&self, conn: &mut PgConnection) -> Result<Vec<ScanEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_all_scans");
        let result = sqlx::query_as::<_, ScanEntity>(
            r#"
            SELECT scan_key, participant_id, participant_name, day, slot, scanned_at
            FROM scans
            ORDER BY scanned_at DESC, scan_key
            "#,
        )
        .fetch_all(conn)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_key(&self, scan_key: &str) -> Result<Option<ScanEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_scan_by_key");
        let result = sqlx::query_as::<_, ScanEntity>(
            r#"
            SELECT scan_key, participant_id, participant_name, day, slot, scanned_at
            FROM scans
            WHERE scan_key = $1
            "#,
        )
        .bind(scan_key)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Insert the record unless its key is already taken.
    ///
    /// Returns the inserted row, or `None` when another writer got there first.
    pub async fn insert_if_absent(
        &self,
        record: &ScanRecord,
    ) -> Result<Option<ScanEntity>, sqlx::Error> {
        let timer = QueryTimer::new("insert_scan_if_absent");
        let result = sqlx::query_as::<_, ScanEntity>(
            r#"
            INSERT INTO scans (scan_key, participant_id, participant_name, day, slot, scanned_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (scan_key) DO NOTHING
            RETURNING scan_key, participant_id, participant_name, day, slot, scanned_at
            "#,
        )
        .bind(record.key.as_str())
        .bind(&record.participant.id)
        .bind(&record.participant.name)
        .bind(i16::from(record.day.index()))
        .bind(record.slot.as_str())
        .bind(record.time)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Delete every scan record, keeping participants.
    pub async fn delete_all(&self) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("delete_all_scans");
        let result = sqlx::query("DELETE FROM scans").execute(&self.pool).await;
        timer.record();
        Ok(result?.rows_affected())
    }
}
