//! Participant repository for database operations.

use sqlx::{PgConnection, PgPool};

use crate::entities::ParticipantEntity;
use crate::metrics::QueryTimer;
use domain::models::Participant;

/// Repository for participant-related database operations.
#[derive(Clone)]
pub struct ParticipantRepository {
    pool: PgPool,
}

impl ParticipantRepository {
    /// Creates a new ParticipantRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// All participants in registration order.
    /// Reads on `conn` so a caller can combine it with other reads in one
    /// transaction.
    pub async fn find_all(&self, conn: &mut PgConnection) -> Result<Vec<ParticipantEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_all_participants");
        let result = sqlx::query_as::<_, ParticipantEntity>(
            r#"
            SELECT id, name, email, qr_code, created_at
            FROM participants
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(conn)
        .await;
        timer.record();
        result
    }

    /// Insert a batch of participants in one transaction.
    ///
    /// A unique violation on any row rolls back the whole batch.
    pub async fn insert_many(&self, participants: &[Participant]) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_participants");
        let mut tx = self.pool.begin().await?;
        for p in participants {
            sqlx::query(
                r#"
                INSERT INTO participants (id, name, email, qr_code, created_at)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(&p.id)
            .bind(&p.name)
            .bind(&p.email)
            .bind(&p.qr_code)
            .bind(p.created_at)
            .execute(&mut *tx)
            .await?;
        }
        let result = tx.commit().await;
        timer.record();
        result
    }

    /// Delete a participant. Returns whether a row was removed.
    pub async fn delete(&self, id: &str) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_participant");
        let result = sqlx::query("DELETE FROM participants WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    /// Delete every participant together with every scan record.
    ///
    /// Returns `(participants_removed, scans_removed)`.
    pub async fn delete_all_with_scans(&self) -> Result<(u64, u64), sqlx::Error> {
        let timer = QueryTimer::new("delete_all_participants");
        let mut tx = self.pool.begin().await?;
        let scans = sqlx::query("DELETE FROM scans")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let participants = sqlx::query("DELETE FROM participants")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;
        timer.record();
        Ok((participants, scans))
    }
}
