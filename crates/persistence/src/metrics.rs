//! Database metrics.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Record the duration of one named query.
pub fn record_query_duration(query_name: &'static str, duration_secs: f64) {
    histogram!("database_query_duration_seconds", "query" => query_name).record(duration_secs);
}

/// Record connection pool occupancy.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();

    gauge!("database_connections_active").set(size.saturating_sub(idle) as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_total").set(size as f64);
}

/// Record the size of the most recently loaded ledger snapshot.
pub fn record_snapshot_size(participants: usize, scans: usize) {
    gauge!("ledger_participants").set(participants as f64);
    gauge!("ledger_scans").set(scans as f64);
}

/// Times a database operation.
///
/// ```ignore
/// let timer = QueryTimer::new("find_scan_by_key");
/// let result = sqlx::query_as::<_, ScanEntity>(...).fetch_optional(&pool).await;
/// timer.record();
/// result
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    /// Record the elapsed duration.
    pub fn record(self) {
        record_query_duration(self.query_name, self.start.elapsed().as_secs_f64());
    }
}
