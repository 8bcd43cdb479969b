//! Hourly usage metrics.
//!
//! Each calendar hour owns at most one row, keyed by `hour`. The row is rewritten in place
//! for every consume or add within that hour. Cumulative counters (`total_count`,
//! `used_count`, `api_call_count`) are carried forward from the most recently created row.

use chrono::{DateTime, Duration, Local, Utc};
use serde::{Deserialize, Serialize};
use turso::{Connection, Row, Rows};
use utoipa::ToSchema;

use super::count_accounts;
use crate::constants::{HOUR_FORMAT, METRICS_WINDOW_HOURS};
use crate::db::Db;
use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Metric {
    pub id: i64,
    /// Accounts in the pool when the row was last written
    pub current_count: i64,
    /// Accounts ever added
    pub total_count: i64,
    /// Accounts ever consumed
    pub used_count: i64,
    /// Consume requests served
    pub api_call_count: i64,
    /// Time of the last update to this row
    #[schema(value_type = String, format = DateTime)]
    pub timestamp: DateTime<Local>,
    /// Bucket key, `YYYY-MM-DD HH:00:00`
    pub hour: String,
}

/// Pool activity that moves the hourly counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    /// `n` accounts handed out by one consume request
    Consumed(i64),
    /// `n` accounts successfully inserted by one bulk add
    Added(i64),
}

/// Counter values before applying an activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Counters {
    total: i64,
    used: i64,
    api_calls: i64,
}

impl Counters {
    fn of(metric: &Metric) -> Self {
        Self {
            total: metric.total_count,
            used: metric.used_count,
            api_calls: metric.api_call_count,
        }
    }
}

/// Bucket key for the hour containing `now`
pub fn hour_key(now: &DateTime<Local>) -> String {
    now.format(HOUR_FORMAT).to_string()
}

fn from_millis(ms: i64) -> DateTime<Local> {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .unwrap_or_default()
        .with_timezone(&Local)
}

/// Compute the counters to write for `activity`.
///
/// `seed` is the most recently created row, `bucket` the existing row for the current
/// hour (if any). Adds leave the bucket's own `used`/`api_calls` untouched on update.
fn next_counters(activity: Activity, seed: Counters, bucket: Option<Counters>) -> Counters {
    match activity {
        Activity::Consumed(n) => Counters {
            total: seed.total,
            used: seed.used + n,
            api_calls: seed.api_calls + 1,
        },
        Activity::Added(n) => {
            let carried = bucket.unwrap_or(seed);
            Counters {
                total: seed.total + n,
                used: carried.used,
                api_calls: carried.api_calls,
            }
        }
    }
}

fn metric_from_row(row: &Row) -> Result<Metric, ApiError> {
    let read = |e: turso::Error| ApiError::DatabaseError(format!("Failed to read metric: {e}"));
    Ok(Metric {
        id: row.get::<i64>(0).map_err(read)?,
        current_count: row.get::<i64>(1).map_err(read)?,
        total_count: row.get::<i64>(2).map_err(read)?,
        used_count: row.get::<i64>(3).map_err(read)?,
        api_call_count: row.get::<i64>(4).map_err(read)?,
        timestamp: from_millis(row.get::<i64>(5).map_err(read)?),
        hour: row.get::<String>(6).map_err(read)?,
    })
}

const METRIC_COLUMNS: &str =
    "id, current_count, total_count, used_count, api_call_count, timestamp, hour";

async fn collect_metrics(query: Result<Rows, turso::Error>) -> Result<Vec<Metric>, ApiError> {
    let mut rows =
        query.map_err(|e| ApiError::DatabaseError(format!("Failed to query metrics: {e}")))?;

    let mut metrics = Vec::new();
    while let Some(row) = rows
        .next()
        .await
        .map_err(|e| ApiError::DatabaseError(format!("Failed to query metrics: {e}")))?
    {
        metrics.push(metric_from_row(&row)?);
    }
    Ok(metrics)
}

pub struct MetricsStore {
    db: Db,
}

impl MetricsStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Upsert the bucket row for the hour of `now` after `activity`.
    ///
    /// Callers serialize invocations; the find-or-create itself is not atomic.
    pub async fn record(&self, activity: Activity, now: DateTime<Local>) -> Result<Metric, ApiError> {
        let conn = self.db.connect()?;
        let hour = hour_key(&now);

        let seed = collect_metrics(
            conn.query(
                &format!("SELECT {METRIC_COLUMNS} FROM metrics ORDER BY id DESC LIMIT 1"),
                (),
            )
            .await,
        )
        .await?
        .first()
        .map(Counters::of)
        .unwrap_or_default();

        let current = count_accounts(&conn).await?;

        let bucket = collect_metrics(
            conn.query(
                &format!("SELECT {METRIC_COLUMNS} FROM metrics WHERE hour = ? ORDER BY id LIMIT 1"),
                [hour.as_str()],
            )
            .await,
        )
        .await?
        .into_iter()
        .next();

        let next = next_counters(activity, seed, bucket.as_ref().map(Counters::of));
        let timestamp = now.timestamp_millis();

        let id = match &bucket {
            Some(existing) => {
                conn.execute(
                    "UPDATE metrics SET current_count = ?, total_count = ?, used_count = ?, \
                     api_call_count = ?, timestamp = ? WHERE id = ?",
                    (current, next.total, next.used, next.api_calls, timestamp, existing.id),
                )
                .await
                .map_err(|e| ApiError::DatabaseError(format!("Failed to update metric: {e}")))?;
                existing.id
            }
            None => {
                conn.execute(
                    "INSERT INTO metrics (current_count, total_count, used_count, api_call_count, \
                     timestamp, hour) VALUES (?, ?, ?, ?, ?, ?)",
                    (current, next.total, next.used, next.api_calls, timestamp, hour.as_str()),
                )
                .await
                .map_err(|e| ApiError::DatabaseError(format!("Failed to create metric: {e}")))?;
                tracing::debug!("Created metric bucket {hour}");
                self.id_for_hour(&conn, &hour).await?
            }
        };

        Ok(Metric {
            id,
            current_count: current,
            total_count: next.total,
            used_count: next.used,
            api_call_count: next.api_calls,
            timestamp: from_millis(timestamp),
            hour,
        })
    }

    async fn id_for_hour(&self, conn: &Connection, hour: &str) -> Result<i64, ApiError> {
        let mut rows = conn
            .query("SELECT id FROM metrics WHERE hour = ? ORDER BY id LIMIT 1", [hour])
            .await
            .map_err(|e| ApiError::DatabaseError(format!("Failed to query metrics: {e}")))?;
        let row = rows
            .next()
            .await
            .map_err(|e| ApiError::DatabaseError(format!("Failed to query metrics: {e}")))?
            .ok_or_else(|| ApiError::DatabaseError(format!("Metric bucket {hour} missing")))?;
        row.get::<i64>(0)
            .map_err(|e| ApiError::DatabaseError(format!("Failed to read metric: {e}")))
    }

    /// Rows updated within the last 24 hours of `now`, oldest first
    pub async fn recent(&self, now: DateTime<Local>) -> Result<Vec<Metric>, ApiError> {
        let conn = self.db.connect()?;
        let cutoff = (now - Duration::hours(METRICS_WINDOW_HOURS)).timestamp_millis();
        collect_metrics(
            conn.query(
                &format!(
                    "SELECT {METRIC_COLUMNS} FROM metrics WHERE timestamp >= ? ORDER BY timestamp ASC"
                ),
                [cutoff],
            )
            .await,
        )
        .await
    }

    /// Insert a fully specified row
    #[cfg(test)]
    pub async fn insert(&self, metric: &Metric) -> Result<(), ApiError> {
        let conn = self.db.connect()?;
        conn.execute(
            "INSERT INTO metrics (current_count, total_count, used_count, api_call_count, \
             timestamp, hour) VALUES (?, ?, ?, ?, ?, ?)",
            (
                metric.current_count,
                metric.total_count,
                metric.used_count,
                metric.api_call_count,
                metric.timestamp.timestamp_millis(),
                metric.hour.as_str(),
            ),
        )
        .await
        .map_err(|e| ApiError::DatabaseError(format!("Failed to create metric: {e}")))?;
        Ok(())
    }
}
