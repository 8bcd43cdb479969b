use chrono::Local;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::db::Db;
use crate::error::ApiError;
use crate::store::{Account, AccountsStore, Activity, Metric, MetricsStore, NewAccount};

/// Account service: hands out and accepts pool accounts and keeps the hourly metrics current.
pub struct AccountPool {
    accounts: AccountsStore,
    metrics: MetricsStore,
    /// Serializes consume/add so the availability check, deletes and bucket upsert
    /// of one request never interleave with another's
    write_lock: Mutex<()>,
}

impl AccountPool {
    pub fn new(db: Db) -> Self {
        Self {
            accounts: AccountsStore::new(db.clone()),
            metrics: MetricsStore::new(db),
            write_lock: Mutex::new(()),
        }
    }

    /// `count == 0` lists the pool; `count > 0` removes and returns that many accounts
    pub async fn list_or_consume(&self, count: i64) -> Result<Vec<Account>, ApiError> {
        if count <= 0 {
            return self.accounts.list().await;
        }
        self.consume(count).await
    }

    async fn consume(&self, count: i64) -> Result<Vec<Account>, ApiError> {
        let _guard = self.write_lock.lock().await;

        let available = self.accounts.count().await?;
        if available < count {
            debug!("Consume of {count} refused, {available} available");
            return Err(ApiError::InsufficientAccounts {
                available,
                requested: count,
            });
        }

        let taken = self.accounts.take(count).await?;
        for account in &taken {
            self.accounts.delete(account.id).await?;
        }

        let metric = self.metrics.record(Activity::Consumed(count), Local::now()).await?;
        info!(
            "Consumed {} accounts, {} remaining",
            taken.len(),
            metric.current_count
        );
        Ok(taken)
    }

    /// Insert each account independently; failures (e.g. duplicate `client_id`) are skipped.
    /// Returns how many were stored.
    pub async fn add_many(&self, accounts: Vec<NewAccount>) -> Result<i64, ApiError> {
        let _guard = self.write_lock.lock().await;

        let mut added = 0;
        for account in &accounts {
            match self.accounts.insert(account).await {
                Ok(()) => added += 1,
                Err(e) => debug!("Skipping account {}: {e}", account.client_id),
            }
        }

        self.metrics.record(Activity::Added(added), Local::now()).await?;
        info!("Added {added} of {} accounts", accounts.len());
        Ok(added)
    }

    /// Accounts currently available
    pub async fn size(&self) -> Result<i64, ApiError> {
        self.accounts.count().await
    }

    /// Metric buckets touched in the last 24 hours, oldest first
    pub async fn recent_metrics(&self) -> Result<Vec<Metric>, ApiError> {
        self.metrics.recent(Local::now()).await
    }
}
