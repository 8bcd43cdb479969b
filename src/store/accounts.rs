use serde::{Deserialize, Serialize};
use turso::{Connection, Row};
use utoipa::ToSchema;

use super::null_as_default;
use crate::db::Db;
use crate::error::ApiError;

/// A consumable credential record held in the pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Account {
    pub id: i64,
    pub refresh_token: String,
    pub client_id: String,
    pub client_secret: String,
}

/// Account payload accepted by bulk add. Any `id` sent by the client is ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct NewAccount {
    #[serde(default, deserialize_with = "null_as_default")]
    pub refresh_token: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub client_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub client_secret: String,
}

/// `SELECT COUNT(*)` over the pool on an open connection
pub async fn count_accounts(conn: &Connection) -> Result<i64, ApiError> {
    let failed = |e: turso::Error| ApiError::DatabaseError(format!("Failed to count accounts: {e}"));
    let mut rows = conn
        .query("SELECT COUNT(*) FROM accounts", ())
        .await
        .map_err(failed)?;
    let row = rows
        .next()
        .await
        .map_err(failed)?
        .ok_or_else(|| ApiError::DatabaseError("Failed to count accounts: no row".into()))?;
    row.get::<i64>(0).map_err(failed)
}

fn account_from_row(row: &Row) -> Result<Account, ApiError> {
    let read = |e: turso::Error| ApiError::DatabaseError(format!("Failed to read account: {e}"));
    Ok(Account {
        id: row.get::<i64>(0).map_err(read)?,
        refresh_token: row.get::<String>(1).map_err(read)?,
        client_id: row.get::<String>(2).map_err(read)?,
        client_secret: row.get::<String>(3).map_err(read)?,
    })
}

pub struct AccountsStore {
    db: Db,
}

impl AccountsStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Number of accounts currently in the pool
    pub async fn count(&self) -> Result<i64, ApiError> {
        let conn = self.db.connect()?;
        count_accounts(&conn).await
    }

    /// List all accounts in storage order
    pub async fn list(&self) -> Result<Vec<Account>, ApiError> {
        self.select(
            "SELECT id, refresh_token, client_id, client_secret FROM accounts ORDER BY id",
            None,
        )
        .await
    }

    /// First `limit` accounts in storage order
    pub async fn take(&self, limit: i64) -> Result<Vec<Account>, ApiError> {
        self.select(
            "SELECT id, refresh_token, client_id, client_secret FROM accounts ORDER BY id LIMIT ?",
            Some(limit),
        )
        .await
    }

    async fn select(&self, sql: &str, limit: Option<i64>) -> Result<Vec<Account>, ApiError> {
        let conn = self.db.connect()?;
        let query = match limit {
            Some(limit) => conn.query(sql, [limit]).await,
            None => conn.query(sql, ()).await,
        };
        let mut rows =
            query.map_err(|e| ApiError::DatabaseError(format!("Failed to list accounts: {e}")))?;

        let mut accounts = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| ApiError::DatabaseError(format!("Failed to list accounts: {e}")))?
        {
            accounts.push(account_from_row(&row)?);
        }
        Ok(accounts)
    }

    /// Delete an account by id. Deleting an absent row is a no-op.
    pub async fn delete(&self, id: i64) -> Result<(), ApiError> {
        let conn = self.db.connect()?;
        conn.execute("DELETE FROM accounts WHERE id = ?", [id])
            .await
            .map_err(|e| ApiError::DatabaseError(format!("Failed to delete account: {e}")))?;
        Ok(())
    }

    /// Insert one account. Fails on a duplicate `client_id`.
    pub async fn insert(&self, account: &NewAccount) -> Result<(), ApiError> {
        let conn = self.db.connect()?;
        conn.execute(
            "INSERT INTO accounts (refresh_token, client_id, client_secret) VALUES (?, ?, ?)",
            (
                account.refresh_token.as_str(),
                account.client_id.as_str(),
                account.client_secret.as_str(),
            ),
        )
        .await
        .map_err(|e| ApiError::DatabaseError(format!("Failed to insert account: {e}")))?;
        Ok(())
    }
}
