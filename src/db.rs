use std::path::Path;
use std::sync::Arc;

use tracing::info;
use turso::{Builder, Connection, Database};

use crate::error::ApiError;

const SCHEMA: &[(&str, &str)] = &[
    (
        "accounts table",
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY,
            refresh_token TEXT NOT NULL,
            client_id TEXT NOT NULL UNIQUE,
            client_secret TEXT NOT NULL
        )
        "#,
    ),
    (
        "metrics table",
        r#"
        CREATE TABLE IF NOT EXISTS metrics (
            id INTEGER PRIMARY KEY,
            current_count INTEGER NOT NULL DEFAULT 0,
            total_count INTEGER NOT NULL DEFAULT 0,
            used_count INTEGER NOT NULL DEFAULT 0,
            api_call_count INTEGER NOT NULL DEFAULT 0,
            timestamp INTEGER NOT NULL,
            hour TEXT NOT NULL
        )
        "#,
    ),
    (
        "metrics hour index",
        "CREATE INDEX IF NOT EXISTS idx_metrics_hour ON metrics (hour)",
    ),
    (
        "metrics timestamp index",
        "CREATE INDEX IF NOT EXISTS idx_metrics_timestamp ON metrics (timestamp)",
    ),
];

/// Process-wide database handle, opened once at startup and shared through `AppState`.
#[derive(Clone)]
pub struct Db {
    database: Arc<Database>,
}

impl Db {
    /// Open (or create) the database file and create all tables
    pub async fn open(path: &Path) -> Result<Self, ApiError> {
        let path_str = path.to_str().ok_or_else(|| {
            ApiError::DatabaseError(format!("Database path is not UTF-8: {}", path.display()))
        })?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                ApiError::DatabaseError(format!("Failed to create DB directory: {e}"))
            })?;
        }

        let database = Builder::new_local(path_str)
            .build()
            .await
            .map_err(|e| ApiError::DatabaseError(format!("Failed to open database: {e}")))?;

        let db = Self {
            database: Arc::new(database),
        };
        db.migrate().await?;

        info!("Database initialized at {}", path_str);
        Ok(db)
    }

    async fn migrate(&self) -> Result<(), ApiError> {
        let conn = self.connect()?;
        for (name, sql) in SCHEMA {
            conn.execute(sql, ())
                .await
                .map_err(|e| ApiError::DatabaseError(format!("Failed to create {name}: {e}")))?;
        }
        Ok(())
    }

    /// Get a database connection
    pub fn connect(&self) -> Result<Connection, ApiError> {
        self.database
            .connect()
            .map_err(|e| ApiError::DatabaseError(format!("Failed to get connection: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_creates_schema() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("test.db");

        let db = Db::open(&db_path).await.unwrap();
        assert!(db_path.exists());

        let conn = db.connect().unwrap();
        for table in ["accounts", "metrics"] {
            let mut rows = conn
                .query(&format!("SELECT COUNT(*) FROM {table}"), ())
                .await
                .unwrap();
            let row = rows.next().await.unwrap().unwrap();
            assert_eq!(row.get::<i64>(0).unwrap(), 0);
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_open_rejects_non_utf8_path() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join(OsStr::from_bytes(b"bad\xff.db"));

        let result = Db::open(&db_path).await;
        assert!(matches!(result, Err(ApiError::DatabaseError(_))));
        assert!(!temp_dir.path().join("accounts.db").exists());
    }

    #[tokio::test]
    async fn test_reopen_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        drop(Db::open(&db_path).await.unwrap());
        assert!(Db::open(&db_path).await.is_ok());
    }
}
