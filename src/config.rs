use std::env;
use std::path::PathBuf;

use dotenvy::dotenv;

use crate::constants::{DEFAULT_DB_PATH, DEFAULT_FRONTEND_DIR, DEFAULT_HOST, DEFAULT_PORT};

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub frontend_dir: PathBuf,
    /// Shared secret for `/api/auth`. `None` when unset or empty.
    pub passkey: Option<String>,
    /// `GIN_MODE=release`: skip per-request tracing
    pub release_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        if dotenv().is_err() {
            tracing::info!("No .env file found, proceeding with environment variables");
        }

        let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let db_path = env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DB_PATH));
        let frontend_dir = env::var("FRONTEND_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_FRONTEND_DIR));

        let passkey = env::var("PASSKEY").ok().filter(|p| !p.is_empty());

        let release_mode = env::var("GIN_MODE").is_ok_and(|m| m == "release");

        Self {
            host,
            port,
            db_path,
            frontend_dir,
            passkey,
            release_mode,
        }
    }
}
