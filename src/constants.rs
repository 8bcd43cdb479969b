/// Default bind address (all interfaces)
pub const DEFAULT_HOST: &str = "0.0.0.0";

pub const DEFAULT_PORT: u16 = 8080;

/// Database file, relative to the working directory
pub const DEFAULT_DB_PATH: &str = "accounts.db";

/// Prebuilt frontend bundle served for every non-API path
pub const DEFAULT_FRONTEND_DIR: &str = "frontend/dist";

/// Prefix required on the `Authorization` header of protected routes
pub const BEARER_PREFIX: &str = "Bearer ";

/// chrono format of a metric bucket key, e.g. `2024-05-01 13:00:00`
pub const HOUR_FORMAT: &str = "%Y-%m-%d %H:00:00";

/// How far back `GET /api/metrics` looks
pub const METRICS_WINDOW_HOURS: i64 = 24;
