mod config;
mod constants;
mod db;
mod error;
mod pool;
mod routes;
mod store;


use axum::ServiceExt;
use axum::{
    Json, Router,
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use config::Config;
use db::Db;
use pool::AccountPool;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::normalize_path::NormalizePath;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa_axum::{router::OpenApiRouter, routes};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_HASH: &str = env!("GIT_HASH");
pub const BUILD_TIME: &str = env!("BUILD_TIME");

pub struct AppState {
    pub pool: AccountPool,
    /// Shared secret accepted by `/api/auth`
    pub passkey: Option<String>,
}

#[derive(Parser)]
#[command(name = "account-pool")]
#[command(about = "Credential pool service with hourly usage metrics")]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port to bind to
    #[arg(short, long)]
    port: Option<u16>,

    /// Path of the database file
    #[arg(long)]
    db_path: Option<PathBuf>,
}

/// Permissive CORS. Every OPTIONS request is answered here with 204.
async fn cors_middleware(request: axum::extract::Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    response
}

/// Build the full application service. Trailing slashes are trimmed before routing;
/// per-request tracing is on outside release mode.
pub fn app(
    state: Arc<AppState>,
    frontend_dir: &Path,
    release_mode: bool,
) -> NormalizePath<Router> {
    let (api_router, openapi) = OpenApiRouter::with_openapi(Default::default())
        .routes(routes!(routes::authenticate))
        .routes(routes!(routes::list_accounts, routes::add_accounts))
        .routes(routes!(routes::get_metrics))
        .split_for_parts();

    let index = routes::IndexFile::new(frontend_dir);
    let mut router = Router::new()
        .route("/health", get(routes::health::health))
        .route("/version", get(routes::health::version))
        .route(
            "/api/openapi.json",
            get(move || {
                let doc = openapi.clone();
                async move { Json(doc) }
            }),
        )
        .merge(api_router)
        .merge(routes::static_routes(frontend_dir))
        // A known path with an unsupported method falls through to the frontend too
        .method_not_allowed_fallback(move || index.clone().serve())
        .layer(middleware::from_fn(cors_middleware))
        .with_state(state);

    if !release_mode {
        router = router.layer(TraceLayer::new_for_http());
    }
    NormalizePath::trim_trailing_slash(router)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = Config::from_env();

    let host = args.host.unwrap_or(config.host);
    let port = args.port.unwrap_or(config.port);
    let db_path = args.db_path.unwrap_or(config.db_path);

    let db = Db::open(&db_path)
        .await
        .expect("Failed to initialize database");

    if config.passkey.is_none() {
        tracing::warn!("PASSKEY is not set; every /api/auth request will fail");
    }

    let state = Arc::new(AppState {
        pool: AccountPool::new(db),
        passkey: config.passkey,
    });

    if config.release_mode {
        info!("Release mode: request logging disabled");
    }
    let app = app(state, &config.frontend_dir, config.release_mode);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .expect("Invalid address");
    info!(
        "Starting account-pool v{}-{} (built {})",
        VERSION, GIT_HASH, BUILD_TIME
    );
    info!("Serving frontend from {}", config.frontend_dir.display());
    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(
        listener,
        ServiceExt::<axum::extract::Request>::into_make_service(app),
    )
    .await
    .expect("Server error");
}
