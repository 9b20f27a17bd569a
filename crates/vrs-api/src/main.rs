//! # vrs-api: Binary Entry Point
//!
//! Reads configuration from the environment, hydrates from Postgres when
//! `DATABASE_URL` is set, and serves the API (default port 8080).

use vrs_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Configuration rejected: {e}");
        e
    })?;
    if config.auth_secret.is_none() {
        tracing::warn!(
            "VRS_INSECURE_DEV_AUTH is set: session token signatures are NOT verified. \
             Never run this configuration outside local development."
        );
    }
    let port = config.port;
    tracing::info!(policy = %config.pending_policy, "pending reservation policy");

    // Optional; absent means in-memory only.
    let db_pool = vrs_api::db::init_pool().await.map_err(|e| {
        tracing::error!("Database initialization failed: {e}");
        e
    })?;

    let state = AppState::new(config)?.with_db_pool(db_pool);

    state.hydrate_from_db().await.map_err(|e| {
        tracing::error!("Database hydration failed: {e}");
        e
    })?;

    let app = vrs_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("VRS API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Structured tracing; `LOG_FORMAT=json` switches to JSON lines.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
