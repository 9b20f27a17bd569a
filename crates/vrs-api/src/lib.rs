//! # vrs-api: HTTP Service for the Vehicle Reservation Stack
//!
//! Exposes the reservation lifecycle, availability checks, and fleet and
//! account administration over JSON/HTTP. All booking rules live in
//! `vrs-engine`; handlers translate requests, call the engine, mirror
//! successful writes to Postgres when configured, and map
//! [`vrs_engine::BookingError`] onto status codes.
//!
//! ## API Surface
//!
//! | Prefix                     | Module                     |
//! |----------------------------|----------------------------|
//! | `/v1/reservations/*`       | [`routes::reservations`]   |
//! | `/v1/clients/:id/reservations` | [`routes::reservations`] |
//! | `/v1/vehicles/*`           | [`routes::vehicles`]       |
//! | `/v1/accounts/*`           | [`routes::accounts`]       |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Generated via utoipa derive macros at `/openapi.json`.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::middleware::metrics::MetricsSnapshot;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health checks (`/health/*`) and `/metrics` are mounted outside the auth
/// middleware so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig::new(state.resolver.clone());
    let metrics = state.metrics.clone();

    let api = Router::new()
        .merge(routes::reservations::router())
        .merge(routes::vehicles::router())
        .merge(routes::accounts::router())
        .merge(routes::reviews::router())
        .merge(openapi::openapi_router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(metrics))
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(metrics_snapshot))
        .with_state(state);

    Router::new().merge(health).merge(api)
}

/// Liveness check: 200 whenever the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness check: 200 when the database, if configured, answers.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    if let Some(pool) = &state.db_pool {
        if let Err(e) = sqlx::query("SELECT 1").execute(pool).await {
            tracing::warn!(error = %e, "readiness check failed: database unreachable");
            return (StatusCode::SERVICE_UNAVAILABLE, "database unavailable");
        }
    }
    (StatusCode::OK, "ready")
}

async fn metrics_snapshot(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
