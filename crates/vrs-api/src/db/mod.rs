//! # Database Persistence Layer
//!
//! Postgres persistence for accounts, vehicles, reservations and reviews
//! via SQLx.
//!
//! ## Architecture
//!
//! The database layer is **optional**. When `DATABASE_URL` is set, every
//! successful write is mirrored to PostgreSQL after the engine has applied
//! it, and all rows are loaded back into the in-memory stores at startup
//! (see [`crate::state::AppState::hydrate_from_db`]). When absent, the API
//! runs in-memory only.
//!
//! A write that fails to reach Postgres is undone in memory before the
//! request fails, so a 500 leaves no trace. Upserts never replace a newer
//! row, so two write-throughs racing to the database settle on the later
//! state.
//!
//! The engine remains the only place booking rules are enforced. A row
//! whose status is not one of the known names fails hydration rather than
//! being coerced.

pub mod accounts;
pub mod reservations;
pub mod reviews;
pub mod vehicles;

use sqlx::postgres::{PgPool, PgPoolOptions};

use vrs_engine::BookingError;

use crate::error::AppError;

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set, running in-memory only. \
                 Reservations will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}

/// Map a write-through failure to a 500, first undoing the in-memory
/// change with `undo`.
///
/// An undo that fails means a later write already superseded this one; it
/// is logged and the request still fails.
pub(crate) fn persist_failed(
    kind: &str,
    id: impl std::fmt::Display,
    err: sqlx::Error,
    undo: impl FnOnce() -> Result<(), BookingError>,
) -> AppError {
    tracing::error!(%id, kind, error = %err, "failed to persist record to database");
    if let Err(undo_err) = undo() {
        tracing::error!(%id, kind, error = %undo_err, "in-memory change not undone");
    }
    AppError::Internal(format!("{kind} {id} was not persisted; the change was rolled back"))
}

/// Wrap a decode failure so it surfaces through `sqlx::Error`.
pub(crate) fn corrupt(table: &str, id: uuid::Uuid, detail: impl std::fmt::Display) -> sqlx::Error {
    sqlx::Error::Decode(
        vrs_core::VrsError::Corruption(format!("{table} row {id}: {detail}")).into(),
    )
}
