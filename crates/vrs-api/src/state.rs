//! # Application State
//!
//! Configuration read once from the environment, and the shared
//! composition every handler works through: the reservation manager, the
//! fleet manager, the review manager, and the in-memory stores they share. An optional
//! Postgres pool mirrors writes and seeds the stores at startup.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use vrs_core::{Clock, SystemClock, UserId, VehicleId};
use vrs_engine::{
    AccountDirectory, BookingError, Collaborators, FleetManager, IdentityResolver,
    InMemoryAccountDirectory, InMemoryReservationStore, InMemoryReviewStore,
    InMemoryVehicleDirectory, PendingPolicy, ReservationManager, ReservationStore, ReviewManager,
    ReviewStore, SessionSigner, SignatureCheck, TokenResolver, VehicleDirectory,
};
use vrs_state::{Account, Reservation, ReservationStatus, Review, Vehicle, VehicleStatus};

use crate::middleware::metrics::ApiMetrics;

// ── Configuration ───────────────────────────────────────────────────────────

/// Startup configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `PORT` is not a valid port number.
    #[error("invalid PORT '{0}'")]
    InvalidPort(String),

    /// `VRS_PENDING_POLICY` names no known policy.
    #[error("invalid VRS_PENDING_POLICY '{0}' (expected 'block' or 'provisional')")]
    InvalidPolicy(String),

    /// No signing secret and the insecure development mode is off.
    #[error("AUTH_SECRET is not set; set it, or set VRS_INSECURE_DEV_AUTH=1 for local development")]
    MissingSecret,
}

/// Process configuration.
///
/// Custom `Debug` redacts the signing secret.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Listen port.
    pub port: u16,
    /// HMAC key for session tokens.
    pub auth_secret: Option<String>,
    /// Accept tokens without verifying signatures.
    pub insecure_dev_auth: bool,
    /// How pending reservations hold their interval.
    pub pending_policy: PendingPolicy,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_secret", &self.auth_secret.as_ref().map(|_| "[REDACTED]"))
            .field("insecure_dev_auth", &self.insecure_dev_auth)
            .field("pending_policy", &self.pending_policy)
            .finish()
    }
}

impl AppConfig {
    const DEFAULT_PORT: u16 = 8080;

    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => Self::DEFAULT_PORT,
        };
        let pending_policy = match lookup("VRS_PENDING_POLICY") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidPolicy(raw))?,
            None => PendingPolicy::default(),
        };
        let auth_secret = lookup("AUTH_SECRET").filter(|s| !s.is_empty());
        let insecure_dev_auth = lookup("VRS_INSECURE_DEV_AUTH")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let config = Self {
            port,
            auth_secret,
            insecure_dev_auth,
            pending_policy,
        };
        config.signature_check()?;
        Ok(config)
    }

    /// How session signatures are checked under this configuration.
    ///
    /// A configured secret always wins over the development flag.
    pub fn signature_check(&self) -> Result<SignatureCheck, ConfigError> {
        match (&self.auth_secret, self.insecure_dev_auth) {
            (Some(secret), _) => Ok(SignatureCheck::Verify(SessionSigner::new(secret.as_bytes()))),
            (None, true) => Ok(SignatureCheck::InsecureSkip),
            (None, false) => Err(ConfigError::MissingSecret),
        }
    }
}

// ── Hydration ───────────────────────────────────────────────────────────────

/// Failure to load persisted state at startup.
#[derive(Error, Debug)]
pub enum HydrationError {
    /// Query failed or a row could not be decoded.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The loaded rows violate a booking invariant.
    #[error("inconsistent persisted state: {0}")]
    Inconsistent(String),

    /// An in-memory store rejected a row.
    #[error("store error: {0}")]
    Store(#[from] BookingError),
}

/// Counts of records loaded at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HydrationSummary {
    /// Accounts loaded.
    pub accounts: usize,
    /// Vehicles loaded.
    pub vehicles: usize,
    /// Reservations loaded.
    pub reservations: usize,
    /// Reviews loaded.
    pub reviews: usize,
}

/// Cross-record rules persisted state must satisfy before it is loaded:
///
/// - every reservation names an existing vehicle and client account;
/// - no two accepted reservations overlap on one vehicle;
/// - a `RESERVED` vehicle has at least one accepted reservation;
/// - every review names an existing vehicle and client account.
pub fn check_consistency(
    accounts: &[Account],
    vehicles: &[Vehicle],
    reservations: &[Reservation],
    reviews: &[Review],
) -> Result<(), HydrationError> {
    let account_ids: HashSet<UserId> = accounts.iter().map(|a| a.id).collect();
    let vehicle_ids: HashSet<VehicleId> = vehicles.iter().map(|v| v.id).collect();
    let mut accepted: HashMap<VehicleId, Vec<&Reservation>> = HashMap::new();

    for reservation in reservations {
        if !vehicle_ids.contains(&reservation.vehicle_id) {
            return Err(HydrationError::Inconsistent(format!(
                "reservation {} references unknown vehicle {}",
                reservation.id, reservation.vehicle_id
            )));
        }
        if !account_ids.contains(&reservation.client_id) {
            return Err(HydrationError::Inconsistent(format!(
                "reservation {} references unknown client {}",
                reservation.id, reservation.client_id
            )));
        }
        if reservation.status != ReservationStatus::Accepted {
            continue;
        }
        let siblings = accepted.entry(reservation.vehicle_id).or_default();
        if let Some(other) = siblings
            .iter()
            .find(|r| r.period.overlaps(&reservation.period))
        {
            return Err(HydrationError::Inconsistent(format!(
                "accepted reservations {} and {} overlap on vehicle {}",
                other.id, reservation.id, reservation.vehicle_id
            )));
        }
        siblings.push(reservation);
    }

    for vehicle in vehicles {
        if vehicle.status == VehicleStatus::Reserved && !accepted.contains_key(&vehicle.id) {
            return Err(HydrationError::Inconsistent(format!(
                "vehicle {} is RESERVED without an accepted reservation",
                vehicle.id
            )));
        }
    }

    for review in reviews {
        if !vehicle_ids.contains(&review.vehicle_id) || !account_ids.contains(&review.client_id) {
            return Err(HydrationError::Inconsistent(format!(
                "review {} references unknown vehicle {} or client {}",
                review.id, review.vehicle_id, review.client_id
            )));
        }
    }
    Ok(())
}

// ── AppState ────────────────────────────────────────────────────────────────

/// Shared application state, cloned into every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Configuration the process started with.
    pub config: Arc<AppConfig>,
    /// Reservation lifecycle operations.
    pub manager: Arc<ReservationManager>,
    /// Vehicle and account administration.
    pub fleet: Arc<FleetManager>,
    /// Client reviews.
    pub reviews: Arc<ReviewManager>,
    /// Bearer token resolution for the auth middleware.
    pub resolver: Arc<dyn IdentityResolver>,
    /// Request counters.
    pub metrics: ApiMetrics,
    /// Optional Postgres mirror.
    pub db_pool: Option<PgPool>,
    vehicles: Arc<InMemoryVehicleDirectory>,
    accounts: Arc<InMemoryAccountDirectory>,
    reservations: Arc<InMemoryReservationStore>,
    review_store: Arc<InMemoryReviewStore>,
}

impl AppState {
    /// Build the composition on the system clock.
    pub fn new(config: AppConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build the composition on the given clock.
    pub fn with_clock(config: AppConfig, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        let vehicles = Arc::new(InMemoryVehicleDirectory::new());
        let accounts = Arc::new(InMemoryAccountDirectory::new());
        let reservations = Arc::new(InMemoryReservationStore::new());
        let review_store = Arc::new(InMemoryReviewStore::new());

        let resolver: Arc<dyn IdentityResolver> = Arc::new(TokenResolver::new(
            config.signature_check()?,
            vehicles.clone(),
            Arc::clone(&clock),
        ));

        let manager = ReservationManager::new(
            Collaborators {
                vehicles: vehicles.clone(),
                accounts: accounts.clone(),
                reservations: reservations.clone(),
                identity: Arc::clone(&resolver),
                clock: Arc::clone(&clock),
            },
            config.pending_policy,
        );
        let fleet = FleetManager::new(
            vehicles.clone(),
            accounts.clone(),
            manager.locks(),
            Arc::clone(&clock),
        );
        let reviews = ReviewManager::new(
            review_store.clone(),
            reservations.clone(),
            vehicles.clone(),
            accounts.clone(),
            clock,
        );

        Ok(Self {
            config: Arc::new(config),
            manager: Arc::new(manager),
            fleet: Arc::new(fleet),
            reviews: Arc::new(reviews),
            resolver,
            metrics: ApiMetrics::new(),
            db_pool: None,
            vehicles,
            accounts,
            reservations,
            review_store,
        })
    }

    /// Attach a database pool for write-through persistence.
    pub fn with_db_pool(mut self, pool: Option<PgPool>) -> Self {
        self.db_pool = pool;
        self
    }

    /// Load persisted accounts, vehicles, reservations and reviews into the
    /// in-memory stores. A no-op without a pool.
    ///
    /// Fails when a row carries an unknown status or when the rows break a
    /// cross-record rule (see [`check_consistency`]). Nothing is loaded
    /// then.
    pub async fn hydrate_from_db(&self) -> Result<HydrationSummary, HydrationError> {
        let Some(pool) = &self.db_pool else {
            return Ok(HydrationSummary::default());
        };

        let accounts = crate::db::accounts::load_all(pool).await?;
        let vehicles = crate::db::vehicles::load_all(pool).await?;
        let reservations = crate::db::reservations::load_all(pool).await?;
        let reviews = crate::db::reviews::load_all(pool).await?;

        let summary = HydrationSummary {
            accounts: accounts.len(),
            vehicles: vehicles.len(),
            reservations: reservations.len(),
            reviews: reviews.len(),
        };

        check_consistency(&accounts, &vehicles, &reservations, &reviews)?;

        for account in accounts {
            self.accounts.put_account(account)?;
        }
        for vehicle in vehicles {
            self.vehicles.put_vehicle(vehicle)?;
        }
        for reservation in reservations {
            self.reservations.insert(reservation)?;
        }
        for review in reviews {
            self.review_store.insert(review)?;
        }

        tracing::info!(
            accounts = summary.accounts,
            vehicles = summary.vehicles,
            reservations = summary.reservations,
            reviews = summary.reviews,
            "hydrated state from database"
        );
        Ok(summary)
    }
}
