//! # Availability Subcommand
//!
//! Answers "is this vehicle free over `[start, end)`?" against a JSON
//! snapshot of reservations, using the same conflict rules as the server:
//! pending and accepted reservations block, declined and cancelled ones
//! never do, and intervals that only touch do not overlap.
//!
//! Snapshot layout:
//!
//! ```json
//! { "reservations": [ { "id": "...", "vehicle_id": "...", "period": { "start": "2026-07-01", "end": "2026-07-05" }, "status": "PENDING", ... } ] }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use vrs_core::{DateRange, VehicleId};
use vrs_engine::{AvailabilityChecker, ConflictScope, InMemoryReservationStore, ReservationStore};
use vrs_state::Reservation;

/// Exit code when the interval is taken.
pub const EXIT_UNAVAILABLE: u8 = 2;

/// Arguments for `vrs availability`.
#[derive(Args, Debug)]
pub struct AvailabilityArgs {
    /// JSON snapshot holding a `reservations` array.
    #[arg(long)]
    pub snapshot: PathBuf,
    /// Vehicle identifier (UUID).
    #[arg(long)]
    pub vehicle: String,
    /// First day, YYYY-MM-DD.
    #[arg(long)]
    pub start: String,
    /// Exclusive end day, YYYY-MM-DD.
    #[arg(long)]
    pub end: String,
}

/// Reservations exported from a running deployment.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Every reservation, any status.
    #[serde(default)]
    pub reservations: Vec<Reservation>,
}

/// Outcome of an offline check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// No blocking reservation overlaps.
    Free,
    /// These reservations overlap the interval.
    Taken(Vec<Reservation>),
}

/// Execute the availability subcommand. Exit code 0 when free,
/// [`EXIT_UNAVAILABLE`] when taken.
pub fn run_availability(args: &AvailabilityArgs) -> Result<u8> {
    let snapshot = load_snapshot(&args.snapshot)?;
    let vehicle: VehicleId = args.vehicle.parse()?;
    let period = DateRange::parse(&args.start, &args.end)?;

    match check(snapshot, vehicle, &period)? {
        Verdict::Free => {
            println!("AVAILABLE: vehicle {vehicle} is free over {period}");
            Ok(0)
        }
        Verdict::Taken(conflicts) => {
            println!("UNAVAILABLE: vehicle {vehicle} is held over {period} by:");
            for r in conflicts {
                println!("  {}  {}  {}", r.id, r.status, r.period);
            }
            Ok(EXIT_UNAVAILABLE)
        }
    }
}

/// Read and parse a snapshot file.
pub fn load_snapshot(path: &Path) -> Result<Snapshot> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse snapshot: {}", path.display()))
}

/// Check `period` on `vehicle` against the snapshot.
pub fn check(snapshot: Snapshot, vehicle: VehicleId, period: &DateRange) -> Result<Verdict> {
    let store = Arc::new(InMemoryReservationStore::new());
    let total = snapshot.reservations.len();
    for reservation in snapshot.reservations {
        store.insert(reservation)?;
    }
    tracing::debug!(reservations = total, "snapshot loaded");

    let checker = AvailabilityChecker::new(store.clone());
    if checker.is_free(vehicle, period)? {
        return Ok(Verdict::Free);
    }
    let conflicts = store
        .list_by_vehicle(vehicle)?
        .into_iter()
        .filter(|r| ConflictScope::Holding.blocks(r.status) && r.period.overlaps(period))
        .collect();
    Ok(Verdict::Taken(conflicts))
}
