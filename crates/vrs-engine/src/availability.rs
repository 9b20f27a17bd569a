//! # Availability Checker
//!
//! Decides whether a vehicle is free over a day range by testing the range
//! against the vehicle's existing reservations. Pure read; never mutates.
//!
//! Which reservations count is a [`ConflictScope`]:
//!
//! - [`ConflictScope::Holding`]: `PENDING` and `ACCEPTED`. Declined and
//!   cancelled reservations never block.
//! - [`ConflictScope::AcceptedOnly`]: `ACCEPTED` alone. Used by the
//!   acceptance re-check, where pending siblings are competitors rather
//!   than holders.

use std::sync::Arc;

use chrono::NaiveDate;

use vrs_core::{DateRange, ReservationId, VehicleId};
use vrs_state::{Reservation, ReservationStatus};

use crate::error::BookingError;
use crate::store::ReservationStore;

/// Which existing reservations block an interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictScope {
    /// Pending and accepted reservations.
    Holding,
    /// Accepted reservations only.
    AcceptedOnly,
}

impl ConflictScope {
    /// Whether a reservation in `status` is in scope.
    pub fn blocks(&self, status: ReservationStatus) -> bool {
        match self {
            Self::Holding => status.holds_interval(),
            Self::AcceptedOnly => status == ReservationStatus::Accepted,
        }
    }
}

/// Tests intervals against a vehicle's reservations.
#[derive(Debug, Clone)]
pub struct AvailabilityChecker {
    reservations: Arc<dyn ReservationStore>,
}

impl AvailabilityChecker {
    /// Create a checker reading from the given store.
    pub fn new(reservations: Arc<dyn ReservationStore>) -> Self {
        Self { reservations }
    }

    /// Whether `period` is free on `vehicle_id` against pending and accepted
    /// reservations.
    pub fn is_free(&self, vehicle_id: VehicleId, period: &DateRange) -> Result<bool, BookingError> {
        Ok(self
            .find_conflict(vehicle_id, period, ConflictScope::Holding, None)?
            .is_none())
    }

    /// The first in-scope reservation overlapping `period`, ignoring
    /// `exclude`. `None` means the interval is free.
    pub fn find_conflict(
        &self,
        vehicle_id: VehicleId,
        period: &DateRange,
        scope: ConflictScope,
        exclude: Option<ReservationId>,
    ) -> Result<Option<Reservation>, BookingError> {
        Ok(self
            .reservations
            .list_by_vehicle(vehicle_id)?
            .into_iter()
            .filter(|r| Some(r.id) != exclude)
            .filter(|r| scope.blocks(r.status))
            .find(|r| r.period.overlaps(period)))
    }
}

/// Reject an interval that starts before `today`.
pub fn require_not_past(period: &DateRange, today: NaiveDate) -> Result<(), BookingError> {
    if period.starts_on_or_after(today) {
        Ok(())
    } else {
        Err(BookingError::InvalidArgument(format!(
            "start date {} is before today ({today})",
            period.start()
        )))
    }
}
