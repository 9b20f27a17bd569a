//! # Reservation Lifecycle Manager
//!
//! The sole writer of reservations and of the `AVAILABLE` ↔ `RESERVED`
//! vehicle transition. Every operation takes the caller's
//! [`CapabilityContext`] explicitly and checks it before touching state.
//!
//! ## Ordering of Checks
//!
//! Operations on an existing reservation load it first (`NotFound`), then
//! authorize (`Forbidden`), then test its status (`FailedPrecondition`).
//! Create validates input (`InvalidArgument`) before looking anything up.
//!
//! ## Exclusivity
//!
//! Every write runs under the vehicle's lock from [`VehicleLocks`] against
//! a record re-read inside it, so the availability read and the write that
//! depends on it cannot interleave with another operation on the same
//! vehicle. Acceptance re-tests the interval against accepted siblings
//! under that lock: the first accept wins, the second gets `Conflict` and
//! stays `PENDING`. Writes are also compare-and-set on the record's
//! `version`, so a writer holding a stale copy fails instead of restoring
//! old fields.
//!
//! ## Rollback
//!
//! Acceptance writes the reservation and then the vehicle status. If the
//! vehicle write fails the reservation is restored to its pending record,
//! so the two never disagree. The `*_tracked` variants return a
//! [`Committed`] record which [`ReservationManager::revert`] can undo when
//! a later write-through fails.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use vrs_core::{Clock, DateRange, ReservationId, UserId, ValidationError, VehicleId};
use vrs_state::{
    Decision, Reservation, ReservationAmendment, ReservationDetails, ReservationStatus, Role,
    Vehicle, VehicleStatus,
};

use crate::availability::{require_not_past, AvailabilityChecker, ConflictScope};
use crate::capability::{
    can_decide, can_manage_vehicle, can_modify, can_view, CapabilityContext, IdentityResolver,
};
use crate::directory::{AccountDirectory, VehicleDirectory};
use crate::error::BookingError;
use crate::lock::VehicleLocks;
use crate::search::VehicleSearch;
use crate::store::ReservationStore;

// ── Pending Policy ───────────────────────────────────────────────────

/// Whether a pending reservation holds its interval against new requests.
///
/// `checkAvailability` always counts pending reservations, and acceptance
/// always tests against accepted ones only. The policy governs create and
/// amend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingPolicy {
    /// New requests may not overlap pending or accepted reservations.
    #[default]
    Block,
    /// New requests may overlap pending reservations; acceptance decides.
    Provisional,
}

impl PendingPolicy {
    /// The canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Provisional => "provisional",
        }
    }

    /// Which reservations block a create or amend under this policy.
    pub fn request_scope(&self) -> ConflictScope {
        match self {
            Self::Block => ConflictScope::Holding,
            Self::Provisional => ConflictScope::AcceptedOnly,
        }
    }
}

impl std::fmt::Display for PendingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PendingPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(Self::Block),
            "provisional" => Ok(Self::Provisional),
            _ => Err(ValidationError::UnknownName {
                kind: "pending policy",
                value: s.to_string(),
            }),
        }
    }
}

// ── Requests ─────────────────────────────────────────────────────────

/// A client's request for a new reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewReservation {
    /// The vehicle to reserve.
    pub vehicle_id: VehicleId,
    /// First day.
    pub start_date: NaiveDate,
    /// First day no longer held.
    pub end_date: NaiveDate,
    /// Informational fields.
    #[serde(flatten)]
    pub details: ReservationDetails,
}

/// A client's change to a pending reservation. Omitted fields are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmendRequest {
    /// Replacement first day.
    pub start_date: Option<NaiveDate>,
    /// Replacement end day.
    pub end_date: Option<NaiveDate>,
    /// Replacement pickup location.
    pub pickup_location: Option<String>,
    /// Replacement dropoff location.
    pub dropoff_location: Option<String>,
    /// Replacement notes.
    pub notes: Option<String>,
}

impl AmendRequest {
    /// Resolve against the current interval into a validated amendment.
    pub fn into_amendment(self, current: &DateRange) -> Result<ReservationAmendment, BookingError> {
        let period = if self.start_date.is_some() || self.end_date.is_some() {
            Some(DateRange::new(
                self.start_date.unwrap_or(current.start()),
                self.end_date.unwrap_or(current.end()),
            )?)
        } else {
            None
        };
        let amendment = ReservationAmendment {
            period,
            pickup_location: self.pickup_location,
            dropoff_location: self.dropoff_location,
            notes: self.notes,
        };
        if amendment.is_empty() {
            return Err(BookingError::InvalidArgument(
                "amendment changes nothing".into(),
            ));
        }
        Ok(amendment)
    }
}

// ── Committed Changes ────────────────────────────────────────────────

/// A committed reservation write and the record it replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    /// Stored record before the write. `None` for a create.
    pub before: Option<Reservation>,
    /// Stored record after the write.
    pub reservation: Reservation,
    /// Vehicle status written in the same critical section.
    pub vehicle: Option<VehicleChange>,
}

/// A vehicle record before and after a status write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleChange {
    /// Record before the write.
    pub before: Vehicle,
    /// Record after the write.
    pub after: Vehicle,
}

// ── Composition ──────────────────────────────────────────────────────

/// The collaborators a [`ReservationManager`] is built from.
#[derive(Debug, Clone)]
pub struct Collaborators {
    /// Vehicle records.
    pub vehicles: Arc<dyn VehicleDirectory>,
    /// Account records.
    pub accounts: Arc<dyn AccountDirectory>,
    /// Reservation records.
    pub reservations: Arc<dyn ReservationStore>,
    /// Session resolution.
    pub identity: Arc<dyn IdentityResolver>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

/// Owns the reservation state machine and its authorization.
#[derive(Debug, Clone)]
pub struct ReservationManager {
    vehicles: Arc<dyn VehicleDirectory>,
    accounts: Arc<dyn AccountDirectory>,
    reservations: Arc<dyn ReservationStore>,
    identity: Arc<dyn IdentityResolver>,
    clock: Arc<dyn Clock>,
    availability: AvailabilityChecker,
    locks: Arc<VehicleLocks>,
    policy: PendingPolicy,
}

impl ReservationManager {
    /// Build the manager with a fresh lock table.
    pub fn new(collaborators: Collaborators, policy: PendingPolicy) -> Self {
        Self::with_locks(collaborators, policy, Arc::new(VehicleLocks::new()))
    }

    /// Build the manager sharing an existing lock table.
    pub fn with_locks(
        collaborators: Collaborators,
        policy: PendingPolicy,
        locks: Arc<VehicleLocks>,
    ) -> Self {
        let Collaborators {
            vehicles,
            accounts,
            reservations,
            identity,
            clock,
        } = collaborators;
        Self {
            availability: AvailabilityChecker::new(Arc::clone(&reservations)),
            vehicles,
            accounts,
            reservations,
            identity,
            clock,
            locks,
            policy,
        }
    }

    /// The configured pending policy.
    pub fn policy(&self) -> PendingPolicy {
        self.policy
    }

    /// The lock table, for components that must serialize with this one.
    pub fn locks(&self) -> Arc<VehicleLocks> {
        Arc::clone(&self.locks)
    }

    /// Resolve a bearer token into a capability context.
    pub fn resolve(&self, token: &str) -> Result<CapabilityContext, BookingError> {
        self.identity.resolve(token)
    }

    // ── Inbound Operations ───────────────────────────────────────────

    /// Request a reservation. Clients only.
    ///
    /// The new reservation is `PENDING` and records the vehicle's current
    /// agent. The vehicle stays `AVAILABLE`.
    pub fn create(
        &self,
        ctx: &CapabilityContext,
        request: NewReservation,
    ) -> Result<Reservation, BookingError> {
        self.create_tracked(ctx, request).map(|c| c.reservation)
    }

    /// [`create`](Self::create), returning the committed change.
    pub fn create_tracked(
        &self,
        ctx: &CapabilityContext,
        request: NewReservation,
    ) -> Result<Committed, BookingError> {
        if let Err(err) = ctx.require_role(Role::Client) {
            deny(ctx, "create", &err);
            return Err(err);
        }
        let period = DateRange::new(request.start_date, request.end_date)?;
        require_not_past(&period, self.clock.today())?;
        if self.accounts.get_account(ctx.user_id)?.is_none() {
            return Err(BookingError::not_found("account", ctx.user_id));
        }

        self.locks.with_lock(request.vehicle_id, || {
            let vehicle = self.vehicle(request.vehicle_id)?;
            if vehicle.status != VehicleStatus::Available {
                tracing::warn!(
                    vehicle_id = %vehicle.id,
                    status = %vehicle.status,
                    "reservation refused: vehicle not available"
                );
                return Err(BookingError::Conflict(format!(
                    "vehicle {} is {}",
                    vehicle.id, vehicle.status
                )));
            }
            self.ensure_free(&vehicle, &period, self.policy.request_scope(), None)?;

            let reservation = Reservation::pending(
                ctx.user_id,
                vehicle.id,
                vehicle.agent_id,
                period,
                request.details,
                self.clock.now(),
            );
            self.reservations.insert(reservation.clone())?;
            tracing::info!(
                reservation_id = %reservation.id,
                vehicle_id = %vehicle.id,
                to = %reservation.status,
                actor = %ctx.user_id,
                period = %reservation.period,
                "reservation created"
            );
            Ok(Committed {
                before: None,
                reservation,
                vehicle: None,
            })
        })
    }

    /// Withdraw a pending reservation. The requesting client only.
    pub fn cancel(
        &self,
        ctx: &CapabilityContext,
        id: ReservationId,
    ) -> Result<Reservation, BookingError> {
        self.cancel_tracked(ctx, id).map(|c| c.reservation)
    }

    /// [`cancel`](Self::cancel), returning the committed change.
    pub fn cancel_tracked(
        &self,
        ctx: &CapabilityContext,
        id: ReservationId,
    ) -> Result<Committed, BookingError> {
        let current = self.reservation(id)?;
        if !can_modify(ctx, &current) {
            let err = BookingError::Forbidden(format!(
                "reservation {id} belongs to another client"
            ));
            deny(ctx, "cancel", &err);
            return Err(err);
        }
        self.locks.with_lock(current.vehicle_id, || {
            let before = self.reservation(id)?;
            let mut cancelled = before.clone();
            cancelled.cancel(ctx.user_id, self.clock.now())?;
            self.reservations.update(cancelled.clone(), before.version)?;
            log_transition(&cancelled, before.status, ctx.user_id);
            Ok(Committed {
                before: Some(before),
                reservation: cancelled,
                vehicle: None,
            })
        })
    }

    /// Change a pending reservation's dates or details. The requesting
    /// client only.
    ///
    /// Runs under the vehicle's lock against a fresh read, so a concurrent
    /// amendment is never overwritten. A date change is validated exactly
    /// like a new request; the reservation does not conflict with itself.
    pub fn amend(
        &self,
        ctx: &CapabilityContext,
        id: ReservationId,
        request: AmendRequest,
    ) -> Result<Reservation, BookingError> {
        self.amend_tracked(ctx, id, request).map(|c| c.reservation)
    }

    /// [`amend`](Self::amend), returning the committed change.
    pub fn amend_tracked(
        &self,
        ctx: &CapabilityContext,
        id: ReservationId,
        request: AmendRequest,
    ) -> Result<Committed, BookingError> {
        let current = self.reservation(id)?;
        if !can_modify(ctx, &current) {
            let err = BookingError::Forbidden(format!(
                "reservation {id} belongs to another client"
            ));
            deny(ctx, "amend", &err);
            return Err(err);
        }
        ensure_pending(&current)?;

        self.locks.with_lock(current.vehicle_id, || {
            let before = self.reservation(id)?;
            ensure_pending(&before)?;
            let amendment = request.into_amendment(&before.period)?;
            if amendment.changes_period(&before.period) {
                let period = amendment.period.unwrap_or(before.period);
                require_not_past(&period, self.clock.today())?;
                let vehicle = self.vehicle(before.vehicle_id)?;
                if vehicle.status != VehicleStatus::Available {
                    return Err(BookingError::Conflict(format!(
                        "vehicle {} is {}",
                        vehicle.id, vehicle.status
                    )));
                }
                self.ensure_free(&vehicle, &period, self.policy.request_scope(), Some(id))?;
            }

            let mut amended = before.clone();
            amended.amend(amendment, self.clock.now())?;
            self.reservations.update(amended.clone(), before.version)?;
            tracing::info!(
                reservation_id = %amended.id,
                vehicle_id = %amended.vehicle_id,
                period = %amended.period,
                actor = %ctx.user_id,
                version = amended.version,
                "reservation amended"
            );
            Ok(Committed {
                before: Some(before),
                reservation: amended,
                vehicle: None,
            })
        })
    }

    /// Accept or decline a pending reservation. Admins, or the agent owning
    /// the vehicle.
    ///
    /// Declining records the decider and optional reason and never touches
    /// the vehicle. Accepting re-checks the interval against accepted
    /// reservations and marks the vehicle `RESERVED`.
    pub fn decide(
        &self,
        ctx: &CapabilityContext,
        id: ReservationId,
        decision: Decision,
        rejection_reason: Option<String>,
    ) -> Result<Reservation, BookingError> {
        self.decide_tracked(ctx, id, decision, rejection_reason)
            .map(|c| c.reservation)
    }

    /// [`decide`](Self::decide), returning the committed change. On
    /// acceptance the vehicle record written under the lock is included.
    pub fn decide_tracked(
        &self,
        ctx: &CapabilityContext,
        id: ReservationId,
        decision: Decision,
        rejection_reason: Option<String>,
    ) -> Result<Committed, BookingError> {
        let current = self.reservation(id)?;
        if !can_decide(ctx, &current) {
            let err = BookingError::Forbidden(format!(
                "caller does not manage vehicle {}",
                current.vehicle_id
            ));
            deny(ctx, "decide", &err);
            return Err(err);
        }
        ensure_pending(&current)?;

        self.locks.with_lock(current.vehicle_id, || match decision {
            Decision::Declined => {
                let before = self.reservation(id)?;
                let mut declined = before.clone();
                declined.decline(ctx.user_id, rejection_reason, self.clock.now())?;
                self.reservations.update(declined.clone(), before.version)?;
                log_transition(&declined, before.status, ctx.user_id);
                Ok(Committed {
                    before: Some(before),
                    reservation: declined,
                    vehicle: None,
                })
            }
            Decision::Accepted => self.accept_locked(ctx, id),
        })
    }

    /// Return a `RESERVED` vehicle to `AVAILABLE`. Admins, or the agent
    /// owning the vehicle.
    pub fn release_vehicle(
        &self,
        ctx: &CapabilityContext,
        vehicle_id: VehicleId,
    ) -> Result<Vehicle, BookingError> {
        self.release_vehicle_tracked(ctx, vehicle_id)
            .map(|change| change.after)
    }

    /// [`release_vehicle`](Self::release_vehicle), returning the change.
    pub fn release_vehicle_tracked(
        &self,
        ctx: &CapabilityContext,
        vehicle_id: VehicleId,
    ) -> Result<VehicleChange, BookingError> {
        let vehicle = self.vehicle(vehicle_id)?;
        if !can_manage_vehicle(ctx, &vehicle) {
            let err = BookingError::Forbidden(format!(
                "caller does not manage vehicle {vehicle_id}"
            ));
            deny(ctx, "release", &err);
            return Err(err);
        }

        self.locks.with_lock(vehicle_id, || {
            let before = self.vehicle(vehicle_id)?;
            if before.status != VehicleStatus::Reserved {
                return Err(BookingError::FailedPrecondition(format!(
                    "vehicle {vehicle_id} is {}, not RESERVED",
                    before.status
                )));
            }
            let after = self
                .vehicles
                .set_vehicle_status(vehicle_id, VehicleStatus::Available)?;
            tracing::info!(
                vehicle_id = %vehicle_id,
                from = %before.status,
                to = %after.status,
                actor = %ctx.user_id,
                "vehicle released"
            );
            Ok(VehicleChange { before, after })
        })
    }

    // ── Compensation ─────────────────────────────────────────────────

    /// Undo a committed change whose write-through failed.
    ///
    /// Runs under the vehicle's lock. The reservation is restored only if
    /// it is still exactly as committed: a later write supersedes the
    /// failed one and is left alone ([`BookingError::FailedPrecondition`]).
    /// A restored record keeps the old content under a fresh version.
    pub fn revert(&self, committed: &Committed) -> Result<(), BookingError> {
        let after = &committed.reservation;
        self.locks.with_lock(after.vehicle_id, || {
            if let Some(change) = &committed.vehicle {
                self.restore_vehicle(change)?;
            }
            match &committed.before {
                None => self.reservations.remove(after.id, after.version)?,
                Some(before) => {
                    let mut restored = before.clone();
                    restored.version = after.version + 1;
                    self.reservations.update(restored, after.version)?;
                }
            }
            tracing::warn!(
                reservation_id = %after.id,
                vehicle_id = %after.vehicle_id,
                status = %after.status,
                "reservation change reverted"
            );
            Ok(())
        })
    }

    /// Undo a vehicle release whose write-through failed. Same rules as
    /// [`revert`](Self::revert).
    pub fn revert_vehicle(&self, change: &VehicleChange) -> Result<(), BookingError> {
        self.locks
            .with_lock(change.after.id, || self.restore_vehicle(change))
    }

    /// Whether `[start_date, end_date)` is free on the vehicle, counting
    /// pending and accepted reservations.
    pub fn check_availability(
        &self,
        ctx: &CapabilityContext,
        vehicle_id: VehicleId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<bool, BookingError> {
        let period = DateRange::new(start_date, end_date)?;
        let vehicle = self.vehicle(vehicle_id)?;
        let free = self.availability.is_free(vehicle.id, &period)?;
        tracing::debug!(
            vehicle_id = %vehicle_id,
            period = %period,
            free,
            caller = %ctx.user_id,
            "availability checked"
        );
        Ok(free)
    }

    /// Available vehicles matching `search`. Any authenticated caller.
    ///
    /// With a date window, vehicles holding a pending or accepted
    /// reservation over any of its days are left out.
    pub fn search_vehicles(
        &self,
        ctx: &CapabilityContext,
        search: &VehicleSearch,
    ) -> Result<Vec<Vehicle>, BookingError> {
        let window = search.window()?;
        let mut found = Vec::new();
        for vehicle in self.vehicles.list_vehicles()? {
            if !search.matches(&vehicle) {
                continue;
            }
            if let Some(period) = &window {
                if !self.availability.is_free(vehicle.id, period)? {
                    continue;
                }
            }
            found.push(vehicle);
        }
        tracing::debug!(
            caller = %ctx.user_id,
            matches = found.len(),
            "vehicle search"
        );
        Ok(found)
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Fetch one reservation. The client, the owning agent, or an admin.
    pub fn get(
        &self,
        ctx: &CapabilityContext,
        id: ReservationId,
    ) -> Result<Reservation, BookingError> {
        let reservation = self.reservation(id)?;
        if !can_view(ctx, &reservation) {
            return Err(BookingError::Forbidden(format!(
                "caller may not view reservation {id}"
            )));
        }
        Ok(reservation)
    }

    /// Reservations visible to the caller: all for admins, those on owned
    /// vehicles for agents, their own for clients.
    pub fn list(&self, ctx: &CapabilityContext) -> Result<Vec<Reservation>, BookingError> {
        match ctx.role {
            Role::Admin => self.reservations.list_all(),
            Role::Client => self.reservations.list_by_client(ctx.user_id),
            Role::Agent => {
                let mut all = Vec::new();
                for vehicle_id in ctx.owned_vehicles() {
                    all.extend(self.reservations.list_by_vehicle(vehicle_id)?);
                }
                all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
                Ok(all)
            }
        }
    }

    /// A client's reservations. The client themself or an admin.
    pub fn list_by_client(
        &self,
        ctx: &CapabilityContext,
        client_id: UserId,
    ) -> Result<Vec<Reservation>, BookingError> {
        if ctx.user_id != client_id && !ctx.is_admin() {
            return Err(BookingError::Forbidden(format!(
                "caller may not list reservations of {client_id}"
            )));
        }
        self.reservations.list_by_client(client_id)
    }

    /// A vehicle's reservations. The owning agent or an admin.
    pub fn list_by_vehicle(
        &self,
        ctx: &CapabilityContext,
        vehicle_id: VehicleId,
    ) -> Result<Vec<Reservation>, BookingError> {
        let vehicle = self.vehicle(vehicle_id)?;
        if !can_manage_vehicle(ctx, &vehicle) {
            return Err(BookingError::Forbidden(format!(
                "caller does not manage vehicle {vehicle_id}"
            )));
        }
        self.reservations.list_by_vehicle(vehicle_id)
    }

    // ── Internals ────────────────────────────────────────────────────

    fn reservation(&self, id: ReservationId) -> Result<Reservation, BookingError> {
        self.reservations
            .get(id)?
            .ok_or_else(|| BookingError::not_found("reservation", id))
    }

    fn vehicle(&self, id: VehicleId) -> Result<Vehicle, BookingError> {
        self.vehicles
            .get_vehicle(id)?
            .ok_or_else(|| BookingError::not_found("vehicle", id))
    }

    fn ensure_free(
        &self,
        vehicle: &Vehicle,
        period: &DateRange,
        scope: ConflictScope,
        exclude: Option<ReservationId>,
    ) -> Result<(), BookingError> {
        match self
            .availability
            .find_conflict(vehicle.id, period, scope, exclude)?
        {
            None => Ok(()),
            Some(existing) => {
                tracing::warn!(
                    vehicle_id = %vehicle.id,
                    requested = %period,
                    conflicting_reservation = %existing.id,
                    conflicting_status = %existing.status,
                    "availability conflict"
                );
                Err(BookingError::Conflict(format!(
                    "vehicle {} is not free over {period}: overlaps reservation {} ({})",
                    vehicle.id, existing.id, existing.status
                )))
            }
        }
    }

    /// Caller holds the vehicle lock.
    fn restore_vehicle(&self, change: &VehicleChange) -> Result<(), BookingError> {
        let current = self.vehicle(change.after.id)?;
        if current != change.after {
            return Err(BookingError::FailedPrecondition(format!(
                "vehicle {} changed since the write being reverted",
                current.id
            )));
        }
        self.vehicles.put_vehicle(change.before.clone())?;
        tracing::warn!(
            vehicle_id = %current.id,
            from = %change.after.status,
            to = %change.before.status,
            "vehicle change reverted"
        );
        Ok(())
    }

    /// Acceptance body. Caller holds the vehicle lock.
    fn accept_locked(
        &self,
        ctx: &CapabilityContext,
        id: ReservationId,
    ) -> Result<Committed, BookingError> {
        let before = self.reservation(id)?;
        ensure_pending(&before)?;
        let vehicle = self.vehicle(before.vehicle_id)?;
        if !matches!(
            vehicle.status,
            VehicleStatus::Available | VehicleStatus::Reserved
        ) {
            tracing::warn!(
                reservation_id = %id,
                vehicle_id = %vehicle.id,
                status = %vehicle.status,
                "acceptance refused: vehicle withdrawn"
            );
            return Err(BookingError::Conflict(format!(
                "vehicle {} is {}",
                vehicle.id, vehicle.status
            )));
        }
        self.ensure_free(
            &vehicle,
            &before.period,
            ConflictScope::AcceptedOnly,
            Some(id),
        )?;

        let mut accepted = before.clone();
        accepted.accept(ctx.user_id, self.clock.now())?;
        self.reservations.update(accepted.clone(), before.version)?;

        let reserved = match self
            .vehicles
            .set_vehicle_status(vehicle.id, VehicleStatus::Reserved)
        {
            Ok(reserved) => reserved,
            Err(err) => {
                tracing::error!(
                    reservation_id = %id,
                    vehicle_id = %vehicle.id,
                    error = %err,
                    "failed to reserve vehicle, rolling back acceptance"
                );
                let mut restored = before;
                restored.version = accepted.version + 1;
                if let Err(rollback) = self.reservations.update(restored, accepted.version) {
                    tracing::error!(
                        reservation_id = %id,
                        error = %rollback,
                        "rollback of acceptance failed"
                    );
                }
                return Err(err);
            }
        };

        log_transition(&accepted, before.status, ctx.user_id);
        Ok(Committed {
            before: Some(before),
            reservation: accepted,
            vehicle: Some(VehicleChange {
                before: vehicle,
                after: reserved,
            }),
        })
    }
}

fn ensure_pending(reservation: &Reservation) -> Result<(), BookingError> {
    if reservation.status == ReservationStatus::Pending {
        Ok(())
    } else {
        Err(BookingError::FailedPrecondition(format!(
            "reservation {} is {}, not PENDING",
            reservation.id, reservation.status
        )))
    }
}

fn log_transition(reservation: &Reservation, from: ReservationStatus, actor: UserId) {
    tracing::info!(
        reservation_id = %reservation.id,
        vehicle_id = %reservation.vehicle_id,
        from = %from,
        to = %reservation.status,
        actor = %actor,
        "reservation transition"
    );
}

fn deny(ctx: &CapabilityContext, operation: &'static str, err: &BookingError) {
    tracing::warn!(
        caller = %ctx.user_id,
        role = %ctx.role,
        operation,
        reason = %err,
        "authorization rejected"
    );
}
