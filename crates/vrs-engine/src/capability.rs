//! # Capability Context
//!
//! The resolved identity of one caller: who they are, the role they act
//! under, and the resources they are entitled to act on. Derived per
//! request, never persisted.
//!
//! Authorization elsewhere is a set of pure predicates over a
//! [`CapabilityContext`] and the record in question. Each engine operation
//! calls the relevant predicate explicitly at its start.

use std::collections::HashSet;

use vrs_core::{UserId, VehicleId};
use vrs_state::{Reservation, Role, Vehicle};

use crate::error::BookingError;

/// A resource a caller may be entitled to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceId {
    /// A user profile.
    User(UserId),
    /// A vehicle.
    Vehicle(VehicleId),
}

/// Resolved identity and authorization scope of the current caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityContext {
    /// The caller.
    pub user_id: UserId,
    /// The role the caller acts under.
    pub role: Role,
    owned: HashSet<ResourceId>,
}

impl CapabilityContext {
    /// Build a context. The caller's own profile is always owned.
    pub fn new(user_id: UserId, role: Role, owned: impl IntoIterator<Item = ResourceId>) -> Self {
        let mut owned: HashSet<ResourceId> = owned.into_iter().collect();
        owned.insert(ResourceId::User(user_id));
        Self {
            user_id,
            role,
            owned,
        }
    }

    /// A client context.
    pub fn client(user_id: UserId) -> Self {
        Self::new(user_id, Role::Client, [])
    }

    /// An agent context owning the given vehicles.
    pub fn agent(user_id: UserId, vehicles: impl IntoIterator<Item = VehicleId>) -> Self {
        Self::new(
            user_id,
            Role::Agent,
            vehicles.into_iter().map(ResourceId::Vehicle),
        )
    }

    /// An administrator context.
    pub fn admin(user_id: UserId) -> Self {
        Self::new(user_id, Role::Admin, [])
    }

    /// Whether the caller is an administrator.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether the resource is in the caller's owned set.
    pub fn owns(&self, resource: ResourceId) -> bool {
        self.owned.contains(&resource)
    }

    /// Whether the caller is an agent owning the vehicle.
    pub fn owns_vehicle(&self, vehicle_id: VehicleId) -> bool {
        self.role == Role::Agent && self.owns(ResourceId::Vehicle(vehicle_id))
    }

    /// Owned vehicle ids, in no particular order.
    pub fn owned_vehicles(&self) -> impl Iterator<Item = VehicleId> + '_ {
        self.owned.iter().filter_map(|r| match r {
            ResourceId::Vehicle(v) => Some(*v),
            ResourceId::User(_) => None,
        })
    }

    /// Fail with `Forbidden` unless the caller acts under `role`.
    pub fn require_role(&self, role: Role) -> Result<(), BookingError> {
        if self.role == role {
            Ok(())
        } else {
            Err(BookingError::Forbidden(format!(
                "role '{}' required, caller has '{}'",
                role, self.role
            )))
        }
    }

    /// Fail with `Forbidden` unless the caller is an administrator.
    pub fn require_admin(&self) -> Result<(), BookingError> {
        self.require_role(Role::Admin)
    }
}

/// Resolves a session token into a [`CapabilityContext`].
///
/// A bad token fails with [`BookingError::Unauthenticated`]; a fault while
/// looking up the caller's scope keeps its own kind. Whether the resolved
/// caller may do something is decided later, by the operation.
pub trait IdentityResolver: Send + Sync + std::fmt::Debug {
    /// Resolve a bearer token.
    fn resolve(&self, token: &str) -> Result<CapabilityContext, BookingError>;
}

// ── Authorization Predicates ─────────────────────────────────────────

/// Admin, or an agent who owns the reservation's vehicle.
pub fn can_decide(ctx: &CapabilityContext, reservation: &Reservation) -> bool {
    ctx.is_admin() || ctx.owns_vehicle(reservation.vehicle_id)
}

/// Only the requesting client may cancel or amend.
pub fn can_modify(ctx: &CapabilityContext, reservation: &Reservation) -> bool {
    ctx.user_id == reservation.client_id
}

/// The requesting client, an agent owning the vehicle, or an admin.
pub fn can_view(ctx: &CapabilityContext, reservation: &Reservation) -> bool {
    can_modify(ctx, reservation) || can_decide(ctx, reservation)
}

/// Admin, or an agent owning the vehicle.
pub fn can_manage_vehicle(ctx: &CapabilityContext, vehicle: &Vehicle) -> bool {
    ctx.is_admin() || ctx.owns_vehicle(vehicle.id)
}
