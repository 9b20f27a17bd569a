#![deny(missing_docs)]

//! # vrs-engine: Reservation Lifecycle & Availability Engine
//!
//! Decides whether a vehicle is free over a day range, drives reservations
//! through their state machine under role-scoped authorization, and keeps
//! two overlapping reservations from both being accepted for one vehicle.
//!
//! ## Components
//!
//! | Module | Role |
//! |---|---|
//! | [`capability`] | Caller identity, owned resources, authorization predicates |
//! | [`session`] | Signed session tokens and the token-based resolver |
//! | [`directory`] | Vehicle and account record stores |
//! | [`store`] | Reservation record store |
//! | [`availability`] | Interval conflict tests |
//! | [`lock`] | Per-vehicle serialization |
//! | [`lifecycle`] | The reservation manager |
//! | [`fleet`] | Vehicle and account administration |
//! | [`search`] | Fleet search filters |
//! | [`reviews`] | Client reviews of rented vehicles |
//!
//! The engine is synchronous. Callers on an async runtime invoke it
//! directly from request handlers; no lock is held across an `.await`.

pub mod availability;
pub mod capability;
pub mod directory;
pub mod error;
pub mod fleet;
pub mod lifecycle;
pub mod lock;
pub mod reviews;
pub mod search;
pub mod session;
pub mod store;

pub use availability::{AvailabilityChecker, ConflictScope};
pub use capability::{
    can_decide, can_manage_vehicle, can_modify, can_view, CapabilityContext, IdentityResolver,
    ResourceId,
};
pub use directory::{
    AccountDirectory, InMemoryAccountDirectory, InMemoryVehicleDirectory, VehicleDirectory,
};
pub use error::BookingError;
pub use fleet::{FleetManager, NewAccount, NewVehicle};
pub use lifecycle::{
    AmendRequest, Collaborators, Committed, NewReservation, PendingPolicy, ReservationManager,
    VehicleChange,
};
pub use lock::VehicleLocks;
pub use reviews::{InMemoryReviewStore, ReviewManager, ReviewStore};
pub use search::VehicleSearch;
pub use session::{SessionClaims, SessionError, SessionSigner, SignatureCheck, TokenResolver};
pub use store::{InMemoryReservationStore, ReservationStore, Store};
