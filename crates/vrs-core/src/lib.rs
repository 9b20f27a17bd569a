#![deny(missing_docs)]

//! # vrs-core: Foundational Types for the Vehicle Reservation Stack
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It has no internal crate dependencies, only `serde`, `serde_json`,
//! `thiserror`, `chrono`, and `uuid` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** You cannot pass a [`VehicleId`]
//!    where a [`ReservationId`] is expected.
//!
//! 2. **[`DateRange`] is the only interval type.** Reservations, availability
//!    checks, and persistence all speak half-open `[start, end)` day ranges,
//!    validated at construction.
//!
//! 3. **Time is injected.** Anything that needs "now" or "today" takes a
//!    [`Clock`], so tests pin time with [`FixedClock`].
//!
//! 4. **[`VrsError`] hierarchy.** Structured errors with `thiserror`.

pub mod error;
pub mod identity;
pub mod temporal;

pub use error::{ValidationError, VrsError};
pub use identity::{OfficeId, ReservationId, ReviewId, UserId, VehicleId};
pub use temporal::{Clock, DateRange, FixedClock, SystemClock, Timestamp};
