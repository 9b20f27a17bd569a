#![deny(missing_docs)]

//! # vrs-state: Lifecycle Records for the Vehicle Reservation Stack
//!
//! Pure data and transition rules. Nothing in this crate performs I/O or
//! takes locks; the engine decides *whether* a transition may happen, and
//! the records here decide *how* it is applied.
//!
//! ## Reservation Lifecycle
//!
//! ```text
//! PENDING ─accept()──▶ ACCEPTED
//!    │
//!    ├────decline()──▶ DECLINED
//!    │
//!    └────cancel()───▶ CANCELLED
//! ```
//!
//! All three targets are terminal. Every transition is appended to the
//! reservation's [`TransitionRecord`] log.

pub mod account;
pub mod reservation;
pub mod review;
pub mod vehicle;

pub use account::{Account, Role};
pub use reservation::{
    Decision, Reservation, ReservationAmendment, ReservationDetails, ReservationStatus,
    TransitionError, TransitionRecord,
};
pub use review::{Review, ReviewText, MAX_RATING, MIN_RATING};
pub use vehicle::{Vehicle, VehicleStatus, VehicleUpdate};
