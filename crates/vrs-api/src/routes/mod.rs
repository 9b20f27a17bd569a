//! # API Route Modules
//!
//! - `reservations`: request, amend, cancel, decide and read reservations.
//! - `vehicles`: fleet administration, search, availability checks,
//!   vehicle reservation lists, and release of reserved vehicles.
//! - `reviews`: client reviews of rented vehicles.
//! - `accounts`: the admin-managed account directory.

pub mod accounts;
pub mod reservations;
pub mod reviews;
pub mod vehicles;
