//! # Identity Newtypes
//!
//! Identifier newtypes for the records the stack manages. Each identifier is
//! a distinct type: you cannot pass a [`VehicleId`] where a
//! [`ReservationId`] is expected.
//!
//! All identifiers wrap a UUID, are always valid by construction, and
//! serialize as the bare hyphenated UUID string.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $ty:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $ty(Uuid);

        impl $ty {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $ty {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $ty {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim())
                    .map(Self)
                    .map_err(|_| ValidationError::InvalidIdentifier {
                        kind: $kind,
                        value: s.to_string(),
                    })
            }
        }

        impl From<Uuid> for $ty {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$ty> for Uuid {
            fn from(id: $ty) -> Self {
                id.0
            }
        }
    };
}

uuid_identifier!(
    /// A registered account: client, agent, or administrator.
    UserId,
    "user"
);

uuid_identifier!(
    /// A vehicle held by an office.
    VehicleId,
    "vehicle"
);

uuid_identifier!(
    /// A reservation request and its decision history.
    ReservationId,
    "reservation"
);

uuid_identifier!(
    /// An independent rental office.
    OfficeId,
    "office"
);

uuid_identifier!(
    /// A client's review of a vehicle they rented.
    ReviewId,
    "review"
);
