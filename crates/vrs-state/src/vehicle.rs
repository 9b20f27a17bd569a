//! # Vehicle Records
//!
//! A vehicle belongs to one office and is managed by one agent. Its status
//! is split by owner: `RESERVED` is entered and left only through the
//! reservation lifecycle, while `AVAILABLE`, `MAINTENANCE`, and
//! `OUT_OF_SERVICE` are ordinary directory updates.

use serde::{Deserialize, Serialize};

use vrs_core::{OfficeId, Timestamp, UserId, ValidationError, VehicleId};

/// Operational status of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VehicleStatus {
    /// Open for new reservations.
    Available,
    /// Held by an accepted reservation.
    Reserved,
    /// Temporarily withdrawn for servicing.
    Maintenance,
    /// Withdrawn from the fleet.
    OutOfService,
}

impl VehicleStatus {
    /// The canonical string name of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "AVAILABLE",
            Self::Reserved => "RESERVED",
            Self::Maintenance => "MAINTENANCE",
            Self::OutOfService => "OUT_OF_SERVICE",
        }
    }

    /// Convert a canonical name to a status.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "AVAILABLE" => Some(Self::Available),
            "RESERVED" => Some(Self::Reserved),
            "MAINTENANCE" => Some(Self::Maintenance),
            "OUT_OF_SERVICE" => Some(Self::OutOfService),
            _ => None,
        }
    }

    /// Parse a canonical name, reporting unknown names as a validation error.
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        Self::from_name(name).ok_or_else(|| ValidationError::UnknownName {
            kind: "vehicle status",
            value: name.to_string(),
        })
    }

    /// Whether the directory may set this status directly.
    ///
    /// `RESERVED` is owned by the reservation lifecycle.
    pub fn is_directory_settable(&self) -> bool {
        !matches!(self, Self::Reserved)
    }
}

impl std::fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A vehicle held by an office.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Unique vehicle identifier.
    pub id: VehicleId,
    /// Owning office.
    pub office_id: OfficeId,
    /// Agent who manages the vehicle and decides its reservations.
    pub agent_id: UserId,
    /// Current status.
    pub status: VehicleStatus,
    /// Manufacturer.
    pub brand: String,
    /// Model name.
    pub model: String,
    /// Model year.
    pub year: u16,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Daily rate in minor currency units. Informational only.
    pub price_per_day: i64,
    /// When the vehicle was registered.
    pub created_at: Timestamp,
    /// Last modification.
    pub updated_at: Timestamp,
}

impl Vehicle {
    /// Register a new vehicle in the `AVAILABLE` state.
    pub fn new(
        office_id: OfficeId,
        agent_id: UserId,
        brand: impl Into<String>,
        model: impl Into<String>,
        year: u16,
        price_per_day: i64,
        at: Timestamp,
    ) -> Self {
        Self {
            id: VehicleId::new(),
            office_id,
            agent_id,
            status: VehicleStatus::Available,
            brand: brand.into(),
            model: model.into(),
            year,
            description: String::new(),
            price_per_day,
            created_at: at,
            updated_at: at,
        }
    }

    /// Apply a metadata update. Status changes are validated by the caller.
    pub fn apply(&mut self, update: VehicleUpdate, at: Timestamp) {
        if let Some(brand) = update.brand {
            self.brand = brand;
        }
        if let Some(model) = update.model {
            self.model = model;
        }
        if let Some(year) = update.year {
            self.year = year;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(price) = update.price_per_day {
            self.price_per_day = price;
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        self.updated_at = at;
    }
}

/// A partial update to a vehicle's directory-owned fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleUpdate {
    /// Replacement manufacturer.
    pub brand: Option<String>,
    /// Replacement model.
    pub model: Option<String>,
    /// Replacement model year.
    pub year: Option<u16>,
    /// Replacement description.
    pub description: Option<String>,
    /// Replacement daily rate.
    pub price_per_day: Option<i64>,
    /// Replacement status. Must not be `RESERVED`.
    pub status: Option<VehicleStatus>,
}
