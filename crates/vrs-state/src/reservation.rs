//! # Reservation State Machine
//!
//! A reservation starts `PENDING` and ends in exactly one of `ACCEPTED`,
//! `DECLINED`, or `CANCELLED`. There is no path out of a terminal state and
//! no second name for acceptance: `APPROVED` is not a status and fails to
//! deserialize.
//!
//! The transition methods on [`Reservation`] enforce only the state rule.
//! Authorization and availability are the engine's business and are checked
//! before any of these methods is called.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use vrs_core::{DateRange, ReservationId, Timestamp, UserId, ValidationError, VehicleId};

// ── Reservation Status ───────────────────────────────────────────────

/// The lifecycle state of a reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    /// Requested by a client, awaiting a decision.
    #[serde(rename = "PENDING")]
    Pending,
    /// Confirmed by the owning agent or an administrator. Terminal.
    #[serde(rename = "ACCEPTED")]
    Accepted,
    /// Refused by the owning agent or an administrator. Terminal.
    #[serde(rename = "DECLINED")]
    Declined,
    /// Withdrawn by the client while still pending. Terminal.
    #[serde(rename = "CANCELLED")]
    Cancelled,
}

impl ReservationStatus {
    /// The canonical string name of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Declined => "DECLINED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Convert a canonical state name to a status.
    ///
    /// Returns `None` for anything outside the four names, which is how a
    /// corrupt persisted value is detected at load time.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "PENDING" => Some(Self::Pending),
            "ACCEPTED" => Some(Self::Accepted),
            "DECLINED" => Some(Self::Declined),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Parse a canonical name, reporting unknown names as a validation error.
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        Self::from_name(name).ok_or_else(|| ValidationError::UnknownName {
            kind: "reservation status",
            value: name.to_string(),
        })
    }

    /// Whether this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether a reservation in this state holds its interval against others.
    pub fn holds_interval(&self) -> bool {
        matches!(self, Self::Pending | Self::Accepted)
    }

    /// Return the set of valid target states from this state.
    pub fn valid_transitions(&self) -> &'static [ReservationStatus] {
        match self {
            Self::Pending => &[Self::Accepted, Self::Declined, Self::Cancelled],
            Self::Accepted | Self::Declined | Self::Cancelled => &[],
        }
    }

    /// Whether `to` is reachable from this state in one step.
    pub fn can_transition_to(&self, to: ReservationStatus) -> bool {
        self.valid_transitions().contains(&to)
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// The outcome an agent or administrator records on a pending reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    /// Confirm the reservation.
    #[serde(rename = "ACCEPTED")]
    Accepted,
    /// Refuse the reservation.
    #[serde(rename = "DECLINED")]
    Declined,
}

impl Decision {
    /// The status a reservation moves to under this decision.
    pub fn target_status(&self) -> ReservationStatus {
        match self {
            Self::Accepted => ReservationStatus::Accepted,
            Self::Declined => ReservationStatus::Declined,
        }
    }
}

// ── Errors ───────────────────────────────────────────────────────────

/// A transition that the state machine does not allow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// The reservation is not in a state from which `to` is reachable.
    #[error("reservation {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// The reservation identifier.
        id: ReservationId,
        /// Current state.
        from: ReservationStatus,
        /// Attempted target state.
        to: ReservationStatus,
    },
    /// An amendment was attempted on a reservation that is no longer pending.
    #[error("reservation {id} is {status} and can no longer be amended")]
    NotAmendable {
        /// The reservation identifier.
        id: ReservationId,
        /// Current state.
        status: ReservationStatus,
    },
}

// ── Transition Record ────────────────────────────────────────────────

/// A record of a single state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// State before the transition.
    pub from: ReservationStatus,
    /// State after the transition.
    pub to: ReservationStatus,
    /// Who performed it.
    pub actor: UserId,
    /// When it happened.
    pub at: Timestamp,
}

// ── Reservation ──────────────────────────────────────────────────────

/// Informational fields a client attaches to a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationDetails {
    /// Where the client collects the vehicle.
    pub pickup_location: Option<String>,
    /// Where the client returns the vehicle.
    pub dropoff_location: Option<String>,
    /// Free-text notes for the agent.
    pub notes: Option<String>,
}

/// A partial update to a pending reservation. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationAmendment {
    /// Replacement interval.
    pub period: Option<DateRange>,
    /// Replacement pickup location.
    pub pickup_location: Option<String>,
    /// Replacement dropoff location.
    pub dropoff_location: Option<String>,
    /// Replacement notes.
    pub notes: Option<String>,
}

impl ReservationAmendment {
    /// Whether applying this amendment to `current` would move its interval.
    pub fn changes_period(&self, current: &DateRange) -> bool {
        self.period.is_some_and(|p| p != *current)
    }

    /// Whether the amendment carries no fields at all.
    pub fn is_empty(&self) -> bool {
        self.period.is_none()
            && self.pickup_location.is_none()
            && self.dropoff_location.is_none()
            && self.notes.is_none()
    }
}

/// A client's request to hold a vehicle over a day range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Unique reservation identifier.
    pub id: ReservationId,
    /// The requesting client.
    pub client_id: UserId,
    /// The requested vehicle.
    pub vehicle_id: VehicleId,
    /// The vehicle's owning agent when the request was made.
    pub agent_id: UserId,
    /// Half-open day interval `[start, end)`.
    pub period: DateRange,
    /// Current lifecycle state.
    pub status: ReservationStatus,
    /// Who accepted or declined the request.
    pub approved_by: Option<UserId>,
    /// When it was accepted or declined.
    pub approval_date: Option<Timestamp>,
    /// Reason given when declined. May be absent even then.
    pub rejection_reason: Option<String>,
    /// Informational client fields.
    #[serde(flatten)]
    pub details: ReservationDetails,
    /// When the request was made.
    pub created_at: Timestamp,
    /// Last modification.
    pub updated_at: Timestamp,
    /// Every state change, oldest first.
    #[serde(default)]
    pub transition_log: Vec<TransitionRecord>,
    /// Write counter. Starts at 0 and grows by one with every amendment or
    /// transition; stores compare it to detect lost updates.
    #[serde(default)]
    pub version: u64,
}

impl Reservation {
    /// Create a new reservation in the `PENDING` state.
    pub fn pending(
        client_id: UserId,
        vehicle_id: VehicleId,
        agent_id: UserId,
        period: DateRange,
        details: ReservationDetails,
        at: Timestamp,
    ) -> Self {
        Self {
            id: ReservationId::new(),
            client_id,
            vehicle_id,
            agent_id,
            period,
            status: ReservationStatus::Pending,
            approved_by: None,
            approval_date: None,
            rejection_reason: None,
            details,
            created_at: at,
            updated_at: at,
            transition_log: Vec::new(),
            version: 0,
        }
    }

    /// Whether the reservation is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Confirm the reservation.
    ///
    /// Transitions: PENDING → ACCEPTED. Records the approver and time.
    pub fn accept(&mut self, actor: UserId, at: Timestamp) -> Result<(), TransitionError> {
        self.transition(ReservationStatus::Accepted, actor, at)?;
        self.approved_by = Some(actor);
        self.approval_date = Some(at);
        Ok(())
    }

    /// Refuse the reservation with an optional reason.
    ///
    /// Transitions: PENDING → DECLINED. The decider is recorded in
    /// `approved_by` just as for acceptance.
    pub fn decline(
        &mut self,
        actor: UserId,
        reason: Option<String>,
        at: Timestamp,
    ) -> Result<(), TransitionError> {
        self.transition(ReservationStatus::Declined, actor, at)?;
        self.approved_by = Some(actor);
        self.approval_date = Some(at);
        self.rejection_reason = reason;
        Ok(())
    }

    /// Withdraw the request.
    ///
    /// Transitions: PENDING → CANCELLED.
    pub fn cancel(&mut self, actor: UserId, at: Timestamp) -> Result<(), TransitionError> {
        self.transition(ReservationStatus::Cancelled, actor, at)
    }

    /// Apply a decision. Dispatches to [`accept`](Self::accept) or
    /// [`decline`](Self::decline); `reason` is ignored on acceptance.
    pub fn decide(
        &mut self,
        decision: Decision,
        actor: UserId,
        reason: Option<String>,
        at: Timestamp,
    ) -> Result<(), TransitionError> {
        match decision {
            Decision::Accepted => self.accept(actor, at),
            Decision::Declined => self.decline(actor, reason, at),
        }
    }

    /// Apply an amendment to a pending reservation. Status is unchanged.
    pub fn amend(
        &mut self,
        amendment: ReservationAmendment,
        at: Timestamp,
    ) -> Result<(), TransitionError> {
        if self.status != ReservationStatus::Pending {
            return Err(TransitionError::NotAmendable {
                id: self.id,
                status: self.status,
            });
        }
        if let Some(period) = amendment.period {
            self.period = period;
        }
        if let Some(pickup) = amendment.pickup_location {
            self.details.pickup_location = Some(pickup);
        }
        if let Some(dropoff) = amendment.dropoff_location {
            self.details.dropoff_location = Some(dropoff);
        }
        if let Some(notes) = amendment.notes {
            self.details.notes = Some(notes);
        }
        self.updated_at = at;
        self.version += 1;
        Ok(())
    }

    fn transition(
        &mut self,
        to: ReservationStatus,
        actor: UserId,
        at: Timestamp,
    ) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(to) {
            return Err(TransitionError::InvalidTransition {
                id: self.id,
                from: self.status,
                to,
            });
        }
        self.transition_log.push(TransitionRecord {
            from: self.status,
            to,
            actor,
            at,
        });
        self.status = to;
        self.updated_at = at;
        self.version += 1;
        Ok(())
    }
}
