//! # Reservation Routes
//!
//! Request, amend, cancel, decide and read reservations. Every handler
//! resolves through the [`Caller`] and delegates to the reservation
//! manager; successful writes are mirrored to the database when one is
//! configured, and undone in memory when that mirror write fails.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use vrs_core::{ReservationId, UserId, VehicleId};
use vrs_engine::{AmendRequest, Committed, NewReservation};
use vrs_state::{Decision, Reservation, ReservationDetails, TransitionRecord};

use crate::auth::Caller;
use crate::db::persist_failed;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

const MAX_TEXT_LEN: usize = 1000;

fn check_text(field: &str, value: &Option<String>) -> Result<(), String> {
    match value {
        Some(v) if v.len() > MAX_TEXT_LEN => {
            Err(format!("{field} must not exceed {MAX_TEXT_LEN} characters"))
        }
        _ => Ok(()),
    }
}

// ── DTOs ────────────────────────────────────────────────────────────────────

/// Request to reserve a vehicle over `[start_date, end_date)`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReservationRequest {
    /// Vehicle to reserve.
    pub vehicle_id: Uuid,
    /// First rental day.
    pub start_date: NaiveDate,
    /// Return day; not part of the rental.
    pub end_date: NaiveDate,
    /// Where the client picks the vehicle up.
    pub pickup_location: Option<String>,
    /// Where the client returns the vehicle.
    pub dropoff_location: Option<String>,
    /// Free text for the agent.
    pub notes: Option<String>,
}

impl Validate for CreateReservationRequest {
    fn validate(&self) -> Result<(), String> {
        check_text("pickup_location", &self.pickup_location)?;
        check_text("dropoff_location", &self.dropoff_location)?;
        check_text("notes", &self.notes)
    }
}

/// Change to a pending reservation. Omitted fields are kept.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AmendReservationRequest {
    /// New first rental day.
    pub start_date: Option<NaiveDate>,
    /// New return day.
    pub end_date: Option<NaiveDate>,
    /// New pickup location.
    pub pickup_location: Option<String>,
    /// New drop-off location.
    pub dropoff_location: Option<String>,
    /// New notes.
    pub notes: Option<String>,
}

impl Validate for AmendReservationRequest {
    fn validate(&self) -> Result<(), String> {
        check_text("pickup_location", &self.pickup_location)?;
        check_text("dropoff_location", &self.dropoff_location)?;
        check_text("notes", &self.notes)
    }
}

/// Accept or decline a pending reservation.
#[derive(Debug, Deserialize, ToSchema)]
pub struct DecisionRequest {
    /// `ACCEPTED` or `DECLINED`.
    pub decision: String,
    /// Optional explanation recorded on a decline.
    pub rejection_reason: Option<String>,
}

impl DecisionRequest {
    fn decision(&self) -> Result<Decision, String> {
        serde_json::from_value::<Decision>(serde_json::Value::String(self.decision.clone()))
            .map_err(|_| {
                format!(
                    "invalid decision '{}'. Valid decisions: ACCEPTED, DECLINED",
                    self.decision
                )
            })
    }
}

impl Validate for DecisionRequest {
    fn validate(&self) -> Result<(), String> {
        self.decision()?;
        check_text("rejection_reason", &self.rejection_reason)
    }
}

/// One recorded status change.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TransitionEntry {
    /// Status before.
    pub from: String,
    /// Status after.
    pub to: String,
    /// Who caused the change.
    pub actor: Uuid,
    /// When.
    pub at: DateTime<Utc>,
}

impl From<&TransitionRecord> for TransitionEntry {
    fn from(record: &TransitionRecord) -> Self {
        Self {
            from: record.from.as_str().to_string(),
            to: record.to.as_str().to_string(),
            actor: *record.actor.as_uuid(),
            at: *record.at.as_datetime(),
        }
    }
}

/// A reservation as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReservationResponse {
    /// Reservation identifier.
    pub id: Uuid,
    /// Requesting client.
    pub client_id: Uuid,
    /// Reserved vehicle.
    pub vehicle_id: Uuid,
    /// Agent managing the vehicle when the request was made.
    pub agent_id: Uuid,
    /// First rental day.
    pub start_date: NaiveDate,
    /// Return day (exclusive).
    pub end_date: NaiveDate,
    /// `PENDING`, `ACCEPTED`, `DECLINED` or `CANCELLED`.
    pub status: String,
    /// Who decided.
    pub approved_by: Option<Uuid>,
    /// When the decision was made.
    pub approval_date: Option<DateTime<Utc>>,
    /// Reason given on decline.
    pub rejection_reason: Option<String>,
    /// Pickup location.
    pub pickup_location: Option<String>,
    /// Drop-off location.
    pub dropoff_location: Option<String>,
    /// Client notes.
    pub notes: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
    /// Status history, oldest first.
    pub transition_log: Vec<TransitionEntry>,
}

impl From<Reservation> for ReservationResponse {
    fn from(r: Reservation) -> Self {
        Self {
            id: *r.id.as_uuid(),
            client_id: *r.client_id.as_uuid(),
            vehicle_id: *r.vehicle_id.as_uuid(),
            agent_id: *r.agent_id.as_uuid(),
            start_date: r.period.start(),
            end_date: r.period.end(),
            status: r.status.as_str().to_string(),
            approved_by: r.approved_by.map(|u| *u.as_uuid()),
            approval_date: r.approval_date.map(|t| *t.as_datetime()),
            rejection_reason: r.rejection_reason,
            pickup_location: r.details.pickup_location,
            dropoff_location: r.details.dropoff_location,
            notes: r.details.notes,
            created_at: *r.created_at.as_datetime(),
            updated_at: *r.updated_at.as_datetime(),
            transition_log: r.transition_log.iter().map(TransitionEntry::from).collect(),
        }
    }
}

fn respond_list(reservations: Vec<Reservation>) -> Json<Vec<ReservationResponse>> {
    Json(reservations.into_iter().map(ReservationResponse::from).collect())
}

// ── Router ──────────────────────────────────────────────────────────────────

/// Build the reservations router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/reservations",
            get(list_reservations).post(create_reservation),
        )
        .route(
            "/v1/reservations/:id",
            get(get_reservation).patch(amend_reservation),
        )
        .route("/v1/reservations/:id/cancel", post(cancel_reservation))
        .route("/v1/reservations/:id/decision", post(decide_reservation))
        .route("/v1/clients/:id/reservations", get(list_client_reservations))
}

/// Mirror a committed change, with the vehicle written alongside it, in
/// one transaction. On failure the change is reverted in memory.
async fn persist(state: &AppState, committed: &Committed) -> Result<(), AppError> {
    let Some(pool) = &state.db_pool else {
        return Ok(());
    };
    let reservation = &committed.reservation;
    let vehicle = committed.vehicle.as_ref().map(|change| &change.after);
    crate::db::reservations::record(pool, reservation, vehicle)
        .await
        .map_err(|e| {
            persist_failed("reservation", reservation.id, e, || {
                state.manager.revert(committed)
            })
        })
}

// ── Handlers ────────────────────────────────────────────────────────────────

/// POST /v1/reservations: request a reservation.
#[utoipa::path(
    post,
    path = "/v1/reservations",
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reservation created as PENDING", body = ReservationResponse),
        (status = 409, description = "Interval taken or vehicle unavailable", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid date range", body = crate::error::ErrorBody),
    ),
    tag = "reservations"
)]
pub(crate) async fn create_reservation(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    body: Result<Json<CreateReservationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReservationResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let committed = state.manager.create_tracked(
        &ctx,
        NewReservation {
            vehicle_id: VehicleId::from_uuid(req.vehicle_id),
            start_date: req.start_date,
            end_date: req.end_date,
            details: ReservationDetails {
                pickup_location: req.pickup_location,
                dropoff_location: req.dropoff_location,
                notes: req.notes,
            },
        },
    )?;
    persist(&state, &committed).await?;
    Ok((StatusCode::CREATED, Json(committed.reservation.into())))
}

/// GET /v1/reservations: reservations visible to the caller.
#[utoipa::path(
    get,
    path = "/v1/reservations",
    responses(
        (status = 200, description = "Visible reservations, oldest first", body = Vec<ReservationResponse>),
    ),
    tag = "reservations"
)]
pub(crate) async fn list_reservations(
    State(state): State<AppState>,
    Caller(ctx): Caller,
) -> Result<Json<Vec<ReservationResponse>>, AppError> {
    Ok(respond_list(state.manager.list(&ctx)?))
}

/// GET /v1/reservations/:id
#[utoipa::path(
    get,
    path = "/v1/reservations/{id}",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation found", body = ReservationResponse),
        (status = 403, description = "Not visible to caller", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "reservations"
)]
pub(crate) async fn get_reservation(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationResponse>, AppError> {
    let reservation = state.manager.get(&ctx, ReservationId::from_uuid(id))?;
    Ok(Json(reservation.into()))
}

/// PATCH /v1/reservations/:id: amend a pending reservation.
#[utoipa::path(
    patch,
    path = "/v1/reservations/{id}",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    request_body = AmendReservationRequest,
    responses(
        (status = 200, description = "Reservation amended", body = ReservationResponse),
        (status = 409, description = "Not pending, or new dates taken", body = crate::error::ErrorBody),
        (status = 422, description = "Empty or invalid amendment", body = crate::error::ErrorBody),
    ),
    tag = "reservations"
)]
pub(crate) async fn amend_reservation(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<AmendReservationRequest>, JsonRejection>,
) -> Result<Json<ReservationResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let committed = state.manager.amend_tracked(
        &ctx,
        ReservationId::from_uuid(id),
        AmendRequest {
            start_date: req.start_date,
            end_date: req.end_date,
            pickup_location: req.pickup_location,
            dropoff_location: req.dropoff_location,
            notes: req.notes,
        },
    )?;
    persist(&state, &committed).await?;
    Ok(Json(committed.reservation.into()))
}

/// POST /v1/reservations/:id/cancel
#[utoipa::path(
    post,
    path = "/v1/reservations/{id}/cancel",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation cancelled", body = ReservationResponse),
        (status = 403, description = "Not the requesting client", body = crate::error::ErrorBody),
        (status = 409, description = "Not pending", body = crate::error::ErrorBody),
    ),
    tag = "reservations"
)]
pub(crate) async fn cancel_reservation(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<ReservationResponse>, AppError> {
    let committed = state
        .manager
        .cancel_tracked(&ctx, ReservationId::from_uuid(id))?;
    persist(&state, &committed).await?;
    Ok(Json(committed.reservation.into()))
}

/// POST /v1/reservations/:id/decision: accept or decline.
#[utoipa::path(
    post,
    path = "/v1/reservations/{id}/decision",
    params(("id" = Uuid, Path, description = "Reservation ID")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Decision recorded", body = ReservationResponse),
        (status = 403, description = "Caller does not manage the vehicle", body = crate::error::ErrorBody),
        (status = 409, description = "Not pending, or interval already accepted", body = crate::error::ErrorBody),
    ),
    tag = "reservations"
)]
pub(crate) async fn decide_reservation(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<DecisionRequest>, JsonRejection>,
) -> Result<Json<ReservationResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let decision = req.decision().map_err(AppError::InvalidArgument)?;
    let committed = state.manager.decide_tracked(
        &ctx,
        ReservationId::from_uuid(id),
        decision,
        req.rejection_reason,
    )?;
    persist(&state, &committed).await?;
    Ok(Json(committed.reservation.into()))
}

/// GET /v1/clients/:id/reservations
#[utoipa::path(
    get,
    path = "/v1/clients/{id}/reservations",
    params(("id" = Uuid, Path, description = "Client account ID")),
    responses(
        (status = 200, description = "The client's reservations", body = Vec<ReservationResponse>),
        (status = 403, description = "Neither the client nor an admin", body = crate::error::ErrorBody),
    ),
    tag = "reservations"
)]
pub(crate) async fn list_client_reservations(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ReservationResponse>>, AppError> {
    Ok(respond_list(
        state.manager.list_by_client(&ctx, UserId::from_uuid(id))?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_names_are_strict() {
        let req = DecisionRequest {
            decision: "ACCEPTED".into(),
            rejection_reason: None,
        };
        assert_eq!(req.decision().unwrap(), Decision::Accepted);
        for bad in ["APPROVED", "accepted", "REJECTED", ""] {
            let req = DecisionRequest {
                decision: bad.into(),
                rejection_reason: None,
            };
            assert!(req.validate().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn oversized_notes_rejected() {
        let req = AmendReservationRequest {
            notes: Some("x".repeat(MAX_TEXT_LEN + 1)),
            ..Default::default()
        };
        assert!(req.validate().unwrap_err().contains("notes"));
    }

    #[test]
    fn response_flattens_period_and_details() {
        let period = vrs_core::DateRange::parse("2026-05-01", "2026-05-04").unwrap();
        let reservation = Reservation::pending(
            UserId::new(),
            VehicleId::new(),
            UserId::new(),
            period,
            ReservationDetails {
                pickup_location: Some("Airport".into()),
                ..Default::default()
            },
            vrs_core::Timestamp::now(),
        );
        let response = ReservationResponse::from(reservation);
        assert_eq!(response.status, "PENDING");
        assert_eq!(response.start_date.to_string(), "2026-05-01");
        assert_eq!(response.end_date.to_string(), "2026-05-04");
        assert_eq!(response.pickup_location.as_deref(), Some("Airport"));
        assert!(response.transition_log.is_empty());
    }
}
