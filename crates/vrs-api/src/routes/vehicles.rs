//! # Vehicle Routes
//!
//! Fleet administration (register, update, list), search for available
//! vehicles, plus the vehicle-scoped reservation operations: availability
//! checks, the vehicle's reservation list, and release of a reserved
//! vehicle.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use vrs_core::{OfficeId, UserId, VehicleId};
use vrs_engine::{BookingError, NewVehicle, VehicleSearch};
use vrs_state::{Vehicle, VehicleStatus, VehicleUpdate};

use crate::auth::Caller;
use crate::db::persist_failed;
use crate::error::AppError;
use crate::extractors::{extract_query, extract_validated_json, Validate};
use crate::routes::reservations::ReservationResponse;
use crate::state::AppState;

// ── DTOs ────────────────────────────────────────────────────────────────────

/// Request to register a vehicle.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateVehicleRequest {
    /// Office that holds the vehicle.
    pub office_id: Uuid,
    /// Managing agent. Agents may omit it; admins must name one.
    pub agent_id: Option<Uuid>,
    /// Manufacturer.
    pub brand: String,
    /// Model name.
    pub model: String,
    /// Model year.
    pub year: u16,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Daily rate in minor currency units.
    pub price_per_day: i64,
}

impl Validate for CreateVehicleRequest {
    fn validate(&self) -> Result<(), String> {
        if self.brand.len() > 255 || self.model.len() > 255 {
            return Err("brand and model must not exceed 255 characters".to_string());
        }
        if !(1900..=2100).contains(&self.year) {
            return Err(format!("year {} is out of range", self.year));
        }
        Ok(())
    }
}

/// Partial update of a vehicle. Omitted fields are kept.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateVehicleRequest {
    /// New manufacturer.
    pub brand: Option<String>,
    /// New model name.
    pub model: Option<String>,
    /// New model year.
    pub year: Option<u16>,
    /// New description.
    pub description: Option<String>,
    /// New daily rate.
    pub price_per_day: Option<i64>,
    /// `AVAILABLE`, `MAINTENANCE` or `OUT_OF_SERVICE`.
    pub status: Option<String>,
}

impl Validate for UpdateVehicleRequest {
    fn validate(&self) -> Result<(), String> {
        if let Some(status) = &self.status {
            VehicleStatus::parse(status).map_err(|e| e.to_string())?;
        }
        if self.year.is_some_and(|y| !(1900..=2100).contains(&y)) {
            return Err("year is out of range".to_string());
        }
        Ok(())
    }
}

/// A vehicle as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VehicleResponse {
    /// Vehicle identifier.
    pub id: Uuid,
    /// Holding office.
    pub office_id: Uuid,
    /// Managing agent.
    pub agent_id: Uuid,
    /// `AVAILABLE`, `RESERVED`, `MAINTENANCE` or `OUT_OF_SERVICE`.
    pub status: String,
    /// Manufacturer.
    pub brand: String,
    /// Model name.
    pub model: String,
    /// Model year.
    pub year: u16,
    /// Description.
    pub description: String,
    /// Daily rate in minor currency units.
    pub price_per_day: i64,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}

impl From<Vehicle> for VehicleResponse {
    fn from(v: Vehicle) -> Self {
        Self {
            id: *v.id.as_uuid(),
            office_id: *v.office_id.as_uuid(),
            agent_id: *v.agent_id.as_uuid(),
            status: v.status.as_str().to_string(),
            brand: v.brand,
            model: v.model,
            year: v.year,
            description: v.description,
            price_per_day: v.price_per_day,
            created_at: *v.created_at.as_datetime(),
            updated_at: *v.updated_at.as_datetime(),
        }
    }
}

/// Query for `GET /v1/vehicles`.
#[derive(Debug, Default, Deserialize)]
pub struct VehicleFilter {
    /// Restrict to one office.
    pub office_id: Option<Uuid>,
}

/// Query for `GET /v1/vehicles/search`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    /// First day of the wanted window. Requires `end_date`.
    pub start_date: Option<NaiveDate>,
    /// Exclusive end of the wanted window. Requires `start_date`.
    pub end_date: Option<NaiveDate>,
    /// Brand substring, any case.
    pub brand: Option<String>,
    /// Model substring, any case.
    pub model: Option<String>,
    /// Lowest daily rate, minor units.
    pub min_price: Option<i64>,
    /// Highest daily rate, minor units.
    pub max_price: Option<i64>,
}

impl Validate for SearchQuery {
    fn validate(&self) -> Result<(), String> {
        if self.min_price.is_some_and(|p| p < 0) || self.max_price.is_some_and(|p| p < 0) {
            return Err("prices must not be negative".to_string());
        }
        Ok(())
    }
}

impl From<SearchQuery> for VehicleSearch {
    fn from(q: SearchQuery) -> Self {
        Self {
            start_date: q.start_date,
            end_date: q.end_date,
            brand: q.brand,
            model: q.model,
            min_price: q.min_price,
            max_price: q.max_price,
        }
    }
}

/// Query for the availability check.
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    /// First day of the interval.
    pub start_date: NaiveDate,
    /// Day after the last day of the interval.
    pub end_date: NaiveDate,
}

/// Result of an availability check.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AvailabilityResponse {
    /// The vehicle checked.
    pub vehicle_id: Uuid,
    /// First day of the interval.
    pub start_date: NaiveDate,
    /// Exclusive end of the interval.
    pub end_date: NaiveDate,
    /// Whether no pending or accepted reservation overlaps the interval.
    pub available: bool,
}

// ── Router ──────────────────────────────────────────────────────────────────

/// Build the vehicles router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/vehicles", get(list_vehicles).post(create_vehicle))
        .route("/v1/vehicles/search", get(search_vehicles))
        .route("/v1/vehicles/:id", get(get_vehicle).patch(update_vehicle))
        .route("/v1/vehicles/:id/availability", get(check_availability))
        .route("/v1/vehicles/:id/reservations", get(list_vehicle_reservations))
        .route("/v1/vehicles/:id/release", post(release_vehicle))
}

/// Mirror a vehicle write; on failure run `undo` and fail the request.
async fn persist(
    state: &AppState,
    vehicle: &Vehicle,
    undo: impl FnOnce() -> Result<(), BookingError>,
) -> Result<(), AppError> {
    if let Some(pool) = &state.db_pool {
        crate::db::vehicles::upsert(pool, vehicle)
            .await
            .map_err(|e| persist_failed("vehicle", vehicle.id, e, undo))?;
    }
    Ok(())
}

// ── Handlers ────────────────────────────────────────────────────────────────

/// POST /v1/vehicles: register a vehicle.
#[utoipa::path(
    post,
    path = "/v1/vehicles",
    request_body = CreateVehicleRequest,
    responses(
        (status = 201, description = "Vehicle registered as AVAILABLE", body = VehicleResponse),
        (status = 403, description = "Caller may not register for this office", body = crate::error::ErrorBody),
    ),
    tag = "vehicles"
)]
pub(crate) async fn create_vehicle(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    body: Result<Json<CreateVehicleRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<VehicleResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let vehicle = state.fleet.register_vehicle(
        &ctx,
        NewVehicle {
            office_id: OfficeId::from_uuid(req.office_id),
            agent_id: req.agent_id.map(UserId::from_uuid),
            brand: req.brand,
            model: req.model,
            year: req.year,
            description: req.description,
            price_per_day: req.price_per_day,
        },
    )?;
    persist(&state, &vehicle, || {
        state.fleet.revert_vehicle_registration(&vehicle)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(vehicle.into())))
}

/// GET /v1/vehicles
#[utoipa::path(
    get,
    path = "/v1/vehicles",
    params(("office_id" = Option<Uuid>, Query, description = "Restrict to one office")),
    responses(
        (status = 200, description = "Vehicles", body = Vec<VehicleResponse>),
    ),
    tag = "vehicles"
)]
pub(crate) async fn list_vehicles(
    State(state): State<AppState>,
    Caller(_ctx): Caller,
    query: Result<Query<VehicleFilter>, QueryRejection>,
) -> Result<Json<Vec<VehicleResponse>>, AppError> {
    let filter = extract_query(query)?;
    let vehicles = state
        .fleet
        .list_vehicles(filter.office_id.map(OfficeId::from_uuid))?;
    Ok(Json(vehicles.into_iter().map(VehicleResponse::from).collect()))
}

/// GET /v1/vehicles/search: available vehicles matching the filters.
#[utoipa::path(
    get,
    path = "/v1/vehicles/search",
    params(
        ("start_date" = Option<String>, Query, description = "First day of the window, YYYY-MM-DD"),
        ("end_date" = Option<String>, Query, description = "Exclusive end of the window, YYYY-MM-DD"),
        ("brand" = Option<String>, Query, description = "Brand substring, any case"),
        ("model" = Option<String>, Query, description = "Model substring, any case"),
        ("min_price" = Option<i64>, Query, description = "Lowest daily rate, minor units"),
        ("max_price" = Option<i64>, Query, description = "Highest daily rate, minor units"),
    ),
    responses(
        (status = 200, description = "Available vehicles free over the window", body = Vec<VehicleResponse>),
        (status = 422, description = "Half, empty or inverted window, or inverted price range", body = crate::error::ErrorBody),
    ),
    tag = "vehicles"
)]
pub(crate) async fn search_vehicles(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Vec<VehicleResponse>>, AppError> {
    let q = extract_query(query)?;
    q.validate().map_err(AppError::InvalidArgument)?;
    let vehicles = state.manager.search_vehicles(&ctx, &q.into())?;
    Ok(Json(vehicles.into_iter().map(VehicleResponse::from).collect()))
}

/// GET /v1/vehicles/:id
#[utoipa::path(
    get,
    path = "/v1/vehicles/{id}",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Vehicle found", body = VehicleResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "vehicles"
)]
pub(crate) async fn get_vehicle(
    State(state): State<AppState>,
    Caller(_ctx): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<VehicleResponse>, AppError> {
    Ok(Json(state.fleet.get_vehicle(VehicleId::from_uuid(id))?.into()))
}

/// PATCH /v1/vehicles/:id
#[utoipa::path(
    patch,
    path = "/v1/vehicles/{id}",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    request_body = UpdateVehicleRequest,
    responses(
        (status = 200, description = "Vehicle updated", body = VehicleResponse),
        (status = 409, description = "Vehicle is reserved", body = crate::error::ErrorBody),
        (status = 422, description = "RESERVED cannot be set directly", body = crate::error::ErrorBody),
    ),
    tag = "vehicles"
)]
pub(crate) async fn update_vehicle(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateVehicleRequest>, JsonRejection>,
) -> Result<Json<VehicleResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let status = req.status.as_deref().map(VehicleStatus::parse).transpose()?;
    let change = state.fleet.update_vehicle_tracked(
        &ctx,
        VehicleId::from_uuid(id),
        VehicleUpdate {
            brand: req.brand,
            model: req.model,
            year: req.year,
            description: req.description,
            price_per_day: req.price_per_day,
            status,
        },
    )?;
    persist(&state, &change.after, || state.manager.revert_vehicle(&change)).await?;
    Ok(Json(change.after.into()))
}

/// GET /v1/vehicles/:id/availability?start_date=..&end_date=..
#[utoipa::path(
    get,
    path = "/v1/vehicles/{id}/availability",
    params(
        ("id" = Uuid, Path, description = "Vehicle ID"),
        ("start_date" = String, Query, description = "First day, YYYY-MM-DD"),
        ("end_date" = String, Query, description = "Exclusive end day, YYYY-MM-DD"),
    ),
    responses(
        (status = 200, description = "Availability of the interval", body = AvailabilityResponse),
        (status = 404, description = "Vehicle not found", body = crate::error::ErrorBody),
        (status = 422, description = "Empty or inverted interval", body = crate::error::ErrorBody),
    ),
    tag = "vehicles"
)]
pub(crate) async fn check_availability(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
    query: Result<Query<AvailabilityQuery>, QueryRejection>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let q = extract_query(query)?;
    let available =
        state
            .manager
            .check_availability(&ctx, VehicleId::from_uuid(id), q.start_date, q.end_date)?;
    Ok(Json(AvailabilityResponse {
        vehicle_id: id,
        start_date: q.start_date,
        end_date: q.end_date,
        available,
    }))
}

/// GET /v1/vehicles/:id/reservations
#[utoipa::path(
    get,
    path = "/v1/vehicles/{id}/reservations",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "The vehicle's reservations", body = Vec<ReservationResponse>),
        (status = 403, description = "Caller does not manage the vehicle", body = crate::error::ErrorBody),
    ),
    tag = "vehicles"
)]
pub(crate) async fn list_vehicle_reservations(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ReservationResponse>>, AppError> {
    let reservations = state
        .manager
        .list_by_vehicle(&ctx, VehicleId::from_uuid(id))?;
    Ok(Json(
        reservations
            .into_iter()
            .map(ReservationResponse::from)
            .collect(),
    ))
}

/// POST /v1/vehicles/:id/release: return a reserved vehicle to service.
#[utoipa::path(
    post,
    path = "/v1/vehicles/{id}/release",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Vehicle is AVAILABLE again", body = VehicleResponse),
        (status = 409, description = "Vehicle is not RESERVED", body = crate::error::ErrorBody),
    ),
    tag = "vehicles"
)]
pub(crate) async fn release_vehicle(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<VehicleResponse>, AppError> {
    let change = state
        .manager
        .release_vehicle_tracked(&ctx, VehicleId::from_uuid(id))?;
    persist(&state, &change.after, || state.manager.revert_vehicle(&change)).await?;
    Ok(Json(change.after.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_rejected_at_validation() {
        let req = UpdateVehicleRequest {
            status: Some("BROKEN".into()),
            ..Default::default()
        };
        assert!(req.validate().unwrap_err().contains("BROKEN"));
    }

    #[test]
    fn negative_search_price_rejected_at_validation() {
        let q = SearchQuery {
            min_price: Some(-1),
            ..Default::default()
        };
        assert!(q.validate().is_err());
        assert!(SearchQuery::default().validate().is_ok());
    }

    #[test]
    fn year_bounds() {
        let mut req = CreateVehicleRequest {
            office_id: Uuid::new_v4(),
            agent_id: None,
            brand: "Fiat".into(),
            model: "Panda".into(),
            year: 1850,
            description: String::new(),
            price_per_day: 3000,
        };
        assert!(req.validate().is_err());
        req.year = 2022;
        assert!(req.validate().is_ok());
    }
}
