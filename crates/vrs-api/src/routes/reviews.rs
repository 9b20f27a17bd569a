//! # Review Routes
//!
//! Clients review vehicles they have rented; anyone signed in can read a
//! vehicle's reviews, and a client's own list is private to them and
//! admins.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use vrs_core::{UserId, VehicleId};
use vrs_state::{Review, ReviewText};

use crate::auth::Caller;
use crate::db::persist_failed;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

const MAX_TEXT: usize = 4000;

/// Request to review a vehicle.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReviewRequest {
    /// Rating from 1 to 5.
    pub rating: i64,
    /// Overall impression.
    pub comment: Option<String>,
    /// What went well.
    pub pros: Option<String>,
    /// What did not.
    pub cons: Option<String>,
}

impl Validate for CreateReviewRequest {
    fn validate(&self) -> Result<(), String> {
        for (field, text) in [
            ("comment", &self.comment),
            ("pros", &self.pros),
            ("cons", &self.cons),
        ] {
            if text.as_ref().is_some_and(|t| t.len() > MAX_TEXT) {
                return Err(format!("{field} must not exceed {MAX_TEXT} characters"));
            }
        }
        Ok(())
    }
}

/// A review as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReviewResponse {
    /// Review identifier.
    pub id: Uuid,
    /// Author.
    pub client_id: Uuid,
    /// Reviewed vehicle.
    pub vehicle_id: Uuid,
    /// Rating from 1 to 5.
    pub rating: u8,
    /// Overall impression.
    pub comment: Option<String>,
    /// What went well.
    pub pros: Option<String>,
    /// What did not.
    pub cons: Option<String>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
}

impl From<Review> for ReviewResponse {
    fn from(r: Review) -> Self {
        Self {
            id: *r.id.as_uuid(),
            client_id: *r.client_id.as_uuid(),
            vehicle_id: *r.vehicle_id.as_uuid(),
            rating: r.rating,
            comment: r.text.comment,
            pros: r.text.pros,
            cons: r.text.cons,
            created_at: *r.created_at.as_datetime(),
        }
    }
}

/// Build the reviews router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/vehicles/:id/reviews",
            get(list_vehicle_reviews).post(submit_review),
        )
        .route("/v1/clients/:id/reviews", get(list_client_reviews))
}

/// POST /v1/vehicles/:id/reviews
#[utoipa::path(
    post,
    path = "/v1/vehicles/{id}/reviews",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review recorded", body = ReviewResponse),
        (status = 403, description = "Caller has not rented the vehicle", body = crate::error::ErrorBody),
        (status = 404, description = "Vehicle not found", body = crate::error::ErrorBody),
        (status = 422, description = "Rating outside 1..=5", body = crate::error::ErrorBody),
    ),
    tag = "reviews"
)]
pub(crate) async fn submit_review(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
    body: Result<Json<CreateReviewRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReviewResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let review = state.reviews.submit(
        &ctx,
        VehicleId::from_uuid(id),
        req.rating,
        ReviewText {
            comment: req.comment,
            pros: req.pros,
            cons: req.cons,
        },
    )?;
    if let Some(pool) = &state.db_pool {
        crate::db::reviews::insert(pool, &review)
            .await
            .map_err(|e| persist_failed("review", review.id, e, || state.reviews.revert(&review)))?;
    }
    Ok((StatusCode::CREATED, Json(review.into())))
}

/// GET /v1/vehicles/:id/reviews
#[utoipa::path(
    get,
    path = "/v1/vehicles/{id}/reviews",
    params(("id" = Uuid, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "The vehicle's reviews, oldest first", body = Vec<ReviewResponse>),
        (status = 404, description = "Vehicle not found", body = crate::error::ErrorBody),
    ),
    tag = "reviews"
)]
pub(crate) async fn list_vehicle_reviews(
    State(state): State<AppState>,
    Caller(_ctx): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ReviewResponse>>, AppError> {
    let reviews = state.reviews.list_by_vehicle(VehicleId::from_uuid(id))?;
    Ok(Json(reviews.into_iter().map(ReviewResponse::from).collect()))
}

/// GET /v1/clients/:id/reviews
#[utoipa::path(
    get,
    path = "/v1/clients/{id}/reviews",
    params(("id" = Uuid, Path, description = "Client ID")),
    responses(
        (status = 200, description = "The client's reviews, oldest first", body = Vec<ReviewResponse>),
        (status = 403, description = "Caller is not the client or an admin", body = crate::error::ErrorBody),
    ),
    tag = "reviews"
)]
pub(crate) async fn list_client_reviews(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ReviewResponse>>, AppError> {
    let reviews = state
        .reviews
        .list_by_client(&ctx, UserId::from_uuid(id))?;
    Ok(Json(reviews.into_iter().map(ReviewResponse::from).collect()))
}
