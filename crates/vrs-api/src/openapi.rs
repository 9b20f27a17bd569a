//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI document,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Adds the Bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("vrs-session")
                        .description(Some(
                            "Signed session token: {role}.{user_id}.{expires_unix}.{hmac}. Mint with `vrs token issue`.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Assembled OpenAPI document for the API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "VRS API: Vehicle Reservation Stack",
        version = "0.3.1",
        description = "Reservation lifecycle and availability service for a vehicle rental fleet.\n\nClients request reservations over half-open day intervals; the agent managing a vehicle (or an admin) accepts or declines. Two overlapping reservations are never both accepted for one vehicle.\n\nAuthentication: Bearer token via `Authorization: Bearer <token>` header. All `/v1/*` endpoints require authentication. Health checks (`/health/*`) are unauthenticated.",
        license(name = "AGPL-3.0-or-later"),
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    paths(
        // ── Reservations ────────────────────────────────────────────────
        crate::routes::reservations::create_reservation,
        crate::routes::reservations::list_reservations,
        crate::routes::reservations::get_reservation,
        crate::routes::reservations::amend_reservation,
        crate::routes::reservations::cancel_reservation,
        crate::routes::reservations::decide_reservation,
        crate::routes::reservations::list_client_reservations,
        // ── Vehicles ────────────────────────────────────────────────────
        crate::routes::vehicles::create_vehicle,
        crate::routes::vehicles::list_vehicles,
        crate::routes::vehicles::search_vehicles,
        crate::routes::vehicles::get_vehicle,
        crate::routes::vehicles::update_vehicle,
        crate::routes::vehicles::check_availability,
        crate::routes::vehicles::list_vehicle_reservations,
        crate::routes::vehicles::release_vehicle,
        // ── Reviews ─────────────────────────────────────────────────────
        crate::routes::reviews::submit_review,
        crate::routes::reviews::list_vehicle_reviews,
        crate::routes::reviews::list_client_reviews,
        // ── Accounts ────────────────────────────────────────────────────
        crate::routes::accounts::create_account,
        crate::routes::accounts::list_accounts,
        crate::routes::accounts::get_account,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            crate::middleware::metrics::MetricsSnapshot,
            crate::routes::reservations::CreateReservationRequest,
            crate::routes::reservations::AmendReservationRequest,
            crate::routes::reservations::DecisionRequest,
            crate::routes::reservations::ReservationResponse,
            crate::routes::reservations::TransitionEntry,
            crate::routes::vehicles::CreateVehicleRequest,
            crate::routes::vehicles::UpdateVehicleRequest,
            crate::routes::vehicles::VehicleResponse,
            crate::routes::vehicles::AvailabilityResponse,
            crate::routes::reviews::CreateReviewRequest,
            crate::routes::reviews::ReviewResponse,
            crate::routes::accounts::CreateAccountRequest,
            crate::routes::accounts::AccountResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "reservations", description = "Reservation lifecycle"),
        (name = "vehicles", description = "Fleet, availability and release"),
        (name = "reviews", description = "Client reviews of rented vehicles"),
        (name = "accounts", description = "Account directory"),
    )
)]
pub struct ApiDoc;

/// Router serving the document at `/openapi.json`.
pub fn openapi_router<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new().route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
}
