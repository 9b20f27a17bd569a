//! # Authentication Middleware
//!
//! Bearer token middleware. The token is resolved into a
//! [`CapabilityContext`] by the configured [`IdentityResolver`] and injected
//! into the request extensions.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {role}.{user_id}.{expires_unix}.{hex hmac-sha256}
//! ```
//!
//! See `vrs_engine::session` for signing and verification.
//!
//! ## Caller
//!
//! Handlers take a [`Caller`] argument; its `FromRequestParts` impl reads
//! the context the middleware injected.

use std::sync::Arc;

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use vrs_engine::{BookingError, CapabilityContext, IdentityResolver};

use crate::error::{AppError, ErrorBody, ErrorDetail};

// ── Caller ──────────────────────────────────────────────────────────────────

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub CapabilityContext);

impl Caller {
    /// The resolved capability context.
    pub fn context(&self) -> &CapabilityContext {
        &self.0
    }
}

/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    resolver: Arc<dyn IdentityResolver>,
}

impl AuthConfig {
    /// Authenticate requests with the given resolver.
    pub fn new(resolver: Arc<dyn IdentityResolver>) -> Self {
        Self { resolver }
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Resolve the Bearer token from the Authorization header and inject the
/// resulting [`Caller`].
///
/// Requests are rejected when no [`AuthConfig`] is installed.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let Some(config) = request.extensions().get::<AuthConfig>().cloned() else {
        tracing::error!("authentication failed: no auth configuration installed");
        return unauthorized_response("authentication is not configured");
    };

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let token = match auth_header {
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(token) => token.trim().to_string(),
            None => {
                tracing::warn!("authentication failed: non-Bearer authorization scheme");
                return unauthorized_response("authorization header must use Bearer scheme");
            }
        },
        None => {
            tracing::warn!("authentication failed: missing authorization header");
            return unauthorized_response("missing authorization header");
        }
    };

    match config.resolver.resolve(&token) {
        Ok(ctx) => {
            tracing::debug!(user_id = %ctx.user_id, role = %ctx.role, "caller resolved");
            request.extensions_mut().insert(Caller(ctx));
            next.run(request).await
        }
        Err(BookingError::Unauthenticated(reason)) => {
            tracing::warn!(reason = %reason, "authentication failed: invalid bearer token");
            unauthorized_response(&reason)
        }
        Err(err) => {
            tracing::error!(error = %err, "caller resolution failed");
            AppError::from(err).into_response()
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
