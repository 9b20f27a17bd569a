//! # Account Routes
//!
//! Admin-managed account directory. Account holders may read their own
//! record.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use vrs_core::{OfficeId, UserId};
use vrs_engine::NewAccount;
use vrs_state::{Account, Role};

use crate::auth::Caller;
use crate::db::persist_failed;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Request to register an account.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAccountRequest {
    /// `client`, `agent` or `admin`.
    pub role: String,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Office an agent works for. Required for agents.
    pub office_id: Option<Uuid>,
}

impl Validate for CreateAccountRequest {
    fn validate(&self) -> Result<(), String> {
        Role::parse(&self.role).map_err(|e| e.to_string())?;
        if self.name.len() > 255 || self.email.len() > 255 {
            return Err("name and email must not exceed 255 characters".to_string());
        }
        if !self.email.trim().is_empty() && !self.email.contains('@') {
            return Err(format!("email '{}' is not an address", self.email));
        }
        Ok(())
    }
}

/// An account as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AccountResponse {
    /// Account identifier.
    pub id: Uuid,
    /// `client`, `agent` or `admin`.
    pub role: String,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Office for agents.
    pub office_id: Option<Uuid>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(a: Account) -> Self {
        Self {
            id: *a.id.as_uuid(),
            role: a.role.as_str().to_string(),
            name: a.name,
            email: a.email,
            office_id: a.office_id.map(|o| *o.as_uuid()),
            created_at: *a.created_at.as_datetime(),
        }
    }
}

/// Build the accounts router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/accounts", get(list_accounts).post(create_account))
        .route("/v1/accounts/:id", get(get_account))
}

/// POST /v1/accounts
#[utoipa::path(
    post,
    path = "/v1/accounts",
    request_body = CreateAccountRequest,
    responses(
        (status = 201, description = "Account registered", body = AccountResponse),
        (status = 403, description = "Admins only", body = crate::error::ErrorBody),
    ),
    tag = "accounts"
)]
pub(crate) async fn create_account(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    body: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AccountResponse>), AppError> {
    let req = extract_validated_json(body)?;
    let account = state.fleet.register_account(
        &ctx,
        NewAccount {
            role: Role::parse(&req.role)?,
            name: req.name,
            email: req.email,
            office_id: req.office_id.map(OfficeId::from_uuid),
        },
    )?;
    if let Some(pool) = &state.db_pool {
        crate::db::accounts::upsert(pool, &account)
            .await
            .map_err(|e| {
                persist_failed("account", account.id, e, || {
                    state.fleet.revert_account_registration(&account)
                })
            })?;
    }
    Ok((StatusCode::CREATED, Json(account.into())))
}

/// GET /v1/accounts
#[utoipa::path(
    get,
    path = "/v1/accounts",
    responses(
        (status = 200, description = "All accounts", body = Vec<AccountResponse>),
        (status = 403, description = "Admins only", body = crate::error::ErrorBody),
    ),
    tag = "accounts"
)]
pub(crate) async fn list_accounts(
    State(state): State<AppState>,
    Caller(ctx): Caller,
) -> Result<Json<Vec<AccountResponse>>, AppError> {
    let accounts = state.fleet.list_accounts(&ctx)?;
    Ok(Json(accounts.into_iter().map(AccountResponse::from).collect()))
}

/// GET /v1/accounts/:id
#[utoipa::path(
    get,
    path = "/v1/accounts/{id}",
    params(("id" = Uuid, Path, description = "Account ID")),
    responses(
        (status = 200, description = "Account found", body = AccountResponse),
        (status = 403, description = "Neither the holder nor an admin", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    tag = "accounts"
)]
pub(crate) async fn get_account(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountResponse>, AppError> {
    Ok(Json(
        state.fleet.get_account(&ctx, UserId::from_uuid(id))?.into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(role: &str, email: &str) -> CreateAccountRequest {
        CreateAccountRequest {
            role: role.into(),
            name: "Dana".into(),
            email: email.into(),
            office_id: None,
        }
    }

    #[test]
    fn role_must_be_known() {
        assert!(request("Agent", "dana@example.com").validate().is_ok());
        assert!(request("owner", "dana@example.com").validate().is_err());
    }

    #[test]
    fn email_needs_at_sign() {
        assert!(request("client", "dana.example.com").validate().is_err());
    }
}
