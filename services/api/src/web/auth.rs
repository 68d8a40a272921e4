//! services/api/src/web/auth.rs
//!
//! Credential endpoints: issuing authentication tokens at login and consuming
//! activation tokens.

use argon2::{
    password_hash::{PasswordHash, PasswordVerifier},
    Argon2,
};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use kite_core::domain::{Scope, User};
use kite_core::ports::PortError;
use kite_core::validation::{
    validate_email, validate_password_plaintext, validate_token_plaintext, Validator,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::error::{ApiError, ApiResult};
use crate::web::state::AppState;

/// Lifetime of a token issued at login.
pub const AUTHENTICATION_TOKEN_TTL_HOURS: i64 = 24;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateAuthenticationTokenRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
    pub expiry: DateTime<Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct AuthenticationTokenEnvelope {
    pub authentication_token: TokenResponse,
}

#[derive(Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ActivateUserRequest {
    pub token: String,
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    pub activated: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            created_at: user.created_at,
            name: user.name,
            email: user.email,
            activated: user.activated,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct UserEnvelope {
    pub user: UserResponse,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /v1/tokens/authentication - Exchange email and password for a bearer token
#[utoipa::path(
    post,
    path = "/v1/tokens/authentication",
    request_body = CreateAuthenticationTokenRequest,
    responses(
        (status = 201, description = "Token issued", body = AuthenticationTokenEnvelope),
        (status = 400, description = "Malformed request body"),
        (status = 401, description = "Invalid credentials"),
        (status = 422, description = "Invalid email or password format"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn create_authentication_token_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateAuthenticationTokenRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let mut v = Validator::new();
    validate_email(&mut v, &req.email);
    validate_password_plaintext(&mut v, &req.password);
    if !v.is_valid() {
        return Err(PortError::Validation(v).into());
    }

    // 1. Look up the account
    let creds = state
        .users
        .get_by_email(&req.email)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => ApiError::InvalidCredentials,
            other => other.into(),
        })?;

    // 2. Verify the password
    let parsed_hash = PasswordHash::new(&creds.password_hash).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("stored password hash is malformed".to_string())
    })?;
    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(ApiError::InvalidCredentials);
    }

    // 3. Replace any earlier session tokens with a fresh one
    let user_id = creds.user.id;
    state.tokens.revoke_all(user_id, Scope::Authentication).await?;
    let credential = state.issuer.issue(
        user_id,
        Duration::hours(AUTHENTICATION_TOKEN_TTL_HOURS),
        Scope::Authentication,
    )?;
    state.tokens.save(credential.record()).await?;
    info!(user_id, scope = %credential.scope(), "Token issued");

    Ok((
        StatusCode::CREATED,
        Json(AuthenticationTokenEnvelope {
            authentication_token: TokenResponse {
                token: credential.plaintext().to_string(),
                expiry: credential.expiry(),
            },
        }),
    ))
}

/// PUT /v1/users/activated - Activate an account with a one-time token
#[utoipa::path(
    put,
    path = "/v1/users/activated",
    request_body = ActivateUserRequest,
    responses(
        (status = 200, description = "Account activated", body = UserEnvelope),
        (status = 400, description = "Malformed request body"),
        (status = 409, description = "Edit conflict, retry"),
        (status = 422, description = "Invalid or expired activation token")
    )
)]
pub async fn activate_user_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ActivateUserRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(req) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let mut v = Validator::new();
    validate_token_plaintext(&mut v, &req.token);
    if !v.is_valid() {
        return Err(PortError::Validation(v).into());
    }

    let user = match state.users.get_for_token(Scope::Activation, &req.token).await {
        Ok(user) => user,
        Err(PortError::NotFound(_)) => {
            v.add_error("token", "invalid or expired activation token");
            return Err(PortError::Validation(v).into());
        }
        Err(other) => return Err(other.into()),
    };

    let user = state.users.activate(user).await?;
    state.tokens.revoke_all(user.id, Scope::Activation).await?;
    info!(user_id = user.id, "User activated");

    Ok(Json(UserEnvelope { user: user.into() }))
}
