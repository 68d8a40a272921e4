//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use kite_core::domain::Scope;
use kite_core::ports::PortError;
use kite_core::validation::{validate_token_plaintext, Validator};
use std::sync::Arc;
use tracing::debug;

use crate::error::ApiError;
use crate::web::state::AppState;

/// Middleware that resolves the bearer token to an activated user.
///
/// If valid, inserts the `User` into request extensions for handlers to use.
/// A missing, malformed, unknown or expired token is rejected with 401 and
/// an inactive account with 403.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract the bearer token
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::InvalidAuthenticationToken)?
        .to_string();

    let mut v = Validator::new();
    validate_token_plaintext(&mut v, &token);
    if !v.is_valid() {
        return Err(ApiError::InvalidAuthenticationToken);
    }

    // 2. Resolve the owner of the token
    let user = state
        .users
        .get_for_token(Scope::Authentication, &token)
        .await
        .map_err(|e| match e {
            PortError::NotFound(_) => ApiError::InvalidAuthenticationToken,
            other => other.into(),
        })?;

    if !user.activated {
        debug!(user_id = user.id, "Rejected request from inactive account");
        return Err(ApiError::InactiveAccount);
    }

    // 3. Insert the user into request extensions and continue
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
