//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how each
//! variant is rendered to clients.

use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use kite_core::ports::PortError;
use serde_json::{json, Value};

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error while running the startup migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The request could not be parsed.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or missing authentication token")]
    InvalidAuthenticationToken,

    #[error("Inactive account")]
    InactiveAccount,

    /// The route exists but does not accept this HTTP method.
    #[error("Method {0} not allowed")]
    MethodNotAllowed(Method),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// Convenience type alias for handler return values.
pub type ApiResult<T> = Result<T, ApiError>;

const SERVER_ERROR_MESSAGE: &str = "the server encountered a problem and could not process your request";

fn envelope(status: StatusCode, message: Value) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Port(PortError::NotFound(what)) => {
                tracing::debug!(%what, "Record not found");
                envelope(
                    StatusCode::NOT_FOUND,
                    json!("the requested resource could not be found"),
                )
            }
            ApiError::Port(PortError::EditConflict) => envelope(
                StatusCode::CONFLICT,
                json!("unable to update the record due to an edit conflict, please try again"),
            ),
            ApiError::Port(PortError::Validation(v)) => {
                envelope(StatusCode::UNPROCESSABLE_ENTITY, json!(v.into_errors()))
            }
            ApiError::InvalidCredentials => envelope(
                StatusCode::UNAUTHORIZED,
                json!("invalid authentication credentials"),
            ),
            ApiError::InvalidAuthenticationToken => {
                let mut response = envelope(
                    StatusCode::UNAUTHORIZED,
                    json!("invalid or missing authentication token"),
                );
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    header::HeaderValue::from_static("Bearer"),
                );
                response
            }
            ApiError::InactiveAccount => envelope(
                StatusCode::FORBIDDEN,
                json!("your user account must be activated to access this resource"),
            ),
            ApiError::MethodNotAllowed(method) => envelope(
                StatusCode::METHOD_NOT_ALLOWED,
                json!(format!(
                    "the requested {method} method is not allowed for this resource"
                )),
            ),
            ApiError::BadRequest(message) => envelope(StatusCode::BAD_REQUEST, json!(message)),
            other => {
                // Backend detail stays in the log and never reaches the client.
                tracing::error!(error = %other, "Request failed");
                envelope(StatusCode::INTERNAL_SERVER_ERROR, json!(SERVER_ERROR_MESSAGE))
            }
        }
    }
}
