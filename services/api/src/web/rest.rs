//! services/api/src/web/rest.rs
//!
//! Contains the router, the health check handler and the master definition
//! for the OpenAPI specification.

use crate::error::ApiError;
use crate::web::{auth, middleware::authenticate, state::AppState, words};
use axum::{
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, Uri,
    },
    middleware as axum_middleware,
    response::{IntoResponse, Json},
    routing::{get, post, put},
    extract::State,
    Router,
};
use kite_core::ports::PortError;
use serde::Serialize;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi, ToSchema,
};
use utoipa_swagger_ui::SwaggerUi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        healthcheck_handler,
        words::list_words_handler,
        words::create_word_handler,
        words::get_word_handler,
        words::update_word_handler,
        words::delete_word_handler,
        auth::create_authentication_token_handler,
        auth::activate_user_handler,
    ),
    components(
        schemas(
            HealthResponse,
            SystemInfo,
            words::UserIdInput,
            words::CreateWordRequest,
            words::UpdateWordRequest,
            words::WordResponse,
            words::WordEnvelope,
            words::MetadataResponse,
            words::WordListResponse,
            words::MessageResponse,
            auth::CreateAuthenticationTokenRequest,
            auth::TokenResponse,
            auth::AuthenticationTokenEnvelope,
            auth::ActivateUserRequest,
            auth::UserResponse,
            auth::UserEnvelope,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Kite API", description = "Word lexicon and token authentication endpoints.")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

//=========================================================================================
// Health Check
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct SystemInfo {
    environment: String,
    version: String,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    system_info: SystemInfo,
}

/// GET /v1/healthcheck - Report that the service is up
#[utoipa::path(
    get,
    path = "/v1/healthcheck",
    responses(
        (status = 200, description = "Service is available", body = HealthResponse)
    )
)]
pub async fn healthcheck_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "available".to_string(),
        system_info: SystemInfo {
            environment: state.config.env.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    })
}

async fn not_found_handler(uri: Uri) -> ApiError {
    PortError::NotFound(format!("No route for {}", uri.path())).into()
}

async fn method_not_allowed_handler(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method)
}

//=========================================================================================
// Router
//=========================================================================================

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring unparseable CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
}

/// Builds the complete application: public routes, authenticated word routes,
/// Swagger UI, CORS and request tracing.
pub fn router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/v1/healthcheck", get(healthcheck_handler))
        .route(
            "/v1/tokens/authentication",
            post(auth::create_authentication_token_handler),
        )
        .route("/v1/users/activated", put(auth::activate_user_handler));

    // Protected routes (activated account required)
    let protected_routes = Router::new()
        .route(
            "/v1/words",
            get(words::list_words_handler).post(words::create_word_handler),
        )
        .route(
            "/v1/words/{id}",
            get(words::get_word_handler)
                .patch(words::update_word_handler)
                .delete(words::delete_word_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            authenticate,
        ));

    let cors = cors_layer(&state.config.cors_trusted_origins);

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .method_not_allowed_fallback(method_not_allowed_handler)
        .fallback(not_found_handler)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Merge the API router with the Swagger UI router for a complete application.
    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
