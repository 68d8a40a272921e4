//! Shared helpers for the database-backed integration tests.
#![allow(dead_code)]

use api_lib::adapters::DbAdapter;
use api_lib::config::{Config, DbConfig};
use api_lib::web::{router, AppState};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use kite_core::domain::{Difficulty, Word};
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const PASSWORD: &str = "pa55word-for-tests";

/// Build a test `Config` with safe defaults. The pool is supplied directly,
/// so the URL is never dialled.
pub fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        env: "test".to_string(),
        db: DbConfig {
            url: String::new(),
            max_open_conns: 5,
            max_idle_conns: 1,
            max_idle_time: Duration::from_secs(60),
            query_timeout: Duration::from_secs(3),
        },
        log_level: tracing::Level::DEBUG,
        cors_trusted_origins: vec!["http://localhost:5173".to_string()],
    }
}

/// Build the full application router exactly as the binary does.
pub fn build_test_app(pool: PgPool) -> Router {
    let state = AppState::new(DbAdapter::new(pool), Arc::new(test_config()));
    router(Arc::new(state))
}

/// Insert a user row directly and return its id.
pub async fn create_user(pool: &PgPool, email: &str, activated: bool) -> i64 {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(PASSWORD.as_bytes(), &salt)
        .expect("hashing should succeed")
        .to_string();

    sqlx::query_scalar(
        "INSERT INTO users (name, email, password_hash, activated) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind("Test User")
    .bind(email)
    .bind(password_hash)
    .bind(activated)
    .fetch_one(pool)
    .await
    .expect("user creation should succeed")
}

pub fn word(text: &str, difficulty: Difficulty, user_id: i64) -> Word {
    Word::new(text.to_string(), difficulty, vec![], user_id)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Send one request through the router and decode the JSON body (or `Null`).
pub async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> TestResponse {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    TestResponse {
        status,
        headers,
        body,
    }
}

/// Log in through the API and return the bearer token.
pub async fn login(app: Router, email: &str) -> String {
    let body = serde_json::json!({ "email": email, "password": PASSWORD });
    let response = send(app, Method::POST, "/v1/tokens/authentication", None, Some(body)).await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    response.body["authentication_token"]["token"]
        .as_str()
        .expect("token in response")
        .to_string()
}
