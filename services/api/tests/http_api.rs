//! End-to-end tests that drive the full router against a real database.

mod common;

use api_lib::adapters::DbAdapter;
use axum::http::{header, Method, StatusCode};
use chrono::Duration;
use common::{build_test_app, create_user, login, send};
use kite_core::domain::Scope;
use kite_core::ports::CredentialStore;
use kite_core::CredentialIssuer;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
async fn healthcheck_is_public(pool: PgPool) {
    let app = build_test_app(pool);

    let response = send(app, Method::GET, "/v1/healthcheck", None, None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "available");
    assert_eq!(response.body["system_info"]["environment"], "test");
}

#[sqlx::test(migrations = "./migrations")]
async fn unknown_route_uses_the_error_envelope(pool: PgPool) {
    let app = build_test_app(pool);

    let response = send(app, Method::GET, "/v1/nowhere", None, None).await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(
        response.body["error"],
        "the requested resource could not be found"
    );
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn word_routes_require_a_bearer_token(pool: PgPool) {
    let app = build_test_app(pool);

    let response = send(app.clone(), Method::GET, "/v1/words", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers[header::WWW_AUTHENTICATE], "Bearer");

    let response = send(
        app,
        Method::GET,
        "/v1/words",
        Some("AAAAAAAAAAAAAAAAAAAAAAAAAA"),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "./migrations")]
async fn login_rejects_wrong_password_and_unknown_email(pool: PgPool) {
    create_user(&pool, "alice@example.com", true).await;
    let app = build_test_app(pool);

    let wrong_password = json!({ "email": "alice@example.com", "password": "not-the-password" });
    let response = send(
        app.clone(),
        Method::POST,
        "/v1/tokens/authentication",
        None,
        Some(wrong_password),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let unknown = json!({ "email": "nobody@example.com", "password": common::PASSWORD });
    let response = send(
        app.clone(),
        Method::POST,
        "/v1/tokens/authentication",
        None,
        Some(unknown),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let malformed = json!({ "email": "not-an-email", "password": "short" });
    let response = send(
        app,
        Method::POST,
        "/v1/tokens/authentication",
        None,
        Some(malformed),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body["error"]["email"].is_string());
    assert!(response.body["error"]["password"].is_string());
}

#[sqlx::test(migrations = "./migrations")]
async fn a_new_login_revokes_the_previous_token(pool: PgPool) {
    create_user(&pool, "alice@example.com", true).await;
    let app = build_test_app(pool);

    let first = login(app.clone(), "alice@example.com").await;
    assert_eq!(first.len(), 26);
    let second = login(app.clone(), "alice@example.com").await;
    assert_ne!(first, second);

    let response = send(app.clone(), Method::GET, "/v1/words", Some(&first), None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = send(app, Method::GET, "/v1/words", Some(&second), None).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[sqlx::test(migrations = "./migrations")]
async fn inactive_accounts_are_forbidden(pool: PgPool) {
    create_user(&pool, "dormant@example.com", false).await;
    let app = build_test_app(pool);

    let token = login(app.clone(), "dormant@example.com").await;
    let response = send(app, Method::GET, "/v1/words", Some(&token), None).await;

    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "./migrations")]
async fn activation_token_is_single_use(pool: PgPool) {
    let user_id = create_user(&pool, "dormant@example.com", false).await;
    let store = DbAdapter::new(pool.clone());
    let credential = CredentialIssuer::new()
        .issue(user_id, Duration::days(3), Scope::Activation)
        .unwrap();
    store.save(credential.record()).await.unwrap();
    let app = build_test_app(pool);

    let body = json!({ "token": credential.plaintext() });
    let response = send(
        app.clone(),
        Method::PUT,
        "/v1/users/activated",
        None,
        Some(body.clone()),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["user"]["activated"], true);

    let response = send(app.clone(), Method::PUT, "/v1/users/activated", None, Some(body)).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        response.body["error"]["token"],
        "invalid or expired activation token"
    );

    // The account can now reach protected routes.
    let token = login(app.clone(), "dormant@example.com").await;
    let response = send(app, Method::GET, "/v1/words", Some(&token), None).await;
    assert_eq!(response.status, StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Words
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn word_lifecycle_over_http(pool: PgPool) {
    let user_id = create_user(&pool, "alice@example.com", true).await;
    let app = build_test_app(pool);
    let token = login(app.clone(), "alice@example.com").await;

    // Create
    let response = send(
        app.clone(),
        Method::POST,
        "/v1/words",
        Some(&token),
        Some(json!({
            "text": "lucid",
            "difficulty": "medium",
            "related_words": ["clear"],
            "user_id": format!("ID-{user_id}"),
        })),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
    let id = response.body["word"]["id"].as_i64().unwrap();
    assert_eq!(
        response.headers[header::LOCATION],
        format!("/v1/words/{id}").as_str()
    );
    assert_eq!(response.body["word"]["user_id"], user_id);
    assert!(response.body["word"].get("version").is_none());

    // Read
    let uri = format!("/v1/words/{id}");
    let response = send(app.clone(), Method::GET, &uri, Some(&token), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["word"]["text"], "lucid");
    assert_eq!(response.body["word"]["related_words"], json!(["clear"]));

    // Partial update keeps untouched fields.
    let response = send(
        app.clone(),
        Method::PATCH,
        &uri,
        Some(&token),
        Some(json!({ "difficulty": "hard" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.body);
    assert_eq!(response.body["word"]["difficulty"], "hard");
    assert_eq!(response.body["word"]["text"], "lucid");
    assert_eq!(response.body["word"]["user_id"], user_id);

    // Delete, then everything about the id is gone.
    let response = send(app.clone(), Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["message"], "word successfully deleted");

    for method in [Method::GET, Method::DELETE] {
        let response = send(app.clone(), method, &uri, Some(&token), None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn invalid_word_fields_are_reported_per_field(pool: PgPool) {
    create_user(&pool, "alice@example.com", true).await;
    let app = build_test_app(pool);
    let token = login(app.clone(), "alice@example.com").await;

    let response = send(
        app.clone(),
        Method::POST,
        "/v1/words",
        Some(&token),
        Some(json!({ "text": "", "difficulty": "impossible", "user_id": 0 })),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    let errors = response.body["error"].as_object().unwrap();
    assert!(errors.contains_key("text"));
    assert!(errors.contains_key("difficulty"));
    assert!(errors.contains_key("user_id"));

    let response = send(
        app,
        Method::POST,
        "/v1/words",
        Some(&token),
        Some(json!({ "text": "x", "difficulty": "easy", "user_id": 1, "extra": true })),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "./migrations")]
async fn malformed_user_id_is_rejected_on_create_and_patch(pool: PgPool) {
    let user_id = create_user(&pool, "alice@example.com", true).await;
    let app = build_test_app(pool);
    let token = login(app.clone(), "alice@example.com").await;

    let response = send(
        app.clone(),
        Method::POST,
        "/v1/words",
        Some(&token),
        Some(json!({ "text": "lucid", "difficulty": "easy", "user_id": "ID-x" })),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = send(
        app.clone(),
        Method::POST,
        "/v1/words",
        Some(&token),
        Some(json!({ "text": "lucid", "difficulty": "easy", "user_id": user_id })),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let uri = format!("/v1/words/{}", response.body["word"]["id"]);

    for bad in [json!("garbage"), json!("7"), json!("ID-x")] {
        let response = send(
            app.clone(),
            Method::PATCH,
            &uri,
            Some(&token),
            Some(json!({ "user_id": bad })),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{bad}");
    }

    let response = send(
        app.clone(),
        Method::PATCH,
        &uri,
        Some(&token),
        Some(json!({ "user_id": 0 })),
    )
    .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body["error"]["user_id"].is_string());

    // Nothing above changed the stored word.
    let response = send(app, Method::GET, &uri, Some(&token), None).await;
    assert_eq!(response.body["word"]["user_id"], user_id);
}

#[sqlx::test(migrations = "./migrations")]
async fn wrong_method_uses_the_error_envelope(pool: PgPool) {
    let app = build_test_app(pool);

    let response = send(app, Method::DELETE, "/v1/healthcheck", None, None).await;

    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        response.body["error"],
        "the requested DELETE method is not allowed for this resource"
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn list_validates_sort_and_paging(pool: PgPool) {
    create_user(&pool, "alice@example.com", true).await;
    let app = build_test_app(pool);
    let token = login(app.clone(), "alice@example.com").await;

    let response = send(
        app.clone(),
        Method::GET,
        "/v1/words?sort=created_at",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"]["sort"], "invalid sort value");

    let response = send(
        app.clone(),
        Method::GET,
        "/v1/words?page=0&page_size=1001",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.body["error"]["page"].is_string());
    assert!(response.body["error"]["page_size"].is_string());

    let response = send(app, Method::GET, "/v1/words?page=two", Some(&token), None).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["error"]["page"], "must be an integer value");
}

#[sqlx::test(migrations = "./migrations")]
async fn list_returns_words_and_metadata(pool: PgPool) {
    let user_id = create_user(&pool, "alice@example.com", true).await;
    let app = build_test_app(pool);
    let token = login(app.clone(), "alice@example.com").await;

    for (text, difficulty) in [("alpha", "easy"), ("beta", "hard"), ("gamma", "easy")] {
        let response = send(
            app.clone(),
            Method::POST,
            "/v1/words",
            Some(&token),
            Some(json!({ "text": text, "difficulty": difficulty, "user_id": user_id })),
        )
        .await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let response = send(
        app.clone(),
        Method::GET,
        "/v1/words?difficulty=EASY&sort=-text&page_size=1",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["words"][0]["text"], "gamma");
    assert_eq!(
        response.body["metadata"],
        json!({
            "current_page": 1,
            "page_size": 1,
            "first_page": 1,
            "last_page": 2,
            "total_records": 2,
        })
    );

    // A blank search term matches everything.
    let response = send(
        app.clone(),
        Method::GET,
        "/v1/words?text=%20%20",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["metadata"]["total_records"], 3);

    let response = send(app, Method::GET, "/v1/words?text=delta", Some(&token), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["words"], json!([]));
    assert_eq!(response.body["metadata"], json!({}));
}
