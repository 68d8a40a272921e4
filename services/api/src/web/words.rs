//! services/api/src/web/words.rs
//!
//! REST handlers for the word lexicon.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use kite_core::domain::{Metadata, Word};
use kite_core::filters::{PageSpec, SortSpec};
use kite_core::ports::{PortError, SearchQuery};
use kite_core::validation::{validate_word, Validator};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use crate::error::{ApiError, ApiResult};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum RawUserId {
    Number(i64),
    Tagged(String),
}

/// A user id, given either as a bare number or in the `"ID-<n>"` form.
///
/// Any other string fails to decode, so the request is rejected as malformed.
#[derive(Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(try_from = "RawUserId")]
pub struct UserIdInput(i64);

impl TryFrom<RawUserId> for UserIdInput {
    type Error = String;

    fn try_from(raw: RawUserId) -> Result<Self, Self::Error> {
        match raw {
            RawUserId::Number(id) => Ok(Self(id)),
            RawUserId::Tagged(tagged) => tagged
                .strip_prefix("ID-")
                .and_then(|digits| digits.parse::<i64>().ok())
                .map(Self)
                .ok_or_else(|| format!("invalid user id format: {tagged:?}")),
        }
    }
}

impl UserIdInput {
    fn value(&self) -> i64 {
        self.0
    }
}

#[derive(Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateWordRequest {
    pub text: String,
    pub difficulty: String,
    #[serde(default)]
    pub related_words: Option<Vec<String>>,
    pub user_id: UserIdInput,
}

/// Partial update; absent or blank fields keep their stored values.
#[derive(Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateWordRequest {
    pub text: Option<String>,
    pub difficulty: Option<String>,
    pub related_words: Option<Vec<String>>,
    pub user_id: Option<UserIdInput>,
}

/// A word as clients see it. The concurrency `version` is never exposed.
#[derive(Serialize, ToSchema)]
pub struct WordResponse {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub difficulty: String,
    pub related_words: Vec<String>,
    pub user_id: i64,
}

impl From<Word> for WordResponse {
    fn from(word: Word) -> Self {
        Self {
            id: word.id,
            created_at: word.created_at,
            text: word.text,
            difficulty: word.difficulty.to_string(),
            related_words: word.related_words,
            user_id: word.user_id,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct WordEnvelope {
    pub word: WordResponse,
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

/// Pagination summary; every field is omitted when nothing matched.
#[derive(Serialize, ToSchema)]
pub struct MetadataResponse {
    #[serde(skip_serializing_if = "is_zero")]
    pub current_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub page_size: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub first_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub last_page: i64,
    #[serde(skip_serializing_if = "is_zero")]
    pub total_records: i64,
}

impl From<Metadata> for MetadataResponse {
    fn from(m: Metadata) -> Self {
        Self {
            current_page: m.current_page,
            page_size: m.page_size,
            first_page: m.first_page,
            last_page: m.last_page,
            total_records: m.total_records,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct WordListResponse {
    pub words: Vec<WordResponse>,
    pub metadata: MetadataResponse,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

//=========================================================================================
// Input Helpers
//=========================================================================================

/// Parses a path id; anything that is not a positive integer is "not found".
fn read_id_param(raw: &str) -> ApiResult<i64> {
    raw.parse::<i64>()
        .ok()
        .filter(|id| *id >= 1)
        .ok_or_else(|| PortError::NotFound(format!("Word {} not found", raw)).into())
}

fn read_string(qs: &HashMap<String, String>, key: &str, default: &str) -> String {
    match qs.get(key).map(|value| value.trim()) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => default.to_string(),
    }
}

fn read_int(qs: &HashMap<String, String>, key: &str, default: i64, v: &mut Validator) -> i64 {
    match qs.get(key).filter(|value| !value.is_empty()) {
        None => default,
        Some(value) => value.parse::<i64>().unwrap_or_else(|_| {
            v.add_error(key, "must be an integer value");
            default
        }),
    }
}

fn read_json<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /v1/words - Search words with filters, sorting and pagination
#[utoipa::path(
    get,
    path = "/v1/words",
    params(
        ("text" = Option<String>, Query, description = "Full-text term matched against the word text"),
        ("difficulty" = Option<String>, Query, description = "Case-insensitive difficulty filter"),
        ("page" = Option<i64>, Query, description = "Page number, 1 to 10,000,000"),
        ("page_size" = Option<i64>, Query, description = "Page size, 1 to 1000"),
        ("sort" = Option<String>, Query, description = "id, text or difficulty, optionally prefixed with '-'")
    ),
    responses(
        (status = 200, description = "One page of matching words", body = WordListResponse),
        (status = 401, description = "Missing or invalid authentication token"),
        (status = 422, description = "Invalid filter, sort or page parameters")
    ),
    security(("bearer" = []))
)]
pub async fn list_words_handler(
    State(state): State<Arc<AppState>>,
    Query(qs): Query<HashMap<String, String>>,
) -> ApiResult<impl IntoResponse> {
    let mut v = Validator::new();

    let text = read_string(&qs, "text", "");
    let difficulty = read_string(&qs, "difficulty", "");
    let page = read_int(&qs, "page", 1, &mut v);
    let page_size = read_int(&qs, "page_size", 20, &mut v);
    let sort = read_string(&qs, "sort", "id");

    let page = PageSpec::validate(&mut v, page, page_size);
    let sort = SortSpec::validate(&mut v, &sort, &Word::SORT_SAFELIST);

    let query = match (page, sort) {
        (Some(page), Some(sort)) if v.is_valid() => SearchQuery {
            text,
            difficulty,
            sort,
            page,
        },
        _ => return Err(PortError::Validation(v).into()),
    };

    let (words, metadata) = state.words.search(&query).await?;

    Ok(Json(WordListResponse {
        words: words.into_iter().map(WordResponse::from).collect(),
        metadata: metadata.into(),
    }))
}

/// POST /v1/words - Create a word
#[utoipa::path(
    post,
    path = "/v1/words",
    request_body = CreateWordRequest,
    responses(
        (status = 201, description = "Word created", body = WordEnvelope),
        (status = 400, description = "Malformed request body"),
        (status = 401, description = "Missing or invalid authentication token"),
        (status = 422, description = "Invalid word fields")
    ),
    security(("bearer" = []))
)]
pub async fn create_word_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateWordRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let req = read_json(payload)?;

    let mut v = Validator::new();
    let user_id = req.user_id.value();
    let difficulty = validate_word(&mut v, &req.text, &req.difficulty, user_id);
    let difficulty = match difficulty {
        Some(d) if v.is_valid() => d,
        _ => return Err(PortError::Validation(v).into()),
    };

    let word = Word::new(
        req.text,
        difficulty,
        req.related_words.unwrap_or_default(),
        user_id,
    );
    let word = state.words.insert(word).await?;
    info!(word_id = word.id, user_id = word.user_id, "Word created");

    let location = format!("/v1/words/{}", word.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(WordEnvelope { word: word.into() }),
    ))
}

/// GET /v1/words/{id} - Fetch one word
#[utoipa::path(
    get,
    path = "/v1/words/{id}",
    params(("id" = i64, Path, description = "Word id")),
    responses(
        (status = 200, description = "The word", body = WordEnvelope),
        (status = 401, description = "Missing or invalid authentication token"),
        (status = 404, description = "No such word")
    ),
    security(("bearer" = []))
)]
pub async fn get_word_handler(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = read_id_param(&raw_id)?;
    let word = state.words.get(id).await?;
    Ok(Json(WordEnvelope { word: word.into() }))
}

/// PATCH /v1/words/{id} - Partially update a word
///
/// Reads the current row first, so a missing id is reported as 404 and a
/// concurrent modification as 409.
#[utoipa::path(
    patch,
    path = "/v1/words/{id}",
    params(("id" = i64, Path, description = "Word id")),
    request_body = UpdateWordRequest,
    responses(
        (status = 200, description = "Word updated", body = WordEnvelope),
        (status = 400, description = "Malformed request body"),
        (status = 401, description = "Missing or invalid authentication token"),
        (status = 404, description = "No such word"),
        (status = 409, description = "Edit conflict, retry"),
        (status = 422, description = "Invalid word fields")
    ),
    security(("bearer" = []))
)]
pub async fn update_word_handler(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
    payload: Result<Json<UpdateWordRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let id = read_id_param(&raw_id)?;
    let mut word = state.words.get(id).await?;
    let req = read_json(payload)?;

    let text = req
        .text
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| word.text.clone());
    let difficulty = req
        .difficulty
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| word.difficulty.to_string());
    let user_id = req.user_id.map_or(word.user_id, |u| u.value());

    let mut v = Validator::new();
    let parsed = validate_word(&mut v, &text, &difficulty, user_id);
    word.difficulty = match parsed {
        Some(d) if v.is_valid() => d,
        _ => return Err(PortError::Validation(v).into()),
    };
    word.text = text;
    word.user_id = user_id;
    if let Some(related_words) = req.related_words {
        word.related_words = related_words;
    }

    let word = state.words.update(word).await?;
    info!(word_id = word.id, version = word.version, "Word updated");

    Ok(Json(WordEnvelope { word: word.into() }))
}

/// DELETE /v1/words/{id} - Delete a word
#[utoipa::path(
    delete,
    path = "/v1/words/{id}",
    params(("id" = i64, Path, description = "Word id")),
    responses(
        (status = 200, description = "Word deleted", body = MessageResponse),
        (status = 401, description = "Missing or invalid authentication token"),
        (status = 404, description = "No such word")
    ),
    security(("bearer" = []))
)]
pub async fn delete_word_handler(
    State(state): State<Arc<AppState>>,
    Path(raw_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let id = read_id_param(&raw_id)?;
    state.words.delete(id).await?;
    info!(word_id = id, "Word deleted");

    Ok(Json(MessageResponse {
        message: "word successfully deleted".to_string(),
    }))
}
