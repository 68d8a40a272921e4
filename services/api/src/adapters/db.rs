//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, the concrete implementation of
//! the `WordRepository`, `CredentialStore` and `UserStore` ports from the core
//! crate. It handles all interactions with PostgreSQL using `sqlx`.
//!
//! Every call is bounded by the configured query timeout. Dropping the
//! returned future (for example when a client disconnects) aborts the
//! in-flight statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kite_core::domain::{CredentialRecord, Metadata, Scope, User, UserCredentials, Word};
use kite_core::ports::{
    CredentialStore, PortError, PortResult, SearchQuery, UserStore, WordRepository,
};
use kite_core::tokens::hash_token_plaintext;
use sqlx::{FromRow, PgPool};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Deadline applied to each repository call unless configured otherwise.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the persistence ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
    query_timeout: Duration,
}

impl DbAdapter {
    /// Creates a new `DbAdapter` with the default per-call deadline.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Runs `fut` under the query deadline, folding driver errors and
    /// timeouts into [`PortError::Unexpected`].
    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> PortResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(PortError::Unexpected(format!("{operation}: {e}"))),
            Err(_) => {
                warn!(operation, timeout_ms = self.query_timeout.as_millis() as u64, "Database call timed out");
                Err(PortError::Unexpected(format!(
                    "{operation}: exceeded the {:?} deadline",
                    self.query_timeout
                )))
            }
        }
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct WordRecord {
    id: i64,
    created_at: DateTime<Utc>,
    text_value: String,
    difficulty: String,
    related_words: Vec<String>,
    user_id: i64,
    version: i32,
}
impl WordRecord {
    fn to_domain(self) -> PortResult<Word> {
        let difficulty = self
            .difficulty
            .parse()
            .map_err(|e| PortError::Unexpected(format!("word {}: {e}", self.id)))?;
        Ok(Word {
            id: self.id,
            created_at: self.created_at,
            text: self.text_value,
            difficulty,
            related_words: self.related_words,
            user_id: self.user_id,
            version: self.version,
        })
    }
}

#[derive(FromRow)]
struct WordSearchRecord {
    total_records: i64,
    #[sqlx(flatten)]
    word: WordRecord,
}

#[derive(FromRow)]
struct UserRecord {
    id: i64,
    created_at: DateTime<Utc>,
    name: String,
    email: String,
    activated: bool,
    version: i32,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            created_at: self.created_at,
            name: self.name,
            email: self.email,
            activated: self.activated,
            version: self.version,
        }
    }
}

#[derive(FromRow)]
struct UserCredentialsRecord {
    password_hash: String,
    #[sqlx(flatten)]
    user: UserRecord,
}

const WORD_COLUMNS: &str = "id, created_at, text_value, difficulty, related_words, user_id, version";
const USER_COLUMNS: &str = "id, created_at, name, email, activated, version";

/// Builds the search statement. Only safelisted columns can reach the
/// `ORDER BY` clause because a `SortSpec` cannot be built any other way.
fn search_sql(query: &SearchQuery) -> String {
    format!(
        "SELECT count(*) OVER() AS total_records, {WORD_COLUMNS}
         FROM words
         WHERE (to_tsvector('simple', text_value) @@ plainto_tsquery('simple', $1) OR $1 = '')
         AND (LOWER(difficulty) = LOWER($2) OR $2 = '')
         ORDER BY {} {}, id ASC
         LIMIT $3 OFFSET $4",
        query.sort.column(),
        query.sort.direction().as_sql(),
    )
}

//=========================================================================================
// `WordRepository` Trait Implementation
//=========================================================================================

#[async_trait]
impl WordRepository for DbAdapter {
    async fn insert(&self, word: Word) -> PortResult<Word> {
        if word.version != 0 {
            return Err(PortError::Unexpected(format!(
                "refusing to insert a word that already carries version {}",
                word.version
            )));
        }

        let sql = format!(
            "INSERT INTO words (text_value, difficulty, related_words, user_id)
             VALUES ($1, $2, $3, $4)
             RETURNING {WORD_COLUMNS}"
        );
        let record = self
            .bounded(
                "insert word",
                sqlx::query_as::<_, WordRecord>(&sql)
                    .bind(&word.text)
                    .bind(word.difficulty.as_str())
                    .bind(&word.related_words)
                    .bind(word.user_id)
                    .fetch_one(&self.pool),
            )
            .await?;

        debug!(word_id = record.id, user_id = record.user_id, "Inserted word");
        record.to_domain()
    }

    async fn get(&self, id: i64) -> PortResult<Word> {
        if id < 1 {
            return Err(PortError::NotFound(format!("Word {} not found", id)));
        }

        let sql = format!("SELECT {WORD_COLUMNS} FROM words WHERE id = $1");
        self.bounded(
            "get word",
            sqlx::query_as::<_, WordRecord>(&sql)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await?
        .ok_or_else(|| PortError::NotFound(format!("Word {} not found", id)))?
        .to_domain()
    }

    async fn update(&self, word: Word) -> PortResult<Word> {
        let new_version: Option<i32> = self
            .bounded(
                "update word",
                sqlx::query_scalar(
                    "UPDATE words
                     SET text_value = $1, difficulty = $2, related_words = $3, user_id = $4, version = version + 1
                     WHERE id = $5 AND version = $6
                     RETURNING version",
                )
                .bind(&word.text)
                .bind(word.difficulty.as_str())
                .bind(&word.related_words)
                .bind(word.user_id)
                .bind(word.id)
                .bind(word.version)
                .fetch_optional(&self.pool),
            )
            .await?;

        match new_version {
            Some(version) => {
                debug!(word_id = word.id, version, "Updated word");
                Ok(Word { version, ..word })
            }
            None => {
                debug!(word_id = word.id, version = word.version, "Word update matched no row");
                Err(PortError::EditConflict)
            }
        }
    }

    async fn delete(&self, id: i64) -> PortResult<()> {
        if id < 1 {
            return Err(PortError::NotFound(format!("Word {} not found", id)));
        }

        let result = self
            .bounded(
                "delete word",
                sqlx::query("DELETE FROM words WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool),
            )
            .await?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Word {} not found", id)));
        }
        debug!(word_id = id, "Deleted word");
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> PortResult<(Vec<Word>, Metadata)> {
        let sql = search_sql(query);
        let records = self
            .bounded(
                "search words",
                sqlx::query_as::<_, WordSearchRecord>(&sql)
                    .bind(&query.text)
                    .bind(&query.difficulty)
                    .bind(query.page.limit())
                    .bind(query.page.offset())
                    .fetch_all(&self.pool),
            )
            .await?;

        let total_records = records.first().map_or(0, |r| r.total_records);
        let words = records
            .into_iter()
            .map(|r| r.word.to_domain())
            .collect::<PortResult<Vec<_>>>()?;

        Ok((words, Metadata::calculate(total_records, &query.page)))
    }
}

//=========================================================================================
// `CredentialStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CredentialStore for DbAdapter {
    async fn save(&self, record: &CredentialRecord) -> PortResult<()> {
        self.bounded(
            "save token",
            sqlx::query("INSERT INTO tokens (hash, user_id, expiry, scope) VALUES ($1, $2, $3, $4)")
                .bind(&record.hash)
                .bind(record.user_id)
                .bind(record.expiry)
                .bind(record.scope.as_str())
                .execute(&self.pool),
        )
        .await?;
        debug!(user_id = record.user_id, scope = %record.scope, "Saved token");
        Ok(())
    }

    async fn revoke_all(&self, user_id: i64, scope: Scope) -> PortResult<()> {
        let result = self
            .bounded(
                "revoke tokens",
                sqlx::query("DELETE FROM tokens WHERE user_id = $1 AND scope = $2")
                    .bind(user_id)
                    .bind(scope.as_str())
                    .execute(&self.pool),
            )
            .await?;
        debug!(user_id, %scope, revoked = result.rows_affected(), "Revoked tokens");
        Ok(())
    }
}

//=========================================================================================
// `UserStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl UserStore for DbAdapter {
    async fn get_by_email(&self, email: &str) -> PortResult<UserCredentials> {
        let sql = format!("SELECT password_hash, {USER_COLUMNS} FROM users WHERE email = $1");
        let record = self
            .bounded(
                "get user by email",
                sqlx::query_as::<_, UserCredentialsRecord>(&sql)
                    .bind(email)
                    .fetch_optional(&self.pool),
            )
            .await?
            .ok_or_else(|| PortError::NotFound("User with that email not found".to_string()))?;

        Ok(UserCredentials {
            password_hash: record.password_hash,
            user: record.user.to_domain(),
        })
    }

    async fn get_for_token(&self, scope: Scope, plaintext: &str) -> PortResult<User> {
        let hash = hash_token_plaintext(plaintext);
        let record = self
            .bounded(
                "get user for token",
                sqlx::query_as::<_, UserRecord>(
                    "SELECT users.id, users.created_at, users.name, users.email, users.activated, users.version
                     FROM users
                     INNER JOIN tokens ON users.id = tokens.user_id
                     WHERE tokens.hash = $1
                     AND tokens.scope = $2
                     AND tokens.expiry > $3",
                )
                .bind(hash)
                .bind(scope.as_str())
                .bind(Utc::now())
                .fetch_optional(&self.pool),
            )
            .await?
            .ok_or_else(|| PortError::NotFound(format!("No user for that {} token", scope)))?;

        Ok(record.to_domain())
    }

    async fn activate(&self, user: User) -> PortResult<User> {
        let new_version: Option<i32> = self
            .bounded(
                "activate user",
                sqlx::query_scalar(
                    "UPDATE users SET activated = true, version = version + 1
                     WHERE id = $1 AND version = $2
                     RETURNING version",
                )
                .bind(user.id)
                .bind(user.version)
                .fetch_optional(&self.pool),
            )
            .await?;

        let version = new_version.ok_or(PortError::EditConflict)?;
        debug!(user_id = user.id, version, "Activated user");
        Ok(User {
            activated: true,
            version,
            ..user
        })
    }
}
