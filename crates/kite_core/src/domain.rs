//! crates/kite_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

use crate::filters::SortSafeList;

//=========================================================================================
// Words
//=========================================================================================

/// How hard a word is to learn. Stored as lower-case text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the known difficulties.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown difficulty '{0}'")]
pub struct UnknownDifficulty(pub String);

impl FromStr for Difficulty {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(UnknownDifficulty(other.to_string())),
        }
    }
}

/// A lexicon entry.
///
/// `id`, `created_at` and `version` are owned by the store. A word that has
/// not been inserted yet carries `id == 0` and `version == 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub difficulty: Difficulty,
    pub related_words: Vec<String>,
    pub user_id: i64,
    pub version: i32,
}

impl Word {
    /// Builds a word that has not been persisted yet.
    pub fn new(text: String, difficulty: Difficulty, related_words: Vec<String>, user_id: i64) -> Self {
        Self {
            id: 0,
            created_at: Utc::now(),
            text,
            difficulty,
            related_words,
            user_id,
            version: 0,
        }
    }

    /// The sort tokens clients may use when listing words.
    ///
    /// Clients sort by `text`, which lives in the `text_value` column.
    pub const SORT_SAFELIST: SortSafeList = SortSafeList::new(&[
        ("id", "id"),
        ("text", "text_value"),
        ("difficulty", "difficulty"),
    ]);
}

/// Pagination summary of a search result.
///
/// The all-zero value means "nothing matched".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metadata {
    pub current_page: i64,
    pub page_size: i64,
    pub first_page: i64,
    pub last_page: i64,
    pub total_records: i64,
}

impl Metadata {
    pub fn is_empty(&self) -> bool {
        *self == Metadata::default()
    }
}

//=========================================================================================
// Users
//=========================================================================================

/// Represents an account - used throughout the app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,
    pub activated: bool,
    pub version: i32,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

//=========================================================================================
// Credentials
//=========================================================================================

/// The purpose a credential may be consumed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Activation,
    Authentication,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Activation => "activation",
            Scope::Authentication => "authentication",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the known scopes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown credential scope '{0}'")]
pub struct UnknownScope(pub String);

impl FromStr for Scope {
    type Err = UnknownScope;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activation" => Ok(Scope::Activation),
            "authentication" => Ok(Scope::Authentication),
            other => Err(UnknownScope(other.to_string())),
        }
    }
}

/// The persisted half of a credential. It has no room for the plain value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub hash: Vec<u8>,
    pub user_id: i64,
    pub expiry: DateTime<Utc>,
    pub scope: Scope,
}

/// A freshly issued credential.
///
/// The plain value is only reachable through [`Credential::plaintext`] and is
/// redacted from the `Debug` output.
#[derive(Clone)]
pub struct Credential {
    plaintext: String,
    record: CredentialRecord,
}

impl Credential {
    pub(crate) fn new(plaintext: String, record: CredentialRecord) -> Self {
        Self { plaintext, record }
    }

    pub fn plaintext(&self) -> &str {
        &self.plaintext
    }

    pub fn record(&self) -> &CredentialRecord {
        &self.record
    }

    pub fn expiry(&self) -> DateTime<Utc> {
        self.record.expiry
    }

    pub fn scope(&self) -> Scope {
        self.record.scope
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("plaintext", &"<redacted>")
            .field("record", &self.record)
            .finish()
    }
}
