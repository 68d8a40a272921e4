//! crates/kite_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the concrete persistence backend.

use async_trait::async_trait;

use crate::domain::{CredentialRecord, Metadata, Scope, User, UserCredentials, Word};
use crate::filters::{PageSpec, SortSpec};
use crate::validation::Validator;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., the database).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A concurrent writer changed the record, or the record is gone.
    #[error("Edit conflict")]
    EditConflict,
    #[error("Validation failed: {0}")]
    Validation(Validator),
    /// The random source failed while minting a credential.
    #[error("Credential generation failed: {0}")]
    CredentialGeneration(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Query Objects
//=========================================================================================

/// Filters, ordering and page window for a word search.
///
/// An empty `text` or `difficulty` matches every row.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: String,
    pub difficulty: String,
    pub sort: SortSpec,
    pub page: PageSpec,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait WordRepository: Send + Sync {
    /// Persists a new word and returns it with the store-assigned id,
    /// creation time and baseline version.
    async fn insert(&self, word: Word) -> PortResult<Word>;

    async fn get(&self, id: i64) -> PortResult<Word>;

    /// Writes `word` if its `version` still matches the stored one and
    /// returns it carrying the incremented version. Reports
    /// [`PortError::EditConflict`] when no row matched.
    async fn update(&self, word: Word) -> PortResult<Word>;

    async fn delete(&self, id: i64) -> PortResult<()>;

    /// Returns one page of matching words plus the pagination summary,
    /// computed in a single round trip.
    async fn search(&self, query: &SearchQuery) -> PortResult<(Vec<Word>, Metadata)>;
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn save(&self, record: &CredentialRecord) -> PortResult<()>;

    /// Deletes every credential of `scope` belonging to `user_id`.
    async fn revoke_all(&self, user_id: i64, scope: Scope) -> PortResult<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    /// Resolves the owner of an unexpired credential presented in plain form.
    async fn get_for_token(&self, scope: Scope, plaintext: &str) -> PortResult<User>;

    /// Saves the activation flag with the same version check as word updates.
    async fn activate(&self, user: User) -> PortResult<User>;
}
