//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::adapters::DbAdapter;
use crate::config::Config;
use kite_core::ports::{CredentialStore, UserStore, WordRepository};
use kite_core::tokens::CredentialIssuer;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// Holds no mutable data of its own; all contention is left to the database.
#[derive(Clone)]
pub struct AppState {
    pub words: Arc<dyn WordRepository>,
    pub tokens: Arc<dyn CredentialStore>,
    pub users: Arc<dyn UserStore>,
    pub issuer: CredentialIssuer,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires every port to the same database adapter.
    pub fn new(db: DbAdapter, config: Arc<Config>) -> Self {
        let db = Arc::new(db);
        Self {
            words: db.clone(),
            tokens: db.clone(),
            users: db,
            issuer: CredentialIssuer::new(),
            config,
        }
    }
}
