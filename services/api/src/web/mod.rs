pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;
pub mod words;

// Re-export the router so the binary and the tests build the same application.
pub use middleware::authenticate;
pub use rest::{router, ApiDoc};
pub use state::AppState;
