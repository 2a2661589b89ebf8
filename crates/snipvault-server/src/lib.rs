//! HTTP server for snipvault.
//!
//! Serves the snippet CRUD and history endpoints as a JSON API. Every
//! error response is a `{ "error", "code" }` object.

pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::AppState;
