//! MoodTrip HTTP application layer.
//!
//! The router and state live in the library so integration tests can drive
//! handlers in-process; `main.rs` only resolves configuration and serves.

pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
