//! Runtime orchestrator: builds the service graph once per process and runs
//! the recommendation pipeline over it.
//!
//! Keyword extraction → place search → ranking → top-K enrichment. Dialogue
//! sessions are opened here too so every engine shares the same store and
//! model gateway, and a completed dialogue feeds its answers into exactly one
//! recommendation run.

pub mod orchestrator;
pub mod services;
pub mod session;
pub mod types;

pub use orchestrator::{new_session_id, Orchestrator, SESSION_PREFIX};
pub use services::{ServiceParts, Services, UnconfiguredModel};
pub use session::{RecommendationStatus, TripSession};
pub use types::*;
