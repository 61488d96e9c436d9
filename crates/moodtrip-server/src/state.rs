//! Shared application state.

use std::collections::HashMap;
use std::sync::Arc;

use moodtrip_core::{ModelConfig, MoodTripConfig};
use moodtrip_runtime::{Orchestrator, TripSession};
use parking_lot::RwLock;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: MoodTripConfig,
    pub model_config: ModelConfig,
    pub orchestrator: Orchestrator,
    /// Live dialogue sessions by id.
    sessions: RwLock<HashMap<String, Arc<TripSession>>>,
}

impl AppState {
    pub fn new(config: MoodTripConfig, model_config: ModelConfig, orchestrator: Orchestrator) -> Self {
        Self {
            config,
            model_config,
            orchestrator,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn session(&self, session_id: &str) -> Option<Arc<TripSession>> {
        self.sessions.read().get(session_id).cloned()
    }

    /// Register a session. A session already live under the same id wins,
    /// so concurrent callers all end up sharing one.
    pub fn insert_session(&self, session: TripSession) -> Arc<TripSession> {
        self.sessions
            .write()
            .entry(session.session_id().to_string())
            .or_insert_with(|| Arc::new(session))
            .clone()
    }

    pub fn remove_session(&self, session_id: &str) -> Option<Arc<TripSession>> {
        self.sessions.write().remove(session_id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}
