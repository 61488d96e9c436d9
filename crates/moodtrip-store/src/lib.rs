//! MoodTrip Store: append-only conversation logs keyed by session id.
//!
//! Two `SessionStore` implementations are chosen at construction time:
//! `MemorySessionStore` for process-local sessions and `SqliteSessionStore`
//! for sessions that survive a restart.

pub mod memory;
pub mod schema;
pub mod sqlite;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use moodtrip_core::{ConversationTurn, Result, SessionBackend};

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

/// Ordered, append-only turn log per session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Append one turn to the end of the session's log.
    async fn append(&self, session_id: &str, turn: &ConversationTurn) -> Result<()>;

    /// All turns of the session in append order; empty if unknown.
    async fn load(&self, session_id: &str) -> Result<Vec<ConversationTurn>>;

    /// Drop the session's log. Returns the number of turns removed.
    async fn clear(&self, session_id: &str) -> Result<usize>;
}

/// Build the configured backend. `sessions_dir` is only used by SQLite.
pub fn open_session_store(
    backend: SessionBackend,
    sessions_dir: impl AsRef<Path>,
) -> Result<Arc<dyn SessionStore>> {
    Ok(match backend {
        SessionBackend::Memory => Arc::new(MemorySessionStore::new()),
        SessionBackend::Sqlite => Arc::new(SqliteSessionStore::open(sessions_dir)?),
    })
}
