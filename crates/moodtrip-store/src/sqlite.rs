//! SQLite-backed session store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moodtrip_core::{ConversationTurn, Error, Result, TurnKind, TurnRole};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use tracing::{debug, info};

use crate::schema::SCHEMA_SQL;
use crate::SessionStore;

pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl SqliteSessionStore {
    /// Open or create the store.
    ///
    /// `db_dir` is the directory (e.g., `data/sessions/`). The file will be `db_dir/sessions.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("sessions.db");

        let conn = Connection::open(&db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
        };
        info!(
            "SqliteSessionStore initialized: {} turns, path={}",
            store.count_turns()?,
            store.db_path.display()
        );
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn count_turns(&self) -> Result<i64> {
        let conn = self.conn.lock();
        conn.query_row("SELECT COUNT(*) FROM conversation_turns", [], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))
    }

    fn row_to_turn(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String, i64)> {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn append(&self, session_id: &str, turn: &ConversationTurn) -> Result<()> {
        let conn = self.conn.lock();
        conn.prepare_cached(
            "INSERT INTO conversation_turns (session_id, role, kind, content, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .map_err(|e| Error::Database(e.to_string()))?
        .execute(params![
            session_id,
            turn.role.as_str(),
            turn.kind.as_str(),
            turn.content,
            turn.timestamp.timestamp_millis()
        ])
        .map_err(|e| Error::Database(e.to_string()))?;
        debug!("Appended {} turn to session {}", turn.kind.as_str(), session_id);
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Vec<ConversationTurn>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT role, kind, content, created_at FROM conversation_turns WHERE session_id = ?1 ORDER BY id",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![session_id], Self::row_to_turn)
            .map_err(|e| Error::Database(e.to_string()))?;

        let mut turns = Vec::new();
        for row in rows {
            let (role, kind, content, created_at) = row.map_err(|e| Error::Database(e.to_string()))?;
            let role = TurnRole::parse(&role)
                .ok_or_else(|| Error::Database(format!("unknown turn role '{}'", role)))?;
            let kind = TurnKind::parse(&kind)
                .ok_or_else(|| Error::Database(format!("unknown turn kind '{}'", kind)))?;
            let timestamp = DateTime::<Utc>::from_timestamp_millis(created_at).unwrap_or_default();
            turns.push(ConversationTurn {
                role,
                content,
                kind,
                timestamp,
            });
        }
        Ok(turns)
    }

    async fn clear(&self, session_id: &str) -> Result<usize> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM conversation_turns WHERE session_id = ?1",
            params![session_id],
        )
        .map_err(|e| Error::Database(e.to_string()))
    }
}
