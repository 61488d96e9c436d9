//! Process-local session store.

use std::collections::HashMap;

use async_trait::async_trait;
use moodtrip_core::{ConversationTurn, Result};
use parking_lot::RwLock;

use crate::SessionStore;

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Vec<ConversationTurn>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn append(&self, session_id: &str, turn: &ConversationTurn) -> Result<()> {
        self.sessions
            .write()
            .entry(session_id.to_string())
            .or_default()
            .push(turn.clone());
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Vec<ConversationTurn>> {
        Ok(self
            .sessions
            .read()
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn clear(&self, session_id: &str) -> Result<usize> {
        Ok(self
            .sessions
            .write()
            .remove(session_id)
            .map(|turns| turns.len())
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_load_clear() {
        let store = MemorySessionStore::new();
        store.append("s1", &ConversationTurn::question("去哪？")).await.unwrap();
        store.append("s1", &ConversationTurn::answer("海边")).await.unwrap();
        store.append("s2", &ConversationTurn::question("几个人？")).await.unwrap();

        let turns = store.load("s1").await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].content, "海边");
        assert_eq!(store.session_count(), 2);

        assert_eq!(store.clear("s1").await.unwrap(), 2);
        assert!(store.load("s1").await.unwrap().is_empty());
        assert_eq!(store.clear("missing").await.unwrap(), 0);
    }
}
