use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::Turn;

pub const MAX_TURNS: usize = 20;

/// Per-session turn history.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Snapshot of the session's turns, oldest first. Empty for unknown ids.
    async fn history(&self, session_id: &str) -> Vec<Turn>;

    /// Appends turns and trims the session to its bound in one step.
    async fn append(&self, session_id: &str, turns: Vec<Turn>);

    /// Drops all but the most recent `keep` turns.
    async fn trim(&self, session_id: &str, keep: usize);

    /// Returns whether the session existed.
    async fn clear(&self, session_id: &str) -> bool;
}

pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Vec<Turn>>>,
    max_turns: usize,
}

impl MemorySessionStore {
    pub fn new(max_turns: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_turns,
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(MAX_TURNS)
    }
}

fn keep_last(turns: &mut Vec<Turn>, keep: usize) {
    if turns.len() > keep {
        turns.drain(..turns.len() - keep);
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn history(&self, session_id: &str) -> Vec<Turn> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }

    async fn append(&self, session_id: &str, turns: Vec<Turn>) {
        let mut sessions = self.sessions.write().await;
        let history = sessions.entry(session_id.to_string()).or_default();
        history.extend(turns);
        keep_last(history, self.max_turns);
    }

    async fn trim(&self, session_id: &str, keep: usize) {
        if let Some(history) = self.sessions.write().await.get_mut(session_id) {
            keep_last(history, keep);
        }
    }

    async fn clear(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    #[tokio::test]
    async fn test_history_is_bounded_to_most_recent_turns() {
        let store = MemorySessionStore::default();
        for i in 0..11 {
            store
                .append(
                    "s1",
                    vec![Turn::user(format!("q{i}")), Turn::assistant(format!("a{i}"))],
                )
                .await;
        }

        let history = store.history("s1").await;
        assert_eq!(history.len(), 20);
        assert_eq!(history[0], Turn::user("q1"));
        assert_eq!(history[19], Turn::assistant("a10"));
        assert!(history
            .iter()
            .enumerate()
            .all(|(i, t)| t.role == if i % 2 == 0 { Role::User } else { Role::Assistant }));
    }

    #[tokio::test]
    async fn test_unknown_session_is_empty() {
        let store = MemorySessionStore::default();
        assert!(store.history("nobody").await.is_empty());
        assert!(!store.clear("nobody").await);
    }

    #[tokio::test]
    async fn test_trim_and_clear() {
        let store = MemorySessionStore::default();
        store
            .append("s2", vec![Turn::user("hi"), Turn::assistant("hello"), Turn::user("bye")])
            .await;
        store.trim("s2", 1).await;
        assert_eq!(store.history("s2").await, vec![Turn::user("bye")]);

        assert!(store.clear("s2").await);
        assert!(store.history("s2").await.is_empty());
    }
}
