//! store.rs — in-memory conversation store: sessions, ordered message logs,
//! and the watchlist. The only shared mutable resource in the process.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known session id the ingestion loops append to.
pub const INTEL_SESSION: &str = "INTEL_STREAM";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Monotonic per session; total order of the session's messages.
    pub sequence_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StoreInner {
    /// Sessions in creation order; listing reverses for newest-first.
    sessions: Vec<SessionInfo>,
    messages: HashMap<String, Vec<StoredMessage>>,
    favorites: Vec<String>,
}

/// Append-only per-session message log plus the favorites set.
///
/// A single `Mutex` serializes writes, which keeps `sequence_id` monotonic
/// per session; appends from concurrent tasks interleave across sessions
/// without corrupting order within one.
#[derive(Debug, Default)]
pub struct ConversationStore {
    inner: Mutex<StoreInner>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session if absent. Idempotent for an existing id.
    pub fn create_session(&self, session_id: &str, title: &str) {
        let mut g = self.inner.lock().expect("store mutex poisoned");
        create_session_locked(&mut g, session_id, title);
    }

    /// Append a message, implicitly creating the session on first use.
    pub fn add_message(&self, session_id: &str, role: Role, content: &str) -> StoredMessage {
        let mut g = self.inner.lock().expect("store mutex poisoned");
        let tail = session_id
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<String>();
        create_session_locked(&mut g, session_id, &format!("Chat {tail}"));

        let log = g.messages.entry(session_id.to_string()).or_default();
        let msg = StoredMessage {
            session_id: session_id.to_string(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
            sequence_id: log.len() as u64 + 1,
        };
        log.push(msg.clone());
        msg
    }

    /// All sessions, newest first.
    pub fn sessions(&self) -> Vec<SessionInfo> {
        let g = self.inner.lock().expect("store mutex poisoned");
        g.sessions.iter().rev().cloned().collect()
    }

    /// Chronological history for one session; empty for unknown ids.
    pub fn history(&self, session_id: &str) -> Vec<StoredMessage> {
        let g = self.inner.lock().expect("store mutex poisoned");
        g.messages.get(session_id).cloned().unwrap_or_default()
    }

    /// Drop a session and its messages. Unknown ids are a no-op.
    pub fn delete_session(&self, session_id: &str) {
        let mut g = self.inner.lock().expect("store mutex poisoned");
        g.sessions.retain(|s| s.id != session_id);
        g.messages.remove(session_id);
    }

    /// Add a ticker to the watchlist, uppercased. Idempotent.
    pub fn add_favorite(&self, ticker: &str) {
        let t = ticker.trim().to_ascii_uppercase();
        if t.is_empty() {
            return;
        }
        let mut g = self.inner.lock().expect("store mutex poisoned");
        if !g.favorites.contains(&t) {
            g.favorites.push(t);
        }
    }

    /// Watchlist tickers, most recently added first.
    pub fn favorites(&self) -> Vec<String> {
        let g = self.inner.lock().expect("store mutex poisoned");
        g.favorites.iter().rev().cloned().collect()
    }

    pub fn remove_favorite(&self, ticker: &str) {
        let t = ticker.trim().to_ascii_uppercase();
        let mut g = self.inner.lock().expect("store mutex poisoned");
        g.favorites.retain(|f| *f != t);
    }
}

fn create_session_locked(g: &mut StoreInner, session_id: &str, title: &str) {
    if g.sessions.iter().any(|s| s.id == session_id) {
        return;
    }
    g.sessions.push(SessionInfo {
        id: session_id.to_string(),
        title: title.to_string(),
        created_at: Utc::now(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_ids_are_monotonic_per_session() {
        let store = ConversationStore::new();
        let a = store.add_message("s1", Role::User, "first");
        let b = store.add_message("s1", Role::Assistant, "second");
        let c = store.add_message("s2", Role::User, "other session");
        assert_eq!(a.sequence_id, 1);
        assert_eq!(b.sequence_id, 2);
        assert_eq!(c.sequence_id, 1);
    }

    #[test]
    fn session_is_created_on_first_message() {
        let store = ConversationStore::new();
        store.add_message("abcd1234", Role::User, "hi");
        let sessions = store.sessions();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].id, "abcd1234");
        assert_eq!(sessions[0].title, "Chat 1234");
    }

    #[test]
    fn delete_session_drops_history() {
        let store = ConversationStore::new();
        store.add_message("s1", Role::User, "hi");
        store.delete_session("s1");
        assert!(store.sessions().is_empty());
        assert!(store.history("s1").is_empty());
    }

    #[test]
    fn favorites_are_uppercased_and_idempotent() {
        let store = ConversationStore::new();
        store.add_favorite("aapl");
        store.add_favorite("AAPL");
        store.add_favorite("spy");
        assert_eq!(store.favorites(), vec!["SPY".to_string(), "AAPL".into()]);
        store.remove_favorite("aapl");
        assert_eq!(store.favorites(), vec!["SPY".to_string()]);
    }
}
