//! In-memory conversation session store

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::{Mutex, MutexGuard};

use super::ConversationTurn;
use crate::{Error, Result};

/// Ordered, append-only conversation of one session
///
/// Turns are never edited or removed individually; the whole history goes
/// away only when the session is cleared from the [`SessionStore`].
#[derive(Debug)]
pub struct SessionHistory {
    id: String,
    turns: RwLock<Vec<ConversationTurn>>,
    turn_lock: Mutex<()>,
}

impl SessionHistory {
    fn new(id: String) -> Self {
        Self {
            id,
            turns: RwLock::new(Vec::new()),
            turn_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Snapshot of the turns recorded so far
    #[must_use]
    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.turns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait for exclusive use of this session's history
    ///
    /// Held by the orchestrator from recording the user turn until the
    /// assistant turn is recorded, so overlapping requests on one session
    /// cannot interleave their appends.
    pub async fn lock_turn(&self) -> MutexGuard<'_, ()> {
        self.turn_lock.lock().await
    }

    fn push(&self, turn: ConversationTurn) {
        self.turns
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(turn);
    }
}

/// Owner of every session history for the lifetime of the process
///
/// Sessions are created lazily and live until cleared. There is no capacity
/// bound or expiry.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<SessionHistory>>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the session's history, creating an empty one on first use
    pub fn get_or_create(&self, session_id: &str) -> Arc<SessionHistory> {
        if let Some(existing) = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
        {
            return Arc::clone(existing);
        }

        let mut sessions = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        // Another writer may have created it between the two locks
        Arc::clone(sessions.entry(session_id.to_string()).or_insert_with(|| {
            tracing::info!(session_id, "created new chat session");
            Arc::new(SessionHistory::new(session_id.to_string()))
        }))
    }

    /// Append a turn to an existing session
    ///
    /// # Errors
    ///
    /// Returns `Error::SessionNotFound` if the session was never created or
    /// has been cleared
    pub fn append(&self, session_id: &str, turn: ConversationTurn) -> Result<()> {
        let session = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(session_id.to_string()))?;

        session.push(turn);
        Ok(())
    }

    /// Append a turn through a handle from [`get_or_create`](Self::get_or_create)
    ///
    /// The store lock is held while pushing, so a concurrent clear either
    /// happens before (and the append fails) or after (and takes the turn
    /// with it).
    ///
    /// # Errors
    ///
    /// Returns `Error::SessionNotFound` if the session was cleared since the
    /// handle was taken, even when a new session now has the same id
    pub fn append_to(&self, session: &Arc<SessionHistory>, turn: ConversationTurn) -> Result<()> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);

        match sessions.get(session.id()) {
            Some(current) if Arc::ptr_eq(current, session) => {
                session.push(turn);
                Ok(())
            }
            _ => Err(Error::SessionNotFound(session.id().to_string())),
        }
    }

    /// Snapshot of a session's turns; empty for unknown sessions
    #[must_use]
    pub fn history(&self, session_id: &str) -> Vec<ConversationTurn> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .map(|s| s.turns())
            .unwrap_or_default()
    }

    /// Drop a session's entire history
    ///
    /// Returns `true` if the session existed
    pub fn clear(&self, session_id: &str) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session_id)
            .is_some();

        if removed {
            tracing::info!(session_id, "cleared chat session");
        }
        removed
    }

    /// Ids of all currently tracked sessions
    #[must_use]
    pub fn list_active(&self) -> BTreeSet<String> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Role;

    #[test]
    fn test_get_or_create_returns_same_session() {
        let store = SessionStore::new();

        let first = store.get_or_create("s1");
        let second = store.get_or_create("s1");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len(), 1);
        assert!(first.is_empty());
        assert_eq!(first.id(), "s1");
    }

    #[test]
    fn test_append_requires_existing_session() {
        let store = SessionStore::new();

        let err = store
            .append("missing", ConversationTurn::user("hello"))
            .unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(id) if id == "missing"));

        // Failed append must not create the session
        assert!(store.is_empty());
    }

    #[test]
    fn test_append_preserves_order() {
        let store = SessionStore::new();
        store.get_or_create("s1");

        store.append("s1", ConversationTurn::user("one")).unwrap();
        store.append("s1", ConversationTurn::assistant("two")).unwrap();
        store.append("s1", ConversationTurn::user("three")).unwrap();

        let history = store.history("s1");
        let texts: Vec<_> = history.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["one", "two", "three"]);
        assert_eq!(history[1].role, Role::Assistant);
    }

    #[test]
    fn test_append_to_rejects_replaced_session() {
        let store = SessionStore::new();
        let stale = store.get_or_create("s1");
        store.append_to(&stale, ConversationTurn::user("hello")).unwrap();

        store.clear("s1");
        let fresh = store.get_or_create("s1");

        let err = store
            .append_to(&stale, ConversationTurn::assistant("old reply"))
            .unwrap_err();
        assert!(matches!(err, Error::SessionNotFound(id) if id == "s1"));
        assert!(fresh.is_empty());
        assert!(store.history("s1").is_empty());

        store.append_to(&fresh, ConversationTurn::user("again")).unwrap();
        assert_eq!(store.history("s1"), vec![ConversationTurn::user("again")]);
    }

    #[test]
    fn test_history_of_unknown_session_is_empty_and_not_created() {
        let store = SessionStore::new();
        assert!(store.history("nobody").is_empty());
        assert!(store.list_active().is_empty());
    }

    #[test]
    fn test_clear_reports_existence_once() {
        let store = SessionStore::new();
        store.get_or_create("s1");
        store.append("s1", ConversationTurn::user("hello")).unwrap();

        assert!(store.clear("s1"));
        assert!(!store.clear("s1"));
        assert!(!store.clear("never-existed"));
        assert!(store.history("s1").is_empty());
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::new();
        store.get_or_create("a");
        store.get_or_create("b");

        store.append("a", ConversationTurn::user("for a")).unwrap();

        assert_eq!(store.history("a").len(), 1);
        assert!(store.history("b").is_empty());

        store.clear("a");
        assert_eq!(
            store.list_active(),
            BTreeSet::from(["b".to_string()])
        );
    }

    #[test]
    fn test_list_active_is_stable_without_writes() {
        let store = SessionStore::new();
        store.get_or_create("x");
        store.get_or_create("y");

        assert_eq!(store.list_active(), store.list_active());
    }

    #[test]
    fn test_concurrent_sessions_do_not_corrupt_each_other() {
        let store = Arc::new(SessionStore::new());

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let id = format!("session-{n}");
                    store.get_or_create(&id);
                    for i in 0..50 {
                        store
                            .append(&id, ConversationTurn::user(format!("{n}-{i}")))
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 8);
        for n in 0..8 {
            let history = store.history(&format!("session-{n}"));
            assert_eq!(history.len(), 50);
            assert!(history.iter().all(|t| t.text.starts_with(&format!("{n}-"))));
        }
    }
}
