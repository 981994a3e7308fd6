//! Session abstraction and in-memory store.
//!
//! Sessions carry string values plus a flash bag (messages consumed on
//! first read). The store hands out detached [`Session`] snapshots;
//! mutations become visible to other readers only after [`SessionStore::save`].

use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

pub const DEFAULT_SESSION_COOKIE: &str = "app_session";

/// A detached session snapshot.
#[derive(Clone, Debug, Default)]
pub struct Session {
    id: String,
    values: HashMap<String, String>,
    flashes: HashMap<String, Vec<String>>,
}

impl Session {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: HashMap::new(),
            flashes: HashMap::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    /// Queue a flash message under a kind (`"success"`, `"error"`, ...).
    pub fn add_flash(&mut self, kind: impl Into<String>, message: impl Into<String>) {
        self.flashes.entry(kind.into()).or_default().push(message.into());
    }

    /// Drain the flash messages of a kind.
    pub fn take_flashes(&mut self, kind: &str) -> Vec<String> {
        self.flashes.remove(kind).unwrap_or_default()
    }

    #[must_use]
    pub fn peek_flashes(&self, kind: &str) -> &[String] {
        self.flashes.get(kind).map_or(&[], Vec::as_slice)
    }
}

/// Server-side session storage.
pub trait SessionStore: Send + Sync {
    /// Create a fresh session with a new id (not yet persisted).
    fn create(&self) -> Session;

    /// Load a persisted session by id.
    fn load(&self, id: &str) -> Option<Session>;

    /// Persist the session state under its id.
    fn save(&self, session: &Session);

    /// Drop a persisted session.
    fn invalidate(&self, id: &str);

    /// Name of the cookie carrying the session id.
    fn cookie_name(&self) -> &str {
        DEFAULT_SESSION_COOKIE
    }
}

/// In-memory store, suitable for tests and single-process deployments.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl SessionStore for MemorySessionStore {
    fn create(&self) -> Session {
        Session::new(Uuid::new_v4().to_string())
    }

    fn load(&self, id: &str) -> Option<Session> {
        self.sessions.read().get(id).cloned()
    }

    fn save(&self, session: &Session) {
        self.sessions
            .write()
            .insert(session.id().to_owned(), session.clone());
    }

    fn invalidate(&self, id: &str) {
        self.sessions.write().remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn created_sessions_are_not_persisted_until_saved() {
        let store = MemorySessionStore::new();
        let session = store.create();

        assert!(store.load(session.id()).is_none());

        store.save(&session);
        assert!(store.load(session.id()).is_some());
    }

    #[test]
    fn values_round_trip_through_save_and_load() {
        let store = MemorySessionStore::new();
        let mut session = store.create();
        session.set("_security_main", "token-payload");
        store.save(&session);

        let loaded = store.load(session.id()).unwrap();
        assert_eq!(loaded.get("_security_main"), Some("token-payload"));
        assert_eq!(loaded.get("missing"), None);
    }

    #[test]
    fn flashes_are_drained_on_take() {
        let mut session = Session::new("s1");
        session.add_flash("success", "saved");
        session.add_flash("success", "sent");
        session.add_flash("error", "boom");

        assert_eq!(session.peek_flashes("success").len(), 2);
        assert_eq!(session.take_flashes("success"), vec!["saved", "sent"]);
        assert!(session.take_flashes("success").is_empty());
        assert_eq!(session.take_flashes("error"), vec!["boom"]);
    }

    #[test]
    fn invalidate_removes_the_session() {
        let store = MemorySessionStore::new();
        let session = store.create();
        store.save(&session);

        store.invalidate(session.id());
        assert!(store.load(session.id()).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn session_ids_are_unique() {
        let store = MemorySessionStore::new();
        assert_ne!(store.create().id(), store.create().id());
    }
}
