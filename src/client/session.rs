use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Minimal user projection kept alongside the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// A stored session: bearer token plus the user it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
}

/// Explicit session persistence for the client. Token and user projection are
/// stored and cleared together; `get` is the hydration point for a fresh
/// process.
pub trait SessionStore: Send + Sync {
    fn get(&self) -> Option<Session>;
    fn set(&self, session: &Session);
    fn clear(&self);
}

/// In-memory store for tests and short-lived tools.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self) -> Option<Session> {
        self.inner.lock().ok().and_then(|guard| guard.clone())
    }

    fn set(&self, session: &Session) {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = Some(session.clone());
        }
    }

    fn clear(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = None;
        }
    }
}

/// File-backed store: one JSON document at a fixed path, the desktop analogue
/// of browser local storage.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self) -> Option<Session> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&raw).ok()
    }

    fn set(&self, session: &Session) {
        let Ok(raw) = serde_json::to_string_pretty(session) else {
            return;
        };
        if let Some(dir) = self.path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        if let Err(e) = std::fs::write(&self.path, raw) {
            warn!(error = %e, path = %self.path.display(), "failed to persist session");
        }
    }

    fn clear(&self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(error = %e, path = %self.path.display(), "failed to clear session");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_session() -> Session {
        Session {
            token: "jwt-token".into(),
            user: SessionUser {
                id: Uuid::new_v4(),
                name: "A".into(),
                email: "a@x.com".into(),
            },
        }
    }

    #[test]
    fn memory_store_roundtrip_and_clear() {
        let store = MemorySessionStore::new();
        assert!(store.get().is_none());

        let session = sample_session();
        store.set(&session);
        assert_eq!(store.get(), Some(session));

        store.clear();
        assert!(store.get().is_none());
    }

    #[test]
    fn file_store_roundtrip_and_clear() {
        let path = std::env::temp_dir()
            .join("authmail-tests")
            .join(format!("session-{}.json", Uuid::new_v4()));
        let store = FileSessionStore::new(&path);
        assert!(store.get().is_none());

        let session = sample_session();
        store.set(&session);

        // A second store at the same path hydrates the same session.
        let rehydrated = FileSessionStore::new(&path);
        assert_eq!(rehydrated.get(), Some(session));

        store.clear();
        assert!(store.get().is_none());
        // Clearing an already-clear store is a no-op.
        store.clear();
    }

    #[test]
    fn file_store_ignores_garbage() {
        let path = std::env::temp_dir()
            .join("authmail-tests")
            .join(format!("garbage-{}.json", Uuid::new_v4()));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();

        let store = FileSessionStore::new(&path);
        assert!(store.get().is_none());
        store.clear();
    }
}
