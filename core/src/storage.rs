//! Key-value storage port and the per-user namespace on top of it.
//!
//! The store logic only ever sees `KeyValueStore`, so the same code runs
//! against the in-memory map (tests) or the SQLite-backed store (CLI).
//! Keys: a fixed `session` key holds the active user record; `user:{id}`
//! holds that user's serialized state. The prefix keeps the two key spaces
//! from ever colliding.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{Connection, params};

use crate::codec::{self, PersistedState, StoredState};
use crate::models::User;

pub const SESSION_KEY: &str = "session";

#[must_use]
pub fn user_data_key(user_id: &str) -> String {
    format!("user:{user_id}")
}

pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    map: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let map = self
            .map
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Ok(map.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self
            .map
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut map = self
            .map
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        map.remove(key);
        Ok(())
    }
}

/// SQLite-backed store: one `kv` table, full-row overwrite per write.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open store: {}", path.display()))?;
        let store = SqliteStore {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteStore {
            conn: Mutex::new(conn),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS kv (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
                );

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self
            .conn
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.execute(
            "INSERT INTO kv (key, value, updated_at)
             VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

// --- Namespace operations ---

/// Read the session record. Absent or corrupt both read as "no session".
pub fn load_session(store: &dyn KeyValueStore) -> Option<User> {
    let raw = store.get(SESSION_KEY).ok().flatten()?;
    serde_json::from_str(&raw).ok()
}

pub fn save_session(store: &dyn KeyValueStore, user: &User) -> Result<()> {
    let raw = serde_json::to_string(user).context("Failed to serialize session record")?;
    store.set(SESSION_KEY, &raw)
}

pub fn clear_session(store: &dyn KeyValueStore) -> Result<()> {
    store.remove(SESSION_KEY)
}

/// Load a user's persisted state. A never-seen user id gets an empty
/// default that is written back immediately, so the stored baseline always
/// matches what later saves will overwrite. Corrupt JSON degrades to the
/// same default.
pub fn load_user_data(store: &dyn KeyValueStore, user_id: &str) -> Result<PersistedState> {
    let key = user_data_key(user_id);
    if let Some(raw) = store.get(&key)? {
        if let Ok(stored) = serde_json::from_str::<StoredState>(&raw) {
            return Ok(codec::deserialize(stored));
        }
    }
    let state = PersistedState::default();
    save_user_data(store, user_id, &state)?;
    Ok(state)
}

/// Serialize and write the full state, overwriting prior content.
pub fn save_user_data(
    store: &dyn KeyValueStore,
    user_id: &str,
    state: &PersistedState,
) -> Result<()> {
    let stored = codec::serialize(state);
    let raw = serde_json::to_string(&stored).context("Failed to serialize user data")?;
    store.set(&user_data_key(user_id), &raw)
}
