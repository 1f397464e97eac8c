//! Backend database: users and their chat history.
//!
//! Only auth records and chat messages are server-side; all other domain
//! data lives in the client's own storage namespace.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::models::MessageRole;

#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct ChatRecord {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: String,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    id TEXT PRIMARY KEY NOT NULL,
                    name TEXT NOT NULL,
                    email TEXT NOT NULL COLLATE NOCASE UNIQUE,
                    password_hash TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS chat_history (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT NOT NULL,
                    role TEXT NOT NULL,
                    content TEXT NOT NULL,
                    timestamp TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
                CREATE INDEX IF NOT EXISTS idx_chat_history_user ON chat_history(user_id, timestamp);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<UserRecord> {
        Ok(UserRecord {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    // --- Users ---

    pub fn email_exists(&self, email: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1 COLLATE NOCASE",
            params![email],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Insert a new user. The caller supplies an already-hashed password;
    /// cleartext never reaches this layer.
    pub fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<UserRecord> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        self.conn.execute(
            "INSERT INTO users (id, name, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, name, email, password_hash, now],
        )?;
        Ok(UserRecord {
            id,
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, email, password_hash, created_at
             FROM users WHERE email = ?1 COLLATE NOCASE",
        )?;
        let mut rows = stmt.query(params![email])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::user_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::user_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    // --- Chat history (append-only) ---

    /// Append a message, stamped with server receipt time. Concurrent
    /// appends for one user order by receipt, not client-supplied time.
    pub fn append_chat_message(
        &self,
        user_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ChatRecord> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        self.conn.execute(
            "INSERT INTO chat_history (user_id, role, content, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, role.as_str(), content, now],
        )?;
        Ok(ChatRecord {
            role,
            content: content.to_string(),
            timestamp: now,
        })
    }

    /// All messages for a user, ascending by time (receipt order breaks
    /// same-second ties). Unknown users get an empty list, never an error.
    pub fn list_chat_messages(&self, user_id: &str) -> Result<Vec<ChatRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT role, content, timestamp FROM chat_history
             WHERE user_id = ?1
             ORDER BY timestamp ASC, id ASC",
        )?;
        let messages = stmt
            .query_map(params![user_id], |row| {
                let role: String = row.get(0)?;
                Ok(ChatRecord {
                    role: if role == "assistant" {
                        MessageRole::Assistant
                    } else {
                        MessageRole::User
                    },
                    content: row.get(1)?,
                    timestamp: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }
}
