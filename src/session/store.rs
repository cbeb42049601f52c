//! Durable key-value storage for client-side session state.

use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

use crate::error::StoreError;

/// Key holding the session credential.
pub const TOKEN_KEY: &str = "token";
/// Key holding the id of the signed-in user.
pub const USER_ID_KEY: &str = "user_id";
/// Key holding the colour theme preference.
pub const THEME_KEY: &str = "theme";

/// Trait for session storage backends.
pub trait SessionStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

  fn remove(&self, key: &str) -> Result<(), StoreError>;

  /// Drop every stored key.
  fn clear(&self) -> Result<(), StoreError>;

  /// Write several keys so that either all of them land or none do.
  ///
  /// The default writes one key at a time and restores the previous values
  /// when a write fails.
  fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
    let mut previous = Vec::with_capacity(entries.len());
    for (key, _) in entries {
      previous.push((*key, self.get(key)?));
    }

    for (key, value) in entries {
      if let Err(e) = self.set(key, value) {
        for (key, old) in &previous {
          let restored = match old {
            Some(old) => self.set(key, old),
            None => self.remove(key),
          };
          if let Err(e) = restored {
            warn!(%key, error = %e, "Failed to roll back session key");
          }
        }
        return Err(e);
      }
    }
    Ok(())
  }
}

/// Store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
  entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl SessionStore for MemorySessionStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    Ok(self.entries().get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    self.entries().insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StoreError> {
    self.entries().remove(key);
    Ok(())
  }

  fn clear(&self) -> Result<(), StoreError> {
    self.entries().clear();
    Ok(())
  }
}

/// SQLite-based session storage.
pub struct SqliteSessionStore {
  conn: Mutex<Connection>,
}

impl SqliteSessionStore {
  /// Open the store at the default location.
  pub fn open() -> Result<Self, StoreError> {
    Self::open_at(&Self::default_path()?)
  }

  /// Open or create the store at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self, StoreError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;
    conn.execute_batch(SESSION_SCHEMA)?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf, StoreError> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or(StoreError::NoDataDir)?;

    Ok(data_dir.join("campus-admin").join("session.db"))
  }

  fn conn(&self) -> MutexGuard<'_, Connection> {
    self.conn.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

const SESSION_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS session_state (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl SessionStore for SqliteSessionStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    let value = self
      .conn()
      .query_row(
        "SELECT value FROM session_state WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()?;
    Ok(value)
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    self.conn().execute(
      "INSERT OR REPLACE INTO session_state (key, value, updated_at)
       VALUES (?, ?, datetime('now'))",
      params![key, value],
    )?;
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StoreError> {
    self
      .conn()
      .execute("DELETE FROM session_state WHERE key = ?", params![key])?;
    Ok(())
  }

  fn clear(&self) -> Result<(), StoreError> {
    self.conn().execute("DELETE FROM session_state", [])?;
    Ok(())
  }

  fn set_all(&self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
    let mut conn = self.conn();
    let tx = conn.transaction()?;
    for (key, value) in entries {
      tx.execute(
        "INSERT OR REPLACE INTO session_state (key, value, updated_at)
         VALUES (?, ?, datetime('now'))",
        params![key, value],
      )?;
    }
    tx.commit()?;
    Ok(())
  }
}
