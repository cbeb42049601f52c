//! Client-side session state.
//!
//! A [`Session`] owns the single credential of the running client. The
//! credential lives in memory for fast per-request reads and is mirrored to a
//! durable [`SessionStore`] so it survives restarts.

mod credential;
mod events;
mod store;

pub use credential::{CsrfResolver, SessionCookies};
pub use events::{LogoutReason, RedirectToLogin, SessionEvents, LOGIN_PATH};
pub use store::{
  MemorySessionStore, SessionStore, SqliteSessionStore, THEME_KEY, TOKEN_KEY, USER_ID_KEY,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

use crate::error::StoreError;

/// The signed-in state shared by every outbound request.
pub struct Session {
  store: Arc<dyn SessionStore>,
  token: RwLock<Option<String>>,
}

impl Session {
  /// Restore a session from the durable store.
  ///
  /// A store read failure starts the client signed out rather than failing.
  pub fn restore(store: Arc<dyn SessionStore>) -> Self {
    let token = match store.get(TOKEN_KEY) {
      Ok(token) => token,
      Err(e) => {
        warn!(error = %e, "Failed to read stored session, starting signed out");
        None
      }
    };

    Self {
      store,
      token: RwLock::new(token),
    }
  }

  /// A session with no persistence beyond the process.
  pub fn ephemeral() -> Self {
    Self::restore(Arc::new(MemorySessionStore::new()))
  }

  /// Snapshot of the current credential.
  pub fn token(&self) -> Option<String> {
    self
      .token
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  pub fn is_authenticated(&self) -> bool {
    self
      .token
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .is_some()
  }

  pub fn user_id(&self) -> Result<Option<String>, StoreError> {
    self.store.get(USER_ID_KEY)
  }

  /// Install a new credential, replacing any previous one.
  ///
  /// Nothing changes, in memory or on disk, unless both keys are stored.
  pub fn begin(&self, token: &str, user_id: &str) -> Result<(), StoreError> {
    let mut current = self.token.write().unwrap_or_else(PoisonError::into_inner);
    self
      .store
      .set_all(&[(TOKEN_KEY, token), (USER_ID_KEY, user_id)])?;
    *current = Some(token.to_string());
    debug!(user_id, "Session started");
    Ok(())
  }

  /// Destroy the credential and every persisted key.
  ///
  /// The in-memory credential is dropped even when the store fails.
  pub fn end(&self) -> Result<(), StoreError> {
    let mut current = self.token.write().unwrap_or_else(PoisonError::into_inner);
    *current = None;
    self.store.clear()
  }

  pub fn theme(&self) -> Theme {
    match self.store.get(THEME_KEY) {
      Ok(Some(value)) => value.parse().unwrap_or_default(),
      Ok(None) => Theme::default(),
      Err(e) => {
        warn!(error = %e, "Failed to read theme preference");
        Theme::default()
      }
    }
  }

  pub fn set_theme(&self, theme: Theme) -> Result<(), StoreError> {
    self.store.set(THEME_KEY, &theme.to_string())
  }

  /// Flip between light and dark, returning the new theme.
  pub fn toggle_theme(&self) -> Result<Theme, StoreError> {
    let next = self.theme().toggled();
    self.set_theme(next)?;
    Ok(next)
  }
}

/// Colour theme preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
  #[default]
  Light,
  Dark,
}

impl Theme {
  pub fn toggled(self) -> Self {
    match self {
      Self::Light => Self::Dark,
      Self::Dark => Self::Light,
    }
  }
}

impl fmt::Display for Theme {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Light => write!(f, "light"),
      Self::Dark => write!(f, "dark"),
    }
  }
}

impl std::str::FromStr for Theme {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "light" => Ok(Self::Light),
      "dark" => Ok(Self::Dark),
      other => Err(format!("unknown theme '{}'", other)),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_restore_reads_persisted_token() {
    let store = Arc::new(MemorySessionStore::new());
    store.set(TOKEN_KEY, "persisted").unwrap();

    let session = Session::restore(store);
    assert!(session.is_authenticated());
    assert_eq!(session.token().as_deref(), Some("persisted"));
  }

  #[test]
  fn test_begin_and_end() {
    let store = Arc::new(MemorySessionStore::new());
    let session = Session::restore(store.clone());
    assert!(!session.is_authenticated());

    session.begin("abc", "42").unwrap();
    assert_eq!(session.token().as_deref(), Some("abc"));
    assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("abc"));
    assert_eq!(session.user_id().unwrap().as_deref(), Some("42"));

    session.set_theme(Theme::Dark).unwrap();
    session.end().unwrap();

    assert!(!session.is_authenticated());
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
    assert_eq!(store.get(USER_ID_KEY).unwrap(), None);
    assert_eq!(store.get(THEME_KEY).unwrap(), None);
  }

  /// Memory store that cannot record a user id.
  struct NoUserIdStore(MemorySessionStore);

  impl SessionStore for NoUserIdStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
      self.0.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
      if key == USER_ID_KEY {
        return Err(StoreError::NoDataDir);
      }
      self.0.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
      self.0.remove(key)
    }

    fn clear(&self) -> Result<(), StoreError> {
      self.0.clear()
    }
  }

  #[test]
  fn test_failed_begin_keeps_previous_credential() {
    let store = Arc::new(NoUserIdStore(MemorySessionStore::new()));
    store.0.set(TOKEN_KEY, "old").unwrap();
    let session = Session::restore(store.clone());

    assert!(session.begin("new", "5").is_err());
    assert_eq!(session.token().as_deref(), Some("old"));
    assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("old"));

    // A restart restores the same credential
    assert_eq!(Session::restore(store).token().as_deref(), Some("old"));
  }

  #[test]
  fn test_toggle_theme() {
    let session = Session::ephemeral();
    assert_eq!(session.theme(), Theme::Light);
    assert_eq!(session.toggle_theme().unwrap(), Theme::Dark);
    assert_eq!(session.theme(), Theme::Dark);
    assert_eq!(session.toggle_theme().unwrap(), Theme::Light);
  }

  #[test]
  fn test_unknown_theme_falls_back_to_light() {
    let store = Arc::new(MemorySessionStore::new());
    store.set(THEME_KEY, "sepia").unwrap();
    assert_eq!(Session::restore(store).theme(), Theme::Light);
  }
}
