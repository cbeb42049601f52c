use std::fmt;
use std::sync::{Mutex, PoisonError};
use tracing::warn;

use crate::error::{ApiError, ApiErrorKind};

/// Where a terminated session sends the user.
pub const LOGIN_PATH: &str = "/login";

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutReason {
  /// The backend rejected the credential (401)
  Unauthorized,
  /// The backend failed with a 5xx
  ServerError(u16),
  /// The backend could not be reached
  Unreachable,
  /// The request timed out
  TimedOut,
  /// The user asked to sign out
  UserRequested,
}

impl LogoutReason {
  /// Map a session-fatal error to the reason it ends the session.
  pub fn from_error(err: &ApiError) -> Option<Self> {
    match err.kind {
      ApiErrorKind::Authentication => Some(Self::Unauthorized),
      ApiErrorKind::Server => Some(Self::ServerError(err.status.unwrap_or(500))),
      ApiErrorKind::Network => Some(Self::Unreachable),
      ApiErrorKind::Timeout => Some(Self::TimedOut),
      _ => None,
    }
  }
}

impl fmt::Display for LogoutReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Unauthorized => write!(f, "credential rejected"),
      Self::ServerError(status) => write!(f, "server error {}", status),
      Self::Unreachable => write!(f, "backend unreachable"),
      Self::TimedOut => write!(f, "request timed out"),
      Self::UserRequested => write!(f, "signed out"),
    }
  }
}

/// Receives session lifecycle events from the HTTP client.
///
/// Handed to [`crate::http::ApiClient`] at construction; the client calls it
/// after it has already wiped the persisted session.
pub trait SessionEvents: Send + Sync {
  fn on_logout(&self, reason: LogoutReason);
}

impl<F> SessionEvents for F
where
  F: Fn(LogoutReason) + Send + Sync,
{
  fn on_logout(&self, reason: LogoutReason) {
    self(reason)
  }
}

/// Default handler: a hard redirect to the login page.
///
/// There is no page to navigate in a headless client, so the redirect is
/// recorded and logged; front ends read it back via [`Self::redirected_to`].
#[derive(Debug, Default)]
pub struct RedirectToLogin {
  target: Mutex<Option<String>>,
}

impl RedirectToLogin {
  pub fn new() -> Self {
    Self::default()
  }

  /// The page the last logout redirected to, if any.
  pub fn redirected_to(&self) -> Option<String> {
    self
      .target
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }
}

impl SessionEvents for RedirectToLogin {
  fn on_logout(&self, reason: LogoutReason) {
    warn!(%reason, "Session ended, redirecting to {}", LOGIN_PATH);
    *self.target.lock().unwrap_or_else(PoisonError::into_inner) = Some(LOGIN_PATH.to_string());
  }
}
