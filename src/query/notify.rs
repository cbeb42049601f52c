//! User-visible notifications raised by mutations.

use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Success,
  Info,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub level: Level,
  pub content: String,
}

impl Notification {
  pub fn success(content: impl Into<String>) -> Self {
    Self {
      level: Level::Success,
      content: content.into(),
    }
  }

  pub fn info(content: impl Into<String>) -> Self {
    Self {
      level: Level::Info,
      content: content.into(),
    }
  }

  pub fn error(content: impl Into<String>) -> Self {
    Self {
      level: Level::Error,
      content: content.into(),
    }
  }
}

/// Displays notifications to the user.
pub trait Notifier: Send + Sync {
  fn notify(&self, notification: Notification);
}

/// Writes notifications to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
  fn notify(&self, notification: Notification) {
    match notification.level {
      Level::Error => error!(content = %notification.content, "Notification"),
      _ => info!(level = ?notification.level, content = %notification.content, "Notification"),
    }
  }
}

/// Forwards notifications to a receiver, e.g. a UI event loop.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
  pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self { tx }, rx)
  }
}

impl Notifier for ChannelNotifier {
  fn notify(&self, notification: Notification) {
    // Ignore send errors - receiver may have been dropped
    let _ = self.tx.send(notification);
  }
}
