//! Authenticated HTTP access to the admin backend.

mod client;

pub use client::{ApiClient, ApiClientBuilder};

use serde::Deserialize;

/// How requests prove the session.
///
/// A client speaks exactly one scheme for its whole lifetime.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
  /// `Authorization: Token <value>` from the stored session token
  #[default]
  Token,
  /// Cookie session plus an `X-CSRFToken` header
  Csrf,
}
