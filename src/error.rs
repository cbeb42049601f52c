//! Error taxonomy for backend calls.
//!
//! Every failed request becomes an [`ApiError`] whose [`ApiErrorKind`] decides
//! whether the session survives it. The split is total: a kind is either
//! session-fatal or passed through to the caller untouched.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Shown when neither the response nor the transport gave us anything better.
pub const FALLBACK_MESSAGE: &str = "An unexpected error occurred.";

/// Broad class of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
  /// Rejected input (400, 422)
  Validation,
  /// Missing or expired credential (401)
  Authentication,
  /// Authenticated but not allowed (403)
  Authorization,
  /// 404
  NotFound,
  /// No response at all: refused, reset, DNS failure
  Network,
  /// Request took longer than the configured timeout
  Timeout,
  /// 5xx
  Server,
  /// Anything else, including undecodable bodies
  Unknown,
}

impl ApiErrorKind {
  pub fn from_status(status: StatusCode) -> Self {
    match status.as_u16() {
      400 | 422 => Self::Validation,
      401 => Self::Authentication,
      403 => Self::Authorization,
      404 => Self::NotFound,
      500..=599 => Self::Server,
      _ => Self::Unknown,
    }
  }

  /// Kinds that end the session and send the user back to login.
  pub fn is_session_fatal(self) -> bool {
    matches!(
      self,
      Self::Authentication | Self::Network | Self::Timeout | Self::Server
    )
  }
}

/// A failed backend call.
///
/// Cheap to clone so that a single failure can be fanned out to every caller
/// awaiting a shared request.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
  pub kind: ApiErrorKind,
  pub message: String,
  pub status: Option<u16>,
  pub body: Option<Value>,
}

impl ApiError {
  pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
    Self {
      kind,
      message: message.into(),
      status: None,
      body: None,
    }
  }

  /// Build an error from a non-2xx response.
  pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
    let body = serde_json::from_slice::<Value>(body).ok();
    Self {
      kind: ApiErrorKind::from_status(status),
      message: format!("Request failed with status code {}", status.as_u16()),
      status: Some(status.as_u16()),
      body,
    }
  }

  /// Build an error from a transport failure, where no usable response exists.
  pub fn from_transport(err: &reqwest::Error) -> Self {
    let kind = if err.is_timeout() {
      ApiErrorKind::Timeout
    } else if err.is_decode() || err.is_builder() {
      ApiErrorKind::Unknown
    } else {
      ApiErrorKind::Network
    };

    Self {
      kind,
      message: err.to_string(),
      status: err.status().map(|s| s.as_u16()),
      body: None,
    }
  }

  pub fn decode(err: serde_json::Error) -> Self {
    Self::new(
      ApiErrorKind::Unknown,
      format!("Failed to decode response: {}", err),
    )
  }

  pub fn unexpected_status(status: StatusCode) -> Self {
    Self {
      status: Some(status.as_u16()),
      ..Self::new(
        ApiErrorKind::Unknown,
        format!("Unexpected status code: {}", status.as_u16()),
      )
    }
  }

  pub fn is_session_fatal(&self) -> bool {
    self.kind.is_session_fatal()
  }

  /// The most specific human-readable explanation available.
  ///
  /// Resolution order: `detail` field, first `non_field_errors` entry, first
  /// element of an array body, then the error's own message.
  pub fn user_message(&self) -> String {
    self
      .body
      .as_ref()
      .and_then(body_message)
      .or_else(|| (!self.message.is_empty()).then(|| self.message.clone()))
      .unwrap_or_else(|| FALLBACK_MESSAGE.to_string())
  }
}

fn body_message(body: &Value) -> Option<String> {
  if let Some(detail) = body.get("detail") {
    return Some(value_text(detail));
  }

  if let Some(first) = body
    .get("non_field_errors")
    .and_then(Value::as_array)
    .and_then(|errors| errors.first())
  {
    return Some(value_text(first));
  }

  body.as_array().and_then(|items| items.first()).map(value_text)
}

fn value_text(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

/// Failures of the durable session store.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("session database error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("failed to prepare session directory: {0}")]
  Io(#[from] std::io::Error),

  #[error("could not determine data directory")]
  NoDataDir,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_status_classification() {
    assert_eq!(
      ApiErrorKind::from_status(StatusCode::UNAUTHORIZED),
      ApiErrorKind::Authentication
    );
    assert_eq!(
      ApiErrorKind::from_status(StatusCode::FORBIDDEN),
      ApiErrorKind::Authorization
    );
    assert_eq!(
      ApiErrorKind::from_status(StatusCode::NOT_FOUND),
      ApiErrorKind::NotFound
    );
    assert_eq!(
      ApiErrorKind::from_status(StatusCode::BAD_REQUEST),
      ApiErrorKind::Validation
    );
    assert_eq!(
      ApiErrorKind::from_status(StatusCode::BAD_GATEWAY),
      ApiErrorKind::Server
    );
    assert_eq!(
      ApiErrorKind::from_status(StatusCode::CONFLICT),
      ApiErrorKind::Unknown
    );
  }

  #[test]
  fn test_session_fatal_split() {
    let fatal = [
      ApiErrorKind::Authentication,
      ApiErrorKind::Network,
      ApiErrorKind::Timeout,
      ApiErrorKind::Server,
    ];
    let passed = [
      ApiErrorKind::Validation,
      ApiErrorKind::Authorization,
      ApiErrorKind::NotFound,
      ApiErrorKind::Unknown,
    ];

    assert!(fatal.iter().all(|k| k.is_session_fatal()));
    assert!(passed.iter().all(|k| !k.is_session_fatal()));
  }

  #[test]
  fn test_user_message_prefers_detail() {
    let err = ApiError::from_response(
      StatusCode::BAD_REQUEST,
      json!({"detail": "Invalid page."}).to_string().as_bytes(),
    );
    assert_eq!(err.user_message(), "Invalid page.");
  }

  #[test]
  fn test_user_message_non_field_errors() {
    let err = ApiError::from_response(
      StatusCode::BAD_REQUEST,
      json!({"non_field_errors": ["Unable to log in with provided credentials."]})
        .to_string()
        .as_bytes(),
    );
    assert_eq!(
      err.user_message(),
      "Unable to log in with provided credentials."
    );
  }

  #[test]
  fn test_user_message_array_body() {
    let err = ApiError::from_response(
      StatusCode::BAD_REQUEST,
      json!(["Product has no offer id"]).to_string().as_bytes(),
    );
    assert_eq!(err.user_message(), "Product has no offer id");
  }

  #[test]
  fn test_user_message_falls_back_to_status_text() {
    let err = ApiError::from_response(StatusCode::NOT_FOUND, b"<html>gone</html>");
    assert!(err.body.is_none());
    assert_eq!(err.user_message(), "Request failed with status code 404");
  }

  #[test]
  fn test_user_message_generic_fallback() {
    let err = ApiError::new(ApiErrorKind::Unknown, "");
    assert_eq!(err.user_message(), FALLBACK_MESSAGE);
  }
}
