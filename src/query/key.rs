//! Typed cache keys.
//!
//! A key is a resource tag followed by an ordered list of primitive parts.
//! Invalidation works on prefixes, so every key under a tag can be expired
//! at once without knowing its parameters.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Top-level resource a cached entry belongs to; doubles as the
/// invalidation tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
  CurrentUser,
  CsrfToken,
  Organizations,
  Branches,
  Courses,
  CourseGroups,
  Attendance,
  Products,
  Orders,
  Logs,
  Dashboard,
}

impl Resource {
  pub fn tag(self) -> &'static str {
    match self {
      Self::CurrentUser => "currentUser",
      Self::CsrfToken => "csrfToken",
      Self::Organizations => "organizations",
      Self::Branches => "branches",
      Self::Courses => "courses",
      Self::CourseGroups => "course-groups",
      Self::Attendance => "attendance",
      Self::Products => "products",
      Self::Orders => "orders",
      Self::Logs => "logs",
      Self::Dashboard => "dashboard",
    }
  }
}

impl fmt::Display for Resource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.tag())
  }
}

/// One positional component of a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
  Str(String),
  Int(u64),
  Bool(bool),
  /// An optional parameter that was not given
  Absent,
}

impl From<&str> for KeyPart {
  fn from(value: &str) -> Self {
    Self::Str(value.to_string())
  }
}

impl From<String> for KeyPart {
  fn from(value: String) -> Self {
    Self::Str(value)
  }
}

impl From<u64> for KeyPart {
  fn from(value: u64) -> Self {
    Self::Int(value)
  }
}

impl From<u32> for KeyPart {
  fn from(value: u32) -> Self {
    Self::Int(value.into())
  }
}

impl From<bool> for KeyPart {
  fn from(value: bool) -> Self {
    Self::Bool(value)
  }
}

impl<T: Into<KeyPart>> From<Option<T>> for KeyPart {
  fn from(value: Option<T>) -> Self {
    value.map(Into::into).unwrap_or(Self::Absent)
  }
}

impl fmt::Display for KeyPart {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Str(s) => write!(f, "{:?}", s),
      Self::Int(n) => write!(f, "{}", n),
      Self::Bool(b) => write!(f, "{}", b),
      Self::Absent => write!(f, "-"),
    }
  }
}

/// Identifies one cached server response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
  resource: Resource,
  parts: Vec<KeyPart>,
}

impl QueryKey {
  pub fn new(resource: Resource) -> Self {
    Self {
      resource,
      parts: Vec::new(),
    }
  }

  /// Append a part.
  pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
    self.parts.push(part.into());
    self
  }

  /// Append a structured parameter record as a single canonical part.
  ///
  /// Records are flattened to compact JSON, so two records of the same type
  /// with equal fields always produce equal keys. A record that serializes
  /// to `null` (e.g. `None`) becomes [`KeyPart::Absent`].
  pub fn with_params<P: Serialize + ?Sized>(self, params: &P) -> Self {
    let part = match serde_json::to_value(params) {
      Ok(Value::Null) => KeyPart::Absent,
      Ok(value) => KeyPart::Str(value.to_string()),
      Err(_) => KeyPart::Absent,
    };
    self.with(part)
  }

  pub fn resource(&self) -> Resource {
    self.resource
  }

  pub fn parts(&self) -> &[KeyPart] {
    &self.parts
  }

  /// Whether `prefix` names this key or one of its ancestors.
  pub fn starts_with(&self, prefix: &QueryKey) -> bool {
    self.resource == prefix.resource && self.parts.starts_with(&prefix.parts)
  }
}

impl From<Resource> for QueryKey {
  fn from(resource: Resource) -> Self {
    Self::new(resource)
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[{}", self.resource)?;
    for part in &self.parts {
      write!(f, ", {}", part)?;
    }
    write!(f, "]")
  }
}
