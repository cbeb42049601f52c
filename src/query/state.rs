use crate::error::ApiError;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started, or is disabled
  Idle,
  /// Query is fetching and has no data to show yet
  Loading,
  /// Query has data (possibly stale while a refetch runs)
  Success(T),
  /// Query failed with an error
  Error(ApiError),
}

impl<T> QueryState<T> {
  pub fn is_idle(&self) -> bool {
    matches!(self, QueryState::Idle)
  }

  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&ApiError> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

/// The state of one mutation call.
///
/// `Success` and `Error` are terminal.
#[derive(Debug, Clone)]
pub enum MutationState<T> {
  Idle,
  Pending,
  Success(T),
  Error(ApiError),
}

impl<T> MutationState<T> {
  pub fn is_pending(&self) -> bool {
    matches!(self, MutationState::Pending)
  }

  pub fn is_settled(&self) -> bool {
    matches!(self, MutationState::Success(_) | MutationState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      MutationState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&ApiError> {
    match self {
      MutationState::Error(e) => Some(e),
      _ => None,
    }
  }
}
