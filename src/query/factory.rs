//! Bound query accessors over the shared cache.
//!
//! Inspired by TanStack Query: a [`Query<T>`] ties a cache key to the
//! function that fetches it. Observing the query returns whatever the cache
//! holds and starts a background fetch when the entry is missing or stale.
//!
//! # Example
//!
//! ```ignore
//! let api = client.clone();
//! let mut query = create_query(
//!     &cache,
//!     QueryKey::new(Resource::Products).with("list"),
//!     move || {
//!         let api = api.clone();
//!         async move { api.get("/products/").await }
//!     },
//!     QueryOptions::default(),
//! );
//!
//! // In event loop tick
//! match query.observe() {
//!     QueryState::Loading => render_spinner(),
//!     QueryState::Success(data) => render_data(data),
//!     QueryState::Error(e) => render_error(e),
//!     QueryState::Idle => {}
//! }
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::cache::QueryClient;
use super::key::QueryKey;
use super::state::QueryState;
use crate::error::{ApiError, ApiErrorKind};

/// A boxed future that returns a Result<T, ApiError>
pub(crate) type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send>>;

/// A factory function that creates futures for fetching data
type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Per-query behaviour.
#[derive(Debug, Clone)]
pub struct QueryOptions {
  /// When false the query never fetches and stays `Idle`
  pub enabled: bool,
  /// Overrides the cache's default stale time
  pub stale_time: Option<Duration>,
}

impl Default for QueryOptions {
  fn default() -> Self {
    Self {
      enabled: true,
      stale_time: None,
    }
  }
}

impl QueryOptions {
  /// Fetch only once `enabled` holds, e.g. when a required id is known.
  pub fn enabled(enabled: bool) -> Self {
    Self {
      enabled,
      ..Self::default()
    }
  }

  pub fn with_stale_time(mut self, duration: Duration) -> Self {
    self.stale_time = Some(duration);
    self
  }
}

/// Build a query bound to `key` in `client`.
///
/// The fetcher is called each time the query decides a fetch is due.
pub fn create_query<T, F, Fut>(
  client: &QueryClient,
  key: QueryKey,
  fetcher: F,
  options: QueryOptions,
) -> Query<T>
where
  T: Serialize + DeserializeOwned + Clone + Send + 'static,
  F: Fn() -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
  Query {
    key,
    client: client.clone(),
    fetcher: Box::new(move || Box::pin(fetcher())),
    options,
    state: QueryState::Idle,
    receiver: None,
    failed_generation: None,
  }
}

/// Async query with state management over a shared cache entry.
pub struct Query<T> {
  key: QueryKey,
  client: QueryClient,
  fetcher: FetcherFn<T>,
  options: QueryOptions,
  state: QueryState<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, ApiError>>>,
  /// Cache generation a refresh last failed against
  failed_generation: Option<u64>,
}

impl<T> Query<T>
where
  T: Serialize + DeserializeOwned + Clone + Send + 'static,
{
  pub fn key(&self) -> &QueryKey {
    &self.key
  }

  /// Get the current state without triggering anything.
  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  pub fn is_enabled(&self) -> bool {
    self.options.enabled
  }

  /// Flip the conditional-fetch guard.
  pub fn set_enabled(&mut self, enabled: bool) {
    self.options.enabled = enabled;
  }

  /// Whether a background fetch is in flight.
  pub fn is_fetching(&self) -> bool {
    self.receiver.is_some()
  }

  /// Current state, starting a background fetch if one is due.
  ///
  /// A fetch is due when the query is enabled, nothing is in flight, and the
  /// cache entry is missing or stale. Cached data is returned while it is
  /// being refreshed. A failed fetch is not retried on its own: the error
  /// stays visible until the entry is stored or invalidated again, or
  /// [`Self::refetch`] is called.
  pub fn observe(&mut self) -> &QueryState<T> {
    self.poll();

    if !self.options.enabled {
      return &self.state;
    }

    match self.client.lookup::<T>(&self.key, self.stale_time()) {
      Some(cached) if self.failed_generation == Some(cached.generation) => {}
      Some(cached) => {
        let is_stale = cached.is_stale;
        self.failed_generation = None;
        self.state = QueryState::Success(cached.data);
        if is_stale && !self.is_fetching() {
          debug!(key = %self.key, "Cached entry is stale, refetching");
          self.start_fetch();
        }
      }
      None => {
        if !self.is_fetching() && !self.state.is_error() {
          self.start_fetch();
          self.state = QueryState::Loading;
        }
      }
    }

    &self.state
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived or error occurred).
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    // Try to receive without blocking
    match receiver.try_recv() {
      Ok(result) => {
        self.receiver = None;
        self.settle(result);
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending - treat as error
        self.receiver = None;
        self.settle(Err(ApiError::new(
          ApiErrorKind::Unknown,
          "Query was cancelled",
        )));
        true
      }
    }
  }

  /// Force a fetch, abandoning any in-flight one.
  pub fn refetch(&mut self) {
    if !self.options.enabled {
      return;
    }
    // The abandoned task still runs; its result is discarded
    self.receiver = None;
    self.failed_generation = None;
    self.start_fetch();
    if self.state.data().is_none() {
      self.state = QueryState::Loading;
    }
  }

  /// Fetch-or-read for callers without an event loop.
  ///
  /// Returns `Ok(None)` for a disabled query.
  pub async fn load(&mut self) -> Result<Option<T>, ApiError> {
    if !self.options.enabled {
      return Ok(None);
    }

    if let Some(cached) = self.client.lookup::<T>(&self.key, self.stale_time()) {
      if !cached.is_stale {
        self.state = QueryState::Success(cached.data.clone());
        return Ok(Some(cached.data));
      }
    }

    self.receiver = None;
    let result = (self.fetcher)().await;
    self.settle(result.clone());
    result.map(Some)
  }

  fn stale_time(&self) -> Duration {
    self
      .options
      .stale_time
      .unwrap_or_else(|| self.client.stale_time())
  }

  fn settle(&mut self, result: Result<T, ApiError>) {
    match result {
      Ok(data) => {
        if let Err(e) = self.client.store(&self.key, &data) {
          warn!(key = %self.key, error = %e, "Failed to cache query result");
        }
        self.failed_generation = None;
        self.state = QueryState::Success(data);
      }
      Err(error) => {
        debug!(key = %self.key, error = %error, "Query failed");
        self.failed_generation = self.client.generation(&self.key);
        self.state = QueryState::Error(error);
      }
    }
  }

  /// Internal: start the fetch operation
  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);

    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .field("state", &self.state)
      .field("options", &self.options)
      .finish_non_exhaustive()
  }
}
