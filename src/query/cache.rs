//! Shared in-memory cache of server responses.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::key::{QueryKey, Resource};
use crate::error::ApiError;

/// A cache hit, decoded to the caller's type.
#[derive(Debug, Clone)]
pub struct Cached<T> {
  pub data: T,
  pub fetched_at: Instant,
  /// Older than the stale time, or explicitly invalidated
  pub is_stale: bool,
  /// Changes whenever the entry is stored or invalidated
  pub generation: u64,
}

struct Entry {
  data: Value,
  fetched_at: Instant,
  invalidated: bool,
  generation: u64,
}

/// Cache shared by every query and mutation of a client.
///
/// Entries are stored as JSON and decoded on read, so one cache serves every
/// resource type. Cloning is cheap and clones share the same entries.
#[derive(Clone)]
pub struct QueryClient {
  entries: Arc<RwLock<HashMap<QueryKey, Entry>>>,
  generations: Arc<AtomicU64>,
  /// How long before cached data is considered stale
  stale_time: Duration,
}

impl Default for QueryClient {
  fn default() -> Self {
    Self::new()
  }
}

impl QueryClient {
  pub fn new() -> Self {
    Self {
      entries: Arc::new(RwLock::new(HashMap::new())),
      generations: Arc::new(AtomicU64::new(0)),
      stale_time: Duration::from_secs(60),
    }
  }

  /// Set the default stale time for cached data.
  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  pub fn stale_time(&self) -> Duration {
    self.stale_time
  }

  /// Look up `key`, judging staleness against `stale_time`.
  ///
  /// An entry that no longer decodes as `T` is treated as a miss.
  pub fn lookup<T: DeserializeOwned>(&self, key: &QueryKey, stale_time: Duration) -> Option<Cached<T>> {
    let entries = self.read();
    let entry = entries.get(key)?;

    match serde_json::from_value(entry.data.clone()) {
      Ok(data) => Some(Cached {
        data,
        fetched_at: entry.fetched_at,
        is_stale: entry.invalidated || entry.fetched_at.elapsed() > stale_time,
        generation: entry.generation,
      }),
      Err(e) => {
        warn!(%key, error = %e, "Cached entry has unexpected shape, ignoring");
        None
      }
    }
  }

  /// Look up `key` with the default stale time.
  pub fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<Cached<T>> {
    self.lookup(key, self.stale_time)
  }

  /// Store fresh data for `key`.
  pub fn store<T: Serialize>(&self, key: &QueryKey, data: &T) -> Result<(), ApiError> {
    let data = serde_json::to_value(data).map_err(ApiError::decode)?;
    let generation = self.next_generation();
    self.write().insert(
      key.clone(),
      Entry {
        data,
        fetched_at: Instant::now(),
        invalidated: false,
        generation,
      },
    );
    Ok(())
  }

  /// Generation of the entry under `key`, if any.
  pub fn generation(&self, key: &QueryKey) -> Option<u64> {
    self.read().get(key).map(|entry| entry.generation)
  }

  pub fn contains(&self, key: &QueryKey) -> bool {
    self.read().contains_key(key)
  }

  /// Whether `key` needs a fetch: missing, invalidated, or too old.
  pub fn is_stale(&self, key: &QueryKey) -> bool {
    self
      .read()
      .get(key)
      .map(|entry| entry.invalidated || entry.fetched_at.elapsed() > self.stale_time)
      .unwrap_or(true)
  }

  /// Mark every entry under `tag` stale. Returns how many were marked.
  pub fn invalidate(&self, tag: Resource) -> usize {
    self.invalidate_prefix(&QueryKey::new(tag))
  }

  /// Mark every entry whose key starts with `prefix` stale.
  pub fn invalidate_prefix(&self, prefix: &QueryKey) -> usize {
    let mut entries = self.write();
    let mut marked = 0;
    for (key, entry) in entries.iter_mut() {
      if key.starts_with(prefix) {
        entry.invalidated = true;
        entry.generation = self.next_generation();
        marked += 1;
      }
    }
    debug!(%prefix, marked, "Invalidated cache entries");
    marked
  }

  pub fn remove(&self, key: &QueryKey) {
    self.write().remove(key);
  }

  /// Drop everything, e.g. after the session ends.
  pub fn clear(&self) {
    self.write().clear();
  }

  pub fn len(&self) -> usize {
    self.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.read().is_empty()
  }

  fn next_generation(&self) -> u64 {
    self.generations.fetch_add(1, Ordering::Relaxed) + 1
  }

  fn read(&self) -> RwLockReadGuard<'_, HashMap<QueryKey, Entry>> {
    self.entries.read().unwrap_or_else(PoisonError::into_inner)
  }

  fn write(&self) -> RwLockWriteGuard<'_, HashMap<QueryKey, Entry>> {
    self.entries.write().unwrap_or_else(PoisonError::into_inner)
  }
}
