//! Mutations: run a write, then expire related cache entries and tell the
//! user how it went.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use super::cache::QueryClient;
use super::factory::BoxFuture;
use super::key::Resource;
use super::notify::{Notification, Notifier};
use super::state::MutationState;
use crate::error::{ApiError, ApiErrorKind};

/// Notification text, fixed or derived from the outcome.
pub enum Message<T: ?Sized> {
  Static(String),
  Computed(Arc<dyn Fn(&T) -> String + Send + Sync>),
}

impl<T: ?Sized> Message<T> {
  pub fn computed<F>(f: F) -> Self
  where
    F: Fn(&T) -> String + Send + Sync + 'static,
  {
    Self::Computed(Arc::new(f))
  }

  pub fn render(&self, value: &T) -> String {
    match self {
      Self::Static(text) => text.clone(),
      Self::Computed(f) => f(value),
    }
  }
}

impl<T: ?Sized> Clone for Message<T> {
  fn clone(&self) -> Self {
    match self {
      Self::Static(text) => Self::Static(text.clone()),
      Self::Computed(f) => Self::Computed(Arc::clone(f)),
    }
  }
}

impl<T: ?Sized> From<&str> for Message<T> {
  fn from(text: &str) -> Self {
    Self::Static(text.to_string())
  }
}

impl<T: ?Sized> From<String> for Message<T> {
  fn from(text: String) -> Self {
    Self::Static(text)
  }
}

type MutationFn<T, V> = Arc<dyn Fn(V) -> BoxFuture<T> + Send + Sync>;
type SuccessCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct MutationInner<T, V> {
  fetcher: MutationFn<T, V>,
  invalidates: Vec<Resource>,
  success_message: Option<Message<T>>,
  error_message: Option<Message<ApiError>>,
  on_success: Option<SuccessCallback<T>>,
  client: QueryClient,
  notifier: Arc<dyn Notifier>,
}

/// Start describing a mutation that runs `fetcher`.
pub fn create_mutation<T, V, F, Fut>(
  client: &QueryClient,
  notifier: Arc<dyn Notifier>,
  fetcher: F,
) -> MutationBuilder<T, V>
where
  F: Fn(V) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
{
  MutationBuilder {
    inner: MutationInner {
      fetcher: Arc::new(move |vars| Box::pin(fetcher(vars))),
      invalidates: Vec::new(),
      success_message: None,
      error_message: None,
      on_success: None,
      client: client.clone(),
      notifier,
    },
  }
}

pub struct MutationBuilder<T, V> {
  inner: MutationInner<T, V>,
}

impl<T, V> MutationBuilder<T, V> {
  /// Expire every cache entry under `tag` after a success.
  pub fn invalidates(mut self, tag: Resource) -> Self {
    self.inner.invalidates.push(tag);
    self
  }

  pub fn success_message(mut self, message: impl Into<Message<T>>) -> Self {
    self.inner.success_message = Some(message.into());
    self
  }

  pub fn error_message(mut self, message: impl Into<Message<ApiError>>) -> Self {
    self.inner.error_message = Some(message.into());
    self
  }

  /// Side effect run after invalidation and the success notification.
  pub fn on_success<F>(mut self, f: F) -> Self
  where
    F: Fn(&T) + Send + Sync + 'static,
  {
    self.inner.on_success = Some(Arc::new(f));
    self
  }

  pub fn build(self) -> Mutation<T, V> {
    Mutation {
      inner: Arc::new(self.inner),
    }
  }
}

/// Bound executor for one kind of write.
///
/// Every call is independent: no queueing, no retry.
pub struct Mutation<T, V> {
  inner: Arc<MutationInner<T, V>>,
}

impl<T, V> Clone for Mutation<T, V> {
  fn clone(&self) -> Self {
    Self {
      inner: Arc::clone(&self.inner),
    }
  }
}

impl<T, V> Mutation<T, V>
where
  T: Send + 'static,
  V: Send + 'static,
{
  /// Tags this mutation expires on success.
  pub fn invalidates(&self) -> &[Resource] {
    &self.inner.invalidates
  }

  /// Run the mutation to completion.
  pub async fn execute(&self, vars: V) -> Result<T, ApiError> {
    run(&self.inner, vars).await
  }

  /// Run the mutation in the background; poll the handle for the outcome.
  pub fn spawn(&self, vars: V) -> PendingMutation<T> {
    let (tx, rx) = mpsc::unbounded_channel();
    let inner = Arc::clone(&self.inner);
    tokio::spawn(async move {
      let result = run(&inner, vars).await;
      // Ignore send errors - the handle may have been dropped
      let _ = tx.send(result);
    });

    PendingMutation {
      state: MutationState::Pending,
      receiver: Some(rx),
    }
  }
}

async fn run<T, V>(inner: &MutationInner<T, V>, vars: V) -> Result<T, ApiError> {
  debug!(invalidates = ?inner.invalidates, "Mutation pending");

  match (inner.fetcher)(vars).await {
    Ok(data) => {
      for tag in &inner.invalidates {
        inner.client.invalidate(*tag);
      }
      if let Some(message) = &inner.success_message {
        inner
          .notifier
          .notify(Notification::success(message.render(&data)));
      }
      if let Some(callback) = &inner.on_success {
        callback(&data);
      }
      Ok(data)
    }
    Err(error) => {
      debug!(error = %error, "Mutation failed");
      if let Some(message) = &inner.error_message {
        inner
          .notifier
          .notify(Notification::error(message.render(&error)));
      }
      Err(error)
    }
  }
}

/// Handle to one spawned mutation call.
pub struct PendingMutation<T> {
  state: MutationState<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, ApiError>>>,
}

impl<T> PendingMutation<T> {
  pub fn state(&self) -> &MutationState<T> {
    &self.state
  }

  /// Returns `true` when the call just settled.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    let result = match receiver.try_recv() {
      Ok(result) => result,
      Err(mpsc::error::TryRecvError::Empty) => return false,
      Err(mpsc::error::TryRecvError::Disconnected) => Err(ApiError::new(
        ApiErrorKind::Unknown,
        "Mutation was cancelled",
      )),
    };

    self.receiver = None;
    self.state = match result {
      Ok(data) => MutationState::Success(data),
      Err(error) => MutationState::Error(error),
    };
    true
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::query::key::QueryKey;
  use crate::query::notify::{ChannelNotifier, Level};
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::time::Duration;

  fn seeded_cache() -> (QueryClient, QueryKey, QueryKey, QueryKey) {
    let cache = QueryClient::new();
    let list = QueryKey::new(Resource::Products).with("list").with(1u32);
    let detail = QueryKey::new(Resource::Products).with("detail").with("p1");
    let orders = QueryKey::new(Resource::Orders).with("list");
    for key in [&list, &detail, &orders] {
      cache.store(key, &0).unwrap();
    }
    (cache, list, detail, orders)
  }

  #[tokio::test]
  async fn test_success_invalidates_notifies_and_calls_back() {
    let (cache, list, detail, orders) = seeded_cache();
    let (notifier, mut rx) = ChannelNotifier::new();
    let callbacks = Arc::new(AtomicU32::new(0));
    let seen = callbacks.clone();

    let mutation = create_mutation(&cache, Arc::new(notifier), |n: u32| async move {
      Ok::<_, ApiError>(n * 2)
    })
    .invalidates(Resource::Products)
    .success_message(Message::computed(|n: &u32| format!("Doubled to {}", n)))
    .error_message("never shown")
    .on_success(move |n| {
      seen.store(*n, Ordering::SeqCst);
    })
    .build();

    assert_eq!(mutation.execute(21).await.unwrap(), 42);

    assert!(cache.is_stale(&list));
    assert!(cache.is_stale(&detail));
    assert!(!cache.is_stale(&orders));

    let note = rx.try_recv().unwrap();
    assert_eq!(note.level, Level::Success);
    assert_eq!(note.content, "Doubled to 42");
    assert!(rx.try_recv().is_err());
    assert_eq!(callbacks.load(Ordering::SeqCst), 42);
  }

  #[tokio::test]
  async fn test_failure_notifies_without_invalidating() {
    let (cache, list, _, _) = seeded_cache();
    let (notifier, mut rx) = ChannelNotifier::new();
    let callbacks = Arc::new(AtomicU32::new(0));
    let seen = callbacks.clone();

    let mutation = create_mutation(&cache, Arc::new(notifier), |_: ()| async {
      Err::<u32, _>(ApiError::new(ApiErrorKind::Validation, "min_price too low"))
    })
    .invalidates(Resource::Products)
    .success_message("never shown")
    .error_message(Message::computed(|e: &ApiError| {
      format!("Update failed: {}", e.user_message())
    }))
    .on_success(move |_| {
      seen.fetch_add(1, Ordering::SeqCst);
    })
    .build();

    let err = mutation.execute(()).await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Validation);

    assert!(!cache.is_stale(&list));
    let note = rx.try_recv().unwrap();
    assert_eq!(note.level, Level::Error);
    assert_eq!(note.content, "Update failed: min_price too low");
    assert_eq!(callbacks.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_no_messages_configured_stays_silent() {
    let (cache, _, _, _) = seeded_cache();
    let (notifier, mut rx) = ChannelNotifier::new();
    let mutation = create_mutation(&cache, Arc::new(notifier), |_: ()| async {
      Ok::<_, ApiError>(())
    })
    .build();

    mutation.execute(()).await.unwrap();
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test]
  async fn test_spawned_calls_are_independent() {
    let (cache, _, _, _) = seeded_cache();
    let (notifier, _rx) = ChannelNotifier::new();
    let mutation = create_mutation(&cache, Arc::new(notifier), |ms: u64| async move {
      tokio::time::sleep(Duration::from_millis(ms)).await;
      Ok::<_, ApiError>(ms)
    })
    .build();

    let mut slow = mutation.spawn(80);
    let mut fast = mutation.spawn(5);
    assert!(slow.state().is_pending());
    assert!(fast.state().is_pending());

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!slow.poll());
    assert!(fast.poll());
    assert_eq!(fast.state().data(), Some(&5));
    assert!(slow.state().is_pending());

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(slow.poll());
    assert!(slow.state().is_settled());
    assert_eq!(slow.state().data(), Some(&80));

    // Terminal: nothing more to receive
    assert!(!slow.poll());
  }
}
