//! Backend resources: fetch functions plus cached queries and mutations.
//!
//! Each submodule exposes plain async functions over an [`ApiClient`] and
//! constructors that bind them to the shared cache through an [`Api`].

pub mod attendance;
pub mod auth;
pub mod branches;
pub mod course_groups;
pub mod courses;
pub mod dashboard;
pub mod logs;
pub mod orders;
pub mod organizations;
pub mod products;
pub mod types;

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::http::ApiClient;
use crate::query::{
  create_mutation, create_query, MutationBuilder, Notifier, Query, QueryClient, QueryKey,
  QueryOptions,
};

/// Client, cache and notifier bundled for building queries and mutations.
#[derive(Clone)]
pub struct Api {
  client: ApiClient,
  cache: QueryClient,
  notifier: Arc<dyn Notifier>,
}

impl Api {
  pub fn new(client: ApiClient, cache: QueryClient, notifier: Arc<dyn Notifier>) -> Self {
    Self {
      client,
      cache,
      notifier,
    }
  }

  pub fn client(&self) -> &ApiClient {
    &self.client
  }

  pub fn cache(&self) -> &QueryClient {
    &self.cache
  }

  pub fn notifier(&self) -> &Arc<dyn Notifier> {
    &self.notifier
  }

  /// Bind `fetch` to `key`; the client is handed to every call.
  pub(crate) fn query<T, F, Fut>(&self, key: QueryKey, options: QueryOptions, fetch: F) -> Query<T>
  where
    T: Serialize + DeserializeOwned + Clone + Send + 'static,
    F: Fn(ApiClient) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let client = self.client.clone();
    create_query(&self.cache, key, move || fetch(client.clone()), options)
  }

  pub(crate) fn mutation<T, V, F, Fut>(&self, fetch: F) -> MutationBuilder<T, V>
  where
    F: Fn(ApiClient, V) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    let client = self.client.clone();
    create_mutation(&self.cache, Arc::clone(&self.notifier), move |vars| {
      fetch(client.clone(), vars)
    })
  }
}

/// Guard for queries that need a known id.
pub(crate) fn when_known(id: u64) -> QueryOptions {
  QueryOptions::enabled(id != 0)
}

/// Full-update payload addressed to one record.
#[derive(Debug, Clone, PartialEq)]
pub struct Update<T> {
  pub id: u64,
  pub data: T,
}

impl<T> Update<T> {
  pub fn new(id: u64, data: T) -> Self {
    Self { id, data }
  }
}

#[cfg(test)]
pub(crate) mod testing {
  use super::*;
  use crate::query::{ChannelNotifier, Notification};
  use crate::session::{RedirectToLogin, Session};
  use tokio::sync::mpsc::UnboundedReceiver;
  use wiremock::MockServer;

  pub struct Harness {
    pub api: Api,
    pub notes: UnboundedReceiver<Notification>,
    pub redirect: Arc<RedirectToLogin>,
    pub session: Arc<Session>,
  }

  pub fn harness(server: &MockServer) -> Harness {
    harness_with(server, Arc::new(Session::ephemeral()))
  }

  pub fn harness_with(server: &MockServer, session: Arc<Session>) -> Harness {
    let redirect = Arc::new(RedirectToLogin::new());
    let client = ApiClient::builder(server.uri())
      .session(session.clone())
      .events(redirect.clone())
      .build()
      .unwrap();
    let (notifier, notes) = ChannelNotifier::new();
    Harness {
      api: Api::new(client, QueryClient::new(), Arc::new(notifier)),
      notes,
      redirect,
      session,
    }
  }
}
