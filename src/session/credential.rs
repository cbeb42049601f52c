//! CSRF token resolution for cookie-authenticated deployments.
//!
//! Lookup order is the cookie jar, then the last token seen, then a network
//! fetch. Concurrent callers that miss both caches share a single fetch.

use futures::future::{BoxFuture, FutureExt, Shared};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use serde::Deserialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use tracing::{debug, warn};
use url::Url;

use crate::error::ApiError;

/// Name of the cookie the backend sets alongside the session cookie.
pub const CSRF_COOKIE: &str = "csrftoken";

type CsrfFetch = Shared<BoxFuture<'static, Result<String, ApiError>>>;

#[derive(Debug, Deserialize)]
struct CsrfTokenResponse {
  csrf_token: String,
}

/// Cookie jar that can be emptied when the session ends.
#[derive(Default)]
pub struct SessionCookies {
  jar: RwLock<Arc<Jar>>,
}

impl SessionCookies {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add_cookie_str(&self, cookie: &str, url: &Url) {
    self.jar().add_cookie_str(cookie, url);
  }

  /// Drop every cookie, the backend session included.
  pub fn clear(&self) {
    *self.jar.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(Jar::default());
  }

  fn jar(&self) -> Arc<Jar> {
    self
      .jar
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }
}

impl CookieStore for SessionCookies {
  fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
    self.jar().set_cookies(cookie_headers, url);
  }

  fn cookies(&self, url: &Url) -> Option<HeaderValue> {
    self.jar().cookies(url)
  }
}

pub struct CsrfResolver {
  http: reqwest::Client,
  cookies: Arc<SessionCookies>,
  origin: Url,
  endpoint: Url,
  cached: Mutex<Option<String>>,
  in_flight: Mutex<Option<CsrfFetch>>,
}

impl CsrfResolver {
  /// `http` must be the client built on top of `cookies` so that the fetch
  /// can receive the session cookies.
  pub fn new(http: reqwest::Client, cookies: Arc<SessionCookies>, origin: Url, endpoint: Url) -> Self {
    Self {
      http,
      cookies,
      origin,
      endpoint,
      cached: Mutex::new(None),
      in_flight: Mutex::new(None),
    }
  }

  /// Best available token, or `None` if every source failed.
  pub async fn resolve(&self) -> Option<String> {
    if let Some(token) = self.from_cookie() {
      *lock(&self.cached) = Some(token.clone());
      return Some(token);
    }

    if let Some(token) = lock(&self.cached).clone() {
      return Some(token);
    }

    match self.fetch().await {
      Ok(token) => Some(token),
      Err(e) => {
        warn!(error = %e, "Could not obtain CSRF token");
        None
      }
    }
  }

  /// Fetch a fresh token, joining any fetch already in progress.
  pub async fn fetch(&self) -> Result<String, ApiError> {
    let fetch = {
      let mut slot = lock(&self.in_flight);
      match slot.as_ref() {
        Some(pending) => {
          debug!("Joining in-flight CSRF fetch");
          pending.clone()
        }
        None => {
          let pending = request_token(self.http.clone(), self.endpoint.clone())
            .boxed()
            .shared();
          *slot = Some(pending.clone());
          pending
        }
      }
    };

    let result = fetch.clone().await;

    {
      let mut slot = lock(&self.in_flight);
      if slot.as_ref().is_some_and(|pending| pending.ptr_eq(&fetch)) {
        *slot = None;
      }
    }

    if let Ok(token) = &result {
      *lock(&self.cached) = Some(token.clone());
    }

    result
  }

  /// Forget the remembered token and every cookie, so the next request
  /// starts a new backend session.
  pub fn forget(&self) {
    *lock(&self.cached) = None;
    self.cookies.clear();
  }

  fn from_cookie(&self) -> Option<String> {
    let header = self.cookies.cookies(&self.origin)?;
    let cookies = header.to_str().ok()?;
    cookies
      .split(';')
      .filter_map(|pair| pair.trim().split_once('='))
      .find(|(name, _)| *name == CSRF_COOKIE)
      .map(|(_, value)| value.to_string())
      .filter(|value| !value.is_empty())
  }
}

async fn request_token(http: reqwest::Client, endpoint: Url) -> Result<String, ApiError> {
  debug!(%endpoint, "Fetching CSRF token");

  let response = http
    .get(endpoint)
    .send()
    .await
    .map_err(|e| ApiError::from_transport(&e))?;

  let status = response.status();
  let body = response
    .bytes()
    .await
    .map_err(|e| ApiError::from_transport(&e))?;

  if !status.is_success() {
    return Err(ApiError::from_response(status, &body));
  }

  let parsed: CsrfTokenResponse = serde_json::from_slice(&body).map_err(ApiError::decode)?;
  Ok(parsed.csrf_token)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
