use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

use super::AuthScheme;
use crate::error::{ApiError, ApiErrorKind};
use crate::session::{
  CsrfResolver, LogoutReason, RedirectToLogin, Session, SessionCookies, SessionEvents,
};

/// Header carrying the CSRF token in cookie-auth deployments.
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Effectively unbounded; long-running sync endpoints answer slowly.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1000);

/// Backend client that authenticates every request and tears the session
/// down on session-fatal failures.
#[derive(Clone)]
pub struct ApiClient {
  inner: Arc<Inner>,
}

struct Inner {
  http: reqwest::Client,
  base_url: String,
  scheme: AuthScheme,
  session: Arc<Session>,
  events: Arc<dyn SessionEvents>,
  csrf: Option<CsrfResolver>,
}

pub struct ApiClientBuilder {
  base_url: String,
  scheme: AuthScheme,
  timeout: Duration,
  session: Option<Arc<Session>>,
  events: Option<Arc<dyn SessionEvents>>,
}

impl ApiClientBuilder {
  pub fn auth_scheme(mut self, scheme: AuthScheme) -> Self {
    self.scheme = scheme;
    self
  }

  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn session(mut self, session: Arc<Session>) -> Self {
    self.session = Some(session);
    self
  }

  /// Handler told about every forced or requested logout.
  ///
  /// Defaults to [`RedirectToLogin`].
  pub fn events(mut self, events: Arc<dyn SessionEvents>) -> Self {
    self.events = Some(events);
    self
  }

  pub fn build(self) -> Result<ApiClient, ApiError> {
    let base_url = self.base_url.trim_end_matches('/').to_string();
    let origin = Url::parse(&base_url).map_err(|e| {
      ApiError::new(
        ApiErrorKind::Unknown,
        format!("Invalid API base URL {}: {}", base_url, e),
      )
    })?;

    let cookies = Arc::new(SessionCookies::new());
    let http = reqwest::Client::builder()
      .timeout(self.timeout)
      .cookie_provider(cookies.clone())
      .build()
      .map_err(|e| ApiError::from_transport(&e))?;

    let csrf = match self.scheme {
      AuthScheme::Token => None,
      AuthScheme::Csrf => {
        let endpoint = Url::parse(&format!("{}/auth/csrf/", base_url)).map_err(|e| {
          ApiError::new(
            ApiErrorKind::Unknown,
            format!("Invalid CSRF endpoint: {}", e),
          )
        })?;
        Some(CsrfResolver::new(http.clone(), cookies, origin, endpoint))
      }
    };

    Ok(ApiClient {
      inner: Arc::new(Inner {
        http,
        base_url,
        scheme: self.scheme,
        session: self
          .session
          .unwrap_or_else(|| Arc::new(Session::ephemeral())),
        events: self
          .events
          .unwrap_or_else(|| Arc::new(RedirectToLogin::new())),
        csrf,
      }),
    })
  }
}

impl ApiClient {
  pub fn builder(base_url: impl Into<String>) -> ApiClientBuilder {
    ApiClientBuilder {
      base_url: base_url.into(),
      scheme: AuthScheme::default(),
      timeout: DEFAULT_TIMEOUT,
      session: None,
      events: None,
    }
  }

  pub fn base_url(&self) -> &str {
    &self.inner.base_url
  }

  pub fn auth_scheme(&self) -> AuthScheme {
    self.inner.scheme
  }

  pub fn session(&self) -> &Arc<Session> {
    &self.inner.session
  }

  pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
    let (_, body) = self.execute(self.request(Method::GET, path)).await?;
    decode(&body)
  }

  /// GET with query parameters serialized from `query`; `None` fields are
  /// left out.
  pub async fn get_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
  where
    T: DeserializeOwned,
    Q: Serialize + ?Sized,
  {
    let (_, body) = self
      .execute(self.request(Method::GET, path).query(query))
      .await?;
    decode(&body)
  }

  /// GET returning the raw body, for file downloads.
  pub async fn get_bytes(&self, path: &str) -> Result<Vec<u8>, ApiError> {
    let (_, body) = self.execute(self.request(Method::GET, path)).await?;
    Ok(body)
  }

  pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
  where
    T: DeserializeOwned,
    B: Serialize + ?Sized,
  {
    let (_, body) = self
      .execute(self.request(Method::POST, path).json(body))
      .await?;
    decode(&body)
  }

  pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
    let (_, body) = self.execute(self.request(Method::POST, path)).await?;
    decode(&body)
  }

  /// POST that kicks off background work; only 200 and 202 count as success.
  pub async fn post_accepted(&self, path: &str) -> Result<(), ApiError> {
    let (status, _) = self.execute(self.request(Method::POST, path)).await?;
    match status {
      StatusCode::OK | StatusCode::ACCEPTED => Ok(()),
      other => Err(ApiError::unexpected_status(other)),
    }
  }

  pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
  where
    T: DeserializeOwned,
    B: Serialize + ?Sized,
  {
    let (_, body) = self
      .execute(self.request(Method::PUT, path).json(body))
      .await?;
    decode(&body)
  }

  pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
  where
    T: DeserializeOwned,
    B: Serialize + ?Sized,
  {
    let (_, body) = self
      .execute(self.request(Method::PATCH, path).json(body))
      .await?;
    decode(&body)
  }

  pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
    self.execute(self.request(Method::DELETE, path)).await?;
    Ok(())
  }

  /// Wipe the session and notify the session handler.
  ///
  /// In cookie mode the cookie jar is emptied too, which drops the backend
  /// session along with the CSRF token.
  pub fn end_session(&self, reason: LogoutReason) {
    if let Err(e) = self.inner.session.end() {
      error!(error = %e, "Failed to clear persisted session");
    }
    if let Some(csrf) = &self.inner.csrf {
      csrf.forget();
    }
    self.inner.events.on_logout(reason);
  }

  fn request(&self, method: Method, path: &str) -> RequestBuilder {
    let url = format!("{}{}", self.inner.base_url, path);
    debug!(%method, %url, "Dispatching request");
    self.inner.http.request(method, url)
  }

  async fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
    match self.inner.scheme {
      AuthScheme::Token => match self.inner.session.token() {
        Some(token) => request.header(AUTHORIZATION, format!("Token {}", token)),
        None => request,
      },
      AuthScheme::Csrf => {
        let token = match &self.inner.csrf {
          Some(csrf) => csrf.resolve().await,
          None => None,
        };
        match token {
          Some(token) => request.header(CSRF_HEADER, token),
          None => request,
        }
      }
    }
  }

  /// Send `request` and read the whole body.
  async fn execute(&self, request: RequestBuilder) -> Result<(StatusCode, Vec<u8>), ApiError> {
    // Failures are judged against the credential the request carried
    let sent_with = self.inner.session.token();
    let request = self.authorize(request).await;

    let response = match request.send().await {
      Ok(response) => response,
      Err(e) => return Err(self.fail(ApiError::from_transport(&e), sent_with)),
    };

    let status = response.status();
    if !status.is_success() {
      let body = response.bytes().await.unwrap_or_default();
      return Err(self.fail(ApiError::from_response(status, &body), sent_with));
    }

    match response.bytes().await {
      Ok(body) => Ok((status, body.to_vec())),
      Err(e) => Err(self.fail(ApiError::from_transport(&e), sent_with)),
    }
  }

  fn fail(&self, err: ApiError, sent_with: Option<String>) -> ApiError {
    match LogoutReason::from_error(&err) {
      Some(reason) if self.inner.session.token() != sent_with => {
        debug!(
          error = %err,
          %reason,
          "Session-fatal failure for a replaced credential, ignoring"
        );
      }
      Some(reason) => {
        warn!(error = %err, %reason, "Session-fatal failure, logging out");
        self.end_session(reason);
      }
      None => debug!(error = %err, kind = ?err.kind, "Request failed"),
    }
    err
  }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
  // 204s and bare 200s decode as null so `()` and `Option<_>` targets work
  if body.is_empty() {
    return serde_json::from_value(Value::Null).map_err(ApiError::decode);
  }
  serde_json::from_slice(body).map_err(ApiError::decode)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::session::{MemorySessionStore, SessionStore, LOGIN_PATH, TOKEN_KEY, USER_ID_KEY};
  use serde_json::json;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Mutex;
  use wiremock::matchers::{header, header_exists, method, path, query_param};
  use wiremock::{Mock, MockServer, Request, ResponseTemplate};

  struct Harness {
    client: ApiClient,
    store: Arc<MemorySessionStore>,
    logouts: Arc<Mutex<Vec<LogoutReason>>>,
  }

  fn harness(base: &str, token: Option<&str>) -> Harness {
    let store = Arc::new(MemorySessionStore::new());
    if let Some(token) = token {
      store.set(TOKEN_KEY, token).unwrap();
      store.set(USER_ID_KEY, "1").unwrap();
    }
    let logouts = Arc::new(Mutex::new(Vec::new()));
    let sink = logouts.clone();

    let client = ApiClient::builder(base)
      .session(Arc::new(Session::restore(store.clone())))
      .events(Arc::new(move |reason: LogoutReason| {
        sink.lock().unwrap().push(reason)
      }))
      .build()
      .unwrap();

    Harness {
      client,
      store,
      logouts,
    }
  }

  #[tokio::test]
  async fn test_token_attached_unmodified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/products/"))
      .and(header("Authorization", "Token s3cr3t+/="))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
      .expect(1)
      .mount(&server)
      .await;

    let h = harness(&format!("{}/api", server.uri()), Some("s3cr3t+/="));
    let body: Value = h.client.get("/products/").await.unwrap();
    assert_eq!(body, json!({"ok": true}));
  }

  #[tokio::test]
  async fn test_no_header_without_credential() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/orders/"))
      .respond_with(|req: &Request| {
        if req.headers.contains_key("authorization") {
          ResponseTemplate::new(400)
        } else {
          ResponseTemplate::new(200).set_body_json(json!([]))
        }
      })
      .mount(&server)
      .await;

    let h = harness(&format!("{}/api", server.uri()), None);
    let body: Vec<Value> = h.client.get("/orders/").await.unwrap();
    assert!(body.is_empty());
  }

  #[tokio::test]
  async fn test_query_params_skip_absent_values() {
    #[derive(Serialize)]
    struct Params {
      page: u32,
      #[serde(skip_serializing_if = "Option::is_none")]
      search: Option<String>,
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/logs/"))
      .and(query_param("page", "2"))
      .respond_with(|req: &Request| {
        if req.url.query_pairs().any(|(k, _)| k == "search") {
          ResponseTemplate::new(400)
        } else {
          ResponseTemplate::new(200).set_body_json(json!([]))
        }
      })
      .expect(1)
      .mount(&server)
      .await;

    let h = harness(&format!("{}/api", server.uri()), None);
    let _: Vec<Value> = h
      .client
      .get_query("/logs/", &Params { page: 2, search: None })
      .await
      .unwrap();
  }

  #[tokio::test]
  async fn test_unauthorized_logs_out_exactly_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/auth/me/"))
      .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid token."})))
      .mount(&server)
      .await;

    let h = harness(&format!("{}/api", server.uri()), Some("stale"));
    h.store.set("theme", "dark").unwrap();

    let err = h.client.get::<Value>("/auth/me/").await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Authentication);
    assert_eq!(err.user_message(), "Invalid token.");

    assert_eq!(*h.logouts.lock().unwrap(), vec![LogoutReason::Unauthorized]);
    assert!(!h.client.session().is_authenticated());
    assert_eq!(h.store.get(TOKEN_KEY).unwrap(), None);
    assert_eq!(h.store.get(USER_ID_KEY).unwrap(), None);
    assert_eq!(h.store.get("theme").unwrap(), None);
  }

  #[tokio::test]
  async fn test_server_error_redirects_to_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/products/"))
      .respond_with(ResponseTemplate::new(500))
      .mount(&server)
      .await;

    let store = Arc::new(MemorySessionStore::new());
    store.set(TOKEN_KEY, "abc").unwrap();
    let redirect = Arc::new(RedirectToLogin::new());
    let client = ApiClient::builder(format!("{}/api", server.uri()))
      .session(Arc::new(Session::restore(store.clone())))
      .events(redirect.clone())
      .build()
      .unwrap();

    let err = client.get::<Value>("/products/").await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Server);
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
    assert_eq!(redirect.redirected_to().as_deref(), Some(LOGIN_PATH));
  }

  #[tokio::test]
  async fn test_not_found_passes_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/courses/9/"))
      .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Not found."})))
      .mount(&server)
      .await;

    let h = harness(&format!("{}/api", server.uri()), Some("abc"));
    let err = h.client.get::<Value>("/courses/9/").await.unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::NotFound);
    assert!(h.logouts.lock().unwrap().is_empty());
    assert_eq!(h.client.session().token().as_deref(), Some("abc"));
  }

  #[tokio::test]
  async fn test_unreachable_backend_is_session_fatal() {
    // Nothing listens on port 1
    let h = harness("http://127.0.0.1:1/api", Some("abc"));
    let err = h.client.get::<Value>("/products/").await.unwrap_err();

    assert_eq!(err.kind, ApiErrorKind::Network);
    assert_eq!(*h.logouts.lock().unwrap(), vec![LogoutReason::Unreachable]);
    assert!(!h.client.session().is_authenticated());
  }

  #[tokio::test]
  async fn test_timeout_is_session_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/slow/"))
      .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
      .mount(&server)
      .await;

    let logouts = Arc::new(AtomicUsize::new(0));
    let counter = logouts.clone();
    let client = ApiClient::builder(format!("{}/api", server.uri()))
      .timeout(Duration::from_millis(50))
      .events(Arc::new(move |_: LogoutReason| {
        counter.fetch_add(1, Ordering::SeqCst);
      }))
      .build()
      .unwrap();

    let err = client.get::<Value>("/slow/").await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Timeout);
    assert_eq!(logouts.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_csrf_scheme_sends_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/auth/csrf/"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"csrf_token": "xyz"})))
      .expect(1)
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(path("/api/attendance/"))
      .and(header(CSRF_HEADER, "xyz"))
      .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
      .expect(2)
      .mount(&server)
      .await;

    let client = ApiClient::builder(format!("{}/api", server.uri()))
      .auth_scheme(AuthScheme::Csrf)
      .build()
      .unwrap();

    for _ in 0..2 {
      let created: Value = client.post("/attendance/", &json!({"student": 1})).await.unwrap();
      assert_eq!(created["id"], 1);
    }
  }

  #[tokio::test]
  async fn test_csrf_scheme_never_sends_token_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/auth/csrf/"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"csrf_token": "xyz"})))
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/api/auth/me/"))
      .and(header_exists("authorization"))
      .respond_with(ResponseTemplate::new(400))
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/api/auth/me/"))
      .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 3})))
      .mount(&server)
      .await;

    let session = Arc::new(Session::ephemeral());
    session.begin("tok", "3").unwrap();
    let client = ApiClient::builder(format!("{}/api", server.uri()))
      .auth_scheme(AuthScheme::Csrf)
      .session(session)
      .build()
      .unwrap();

    let me: Value = client.get("/auth/me/").await.unwrap();
    assert_eq!(me["id"], 3);
  }

  #[tokio::test]
  async fn test_forced_logout_drops_csrf_cookies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/auth/csrf/"))
      .respond_with(
        ResponseTemplate::new(200)
          .insert_header("set-cookie", "csrftoken=c1; Path=/")
          .set_body_json(json!({"csrf_token": "c1"})),
      )
      .expect(2)
      .mount(&server)
      .await;
    Mock::given(method("GET"))
      .and(path("/api/auth/me/"))
      .respond_with(ResponseTemplate::new(401))
      .mount(&server)
      .await;

    let logouts = Arc::new(AtomicUsize::new(0));
    let counter = logouts.clone();
    let client = ApiClient::builder(format!("{}/api", server.uri()))
      .auth_scheme(AuthScheme::Csrf)
      .events(Arc::new(move |_: LogoutReason| {
        counter.fetch_add(1, Ordering::SeqCst);
      }))
      .build()
      .unwrap();

    // Each attempt starts from an empty jar, so each one fetches a token
    for _ in 0..2 {
      client.get::<Value>("/auth/me/").await.unwrap_err();
    }
    assert_eq!(logouts.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn test_failure_for_replaced_credential_keeps_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
      .and(path("/api/products/"))
      .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(200)))
      .mount(&server)
      .await;

    let h = harness(&format!("{}/api", server.uri()), Some("old"));
    let client = h.client.clone();
    let pending = tokio::spawn(async move { client.get::<Value>("/products/").await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    h.client.session().begin("new", "2").unwrap();

    let err = pending.await.unwrap().unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Authentication);
    assert!(h.logouts.lock().unwrap().is_empty());
    assert_eq!(h.client.session().token().as_deref(), Some("new"));
    assert_eq!(h.store.get(TOKEN_KEY).unwrap().as_deref(), Some("new"));
  }

  #[tokio::test]
  async fn test_post_accepted_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/products/fetch-umico/"))
      .respond_with(ResponseTemplate::new(202))
      .mount(&server)
      .await;
    Mock::given(method("POST"))
      .and(path("/api/orders/fetch-umico/"))
      .respond_with(ResponseTemplate::new(201))
      .mount(&server)
      .await;

    let h = harness(&format!("{}/api", server.uri()), Some("abc"));
    h.client.post_accepted("/products/fetch-umico/").await.unwrap();

    let err = h.client.post_accepted("/orders/fetch-umico/").await.unwrap_err();
    assert_eq!(err.kind, ApiErrorKind::Unknown);
    assert_eq!(err.message, "Unexpected status code: 201");
    assert!(h.logouts.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn test_empty_body_decodes_as_null() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/api/products/deactivate/"))
      .respond_with(ResponseTemplate::new(200))
      .mount(&server)
      .await;
    Mock::given(method("DELETE"))
      .and(path("/api/courses/4/"))
      .respond_with(ResponseTemplate::new(204))
      .mount(&server)
      .await;

    let h = harness(&format!("{}/api", server.uri()), Some("abc"));
    let body: Value = h
      .client
      .post("/products/deactivate/", &json!({"offer_id": "o-1"}))
      .await
      .unwrap();
    assert_eq!(body, Value::Null);

    h.client.delete("/courses/4/").await.unwrap();
  }

  #[test]
  fn test_invalid_base_url_rejected() {
    assert!(ApiClient::builder("not a url").build().is_err());
  }
}
