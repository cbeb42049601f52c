//! Sign-in, sign-out and the current user.

use serde_json::Value;
use tracing::{info, warn};

use super::types::{CsrfTokenResponse, LoginRequest, LoginResponse, User, UserType};
use super::Api;
use crate::error::{ApiError, ApiErrorKind};
use crate::http::ApiClient;
use crate::query::{Message, Mutation, Query, QueryKey, QueryOptions, Resource};
use crate::session::LogoutReason;

/// Landing page for signed-in users without access to an admin area.
pub const DASHBOARD_PATH: &str = "/dashboard";

pub async fn login(client: &ApiClient, credentials: &LoginRequest) -> Result<LoginResponse, ApiError> {
  client.post("/auth/login/", credentials).await
}

/// Log in and install the returned credential.
///
/// Succeeds only once the credential is stored, so the caller never sees a
/// success that left the client signed out.
pub async fn sign_in(client: &ApiClient, credentials: &LoginRequest) -> Result<LoginResponse, ApiError> {
  let resp = login(client, credentials).await?;
  let user_id = resp.user_id_text();
  client
    .session()
    .begin(&resp.token, &user_id)
    .map_err(|e| {
      ApiError::new(
        ApiErrorKind::Unknown,
        format!("Failed to save the session: {}", e),
      )
    })?;
  info!(%user_id, "Signed in");
  Ok(resp)
}

pub async fn current_user(client: &ApiClient) -> Result<User, ApiError> {
  client.get("/auth/me/").await
}

pub async fn csrf_token(client: &ApiClient) -> Result<CsrfTokenResponse, ApiError> {
  client.get("/auth/csrf/").await
}

/// Sign out on the backend and locally.
///
/// The local session is torn down whatever the backend answers.
pub async fn logout(client: &ApiClient) -> Result<(), ApiError> {
  if let Err(e) = client.post_empty::<Value>("/auth/logout/").await {
    warn!(error = %e, "Logout request failed, clearing session anyway");
  }
  // A session-fatal failure above has already ended the session
  if client.session().is_authenticated() {
    client.end_session(LogoutReason::UserRequested);
  }
  Ok(())
}

pub fn current_user_query(api: &Api) -> Query<User> {
  api.query(
    QueryKey::new(Resource::CurrentUser),
    QueryOptions::default(),
    |client| async move { current_user(&client).await },
  )
}

pub fn csrf_token_query(api: &Api) -> Query<CsrfTokenResponse> {
  api.query(
    QueryKey::new(Resource::CsrfToken),
    QueryOptions::default(),
    |client| async move { csrf_token(&client).await },
  )
}

/// Sign in and install the returned credential.
pub fn login_mutation(api: &Api) -> Mutation<LoginResponse, LoginRequest> {
  api
    .mutation(|client, credentials: LoginRequest| async move {
      sign_in(&client, &credentials).await
    })
    .invalidates(Resource::CurrentUser)
    .success_message("Signed in.")
    .error_message(Message::computed(|e: &ApiError| {
      format!("Login failed: {}", e.user_message())
    }))
    .build()
}

/// Sign out and drop every cached response.
pub fn logout_mutation(api: &Api) -> Mutation<(), ()> {
  let cache = api.cache().clone();

  api
    .mutation(|client, _: ()| async move { logout(&client).await })
    .on_success(move |_| cache.clear())
    .build()
}

impl UserType {
  /// Roles that may manage branches, courses and the price bot.
  pub fn is_admin(self) -> bool {
    matches!(
      self,
      Self::BranchAdmin | Self::BranchManager | Self::OrganizationAdmin
    )
  }

  pub fn is_teacher(self) -> bool {
    self == Self::Teacher
  }
}

/// Outcome of a role check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
  Granted,
  /// Send the user elsewhere instead of failing
  Redirect(&'static str),
}

impl Access {
  pub fn is_granted(&self) -> bool {
    matches!(self, Self::Granted)
  }
}

/// Gate an admin-only area.
pub fn require_admin(user: &User) -> Access {
  if user.user_type.is_admin() {
    Access::Granted
  } else {
    Access::Redirect(DASHBOARD_PATH)
  }
}
