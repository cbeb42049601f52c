//! Headless client for the campus management and price-bot admin backend.
//!
//! - [`http::ApiClient`] authenticates every request and ends the session on
//!   session-fatal failures
//! - [`query`] caches reads by typed key and expires them after writes
//! - [`api`] binds each backend resource to queries and mutations

pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod query;
pub mod session;

pub use error::{ApiError, ApiErrorKind};
