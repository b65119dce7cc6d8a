//! Admin credentials and the [`RequireAdmin`] guard for visit writes.
//!
//! Only the write routes are guarded; [`crate::api_router`] applies the guard
//! as a route layer on that sub-router, so reads never look at the
//! `Authorization` header.

use argon2::{
  Argon2, PasswordHash, PasswordVerifier,
  password_hash::PasswordHashString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use planner_core::store::CatalogStore;
use thiserror::Error;
use tracing::warn;

use crate::{ApiState, error::ApiError};

/// `WWW-Authenticate` challenge sent with every 401.
pub const ADMIN_CHALLENGE: &str = "Basic realm=\"planner-admin\", charset=\"UTF-8\"";

#[derive(Debug, Error)]
#[error("admin password hash is not a valid PHC string: {0}")]
pub struct InvalidPasswordHash(String);

/// The single admin account allowed to record, edit and delete visits.
#[derive(Clone, Debug)]
pub struct AdminCredentials {
  username: String,
  hash:     PasswordHashString,
}

impl AdminCredentials {
  /// Parse `password_hash` (an argon2 PHC string) once, at startup.
  pub fn new(
    username: impl Into<String>,
    password_hash: &str,
  ) -> Result<Self, InvalidPasswordHash> {
    let hash = PasswordHash::new(password_hash)
      .map_err(|e| InvalidPasswordHash(e.to_string()))?
      .serialize();
    Ok(Self { username: username.into(), hash })
  }

  pub fn username(&self) -> &str { &self.username }

  /// Whether `creds` name this account and carry its password.
  pub fn accepts(&self, creds: &BasicCredentials) -> bool {
    creds.username == self.username
      && Argon2::default()
        .verify_password(creds.password.as_bytes(), &self.hash.password_hash())
        .is_ok()
  }
}

/// A decoded `Authorization: Basic …` header.
#[derive(Debug, PartialEq, Eq)]
pub struct BasicCredentials {
  pub username: String,
  pub password: String,
}

impl BasicCredentials {
  /// `None` when the header is absent, uses another scheme, or is malformed.
  pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
      return None;
    }
    let decoded = String::from_utf8(B64.decode(token.trim()).ok()?).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some(Self { username: username.to_owned(), password: password.to_owned() })
  }
}

/// Route guard: extraction succeeds only for the configured admin.
pub struct RequireAdmin;

impl<S> FromRequestParts<ApiState<S>> for RequireAdmin
where
  S: CatalogStore + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &ApiState<S>,
  ) -> Result<Self, Self::Rejection> {
    match BasicCredentials::from_headers(&parts.headers) {
      Some(creds) if state.admin.accepts(&creds) => Ok(RequireAdmin),
      Some(creds) => {
        warn!(user = %creds.username, path = %parts.uri.path(), "admin credentials rejected");
        Err(ApiError::Unauthorized)
      }
      None => Err(ApiError::Unauthorized),
    }
  }
}
