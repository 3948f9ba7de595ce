//! Password hashing, bearer-token sessions and the [`AuthUser`] extractor.
//!
//! Tokens are 32 random bytes, URL-safe base64 encoded. Only their SHA-256
//! hex digest reaches the store.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use medbuddy_core::{
  store::MedStore,
  user::{Session, User},
};
use rand_core::{OsRng, RngCore as _};
use sha2::{Digest as _, Sha256};

use crate::{AppState, error::ApiError};

/// Identity settings shared by all handlers.
#[derive(Debug, Clone)]
pub struct AuthConfig {
  /// How long an issued bearer token stays valid.
  pub session_ttl: Duration,
}

impl Default for AuthConfig {
  fn default() -> Self {
    Self { session_ttl: Duration::days(7) }
  }
}

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Produce an argon2 PHC string for `password`.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| ApiError::Internal(format!("argon2 error: {e}")))
}

/// Check `password` against a stored PHC string. A malformed hash never
/// verifies.
pub fn verify_password(password: &str, phc: &str) -> bool {
  let Ok(parsed) = PasswordHash::new(phc) else { return false };
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .is_ok()
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

pub fn generate_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}

pub fn hash_token(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

/// Extract the token from an `Authorization: Bearer <token>` header. The
/// scheme name is matched case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.trim_start().split_once(' '))
    .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("Bearer"))
    .map(|(_, token)| token.trim())
    .filter(|t| !t.is_empty())
}

/// Persist a new session for `user` and return the plaintext token.
pub async fn issue_session<S: MedStore>(
  store: &S,
  config: &AuthConfig,
  user: &User,
  now: DateTime<Utc>,
) -> Result<String, ApiError> {
  let token = generate_token();
  store
    .add_session(Session {
      token_hash: hash_token(&token),
      user_id:    user.user_id,
      expires_at: now + config.session_ttl,
    })
    .await
    .map_err(ApiError::store)?;
  Ok(token)
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The authenticated caller. Rejects with 401 when the bearer token is
/// missing, unknown or expired.
pub struct AuthUser(pub User);

impl<S> FromRequestParts<AppState<S>> for AuthUser
where
  S: MedStore + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let digest = bearer_token(&parts.headers)
      .map(hash_token)
      .ok_or(ApiError::Unauthorized)?;

    let user = state
      .tracker
      .store()
      .session_user(&digest, Utc::now())
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Unauthorized)?;

    Ok(AuthUser(user))
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  #[test]
  fn password_round_trip() {
    let phc = hash_password("s3cret").unwrap();
    assert!(verify_password("s3cret", &phc));
    assert!(!verify_password("wrong", &phc));
    assert!(!verify_password("s3cret", "not-a-phc-string"));
  }

  #[test]
  fn tokens_are_unique_and_url_safe() {
    let a = generate_token();
    let b = generate_token();
    assert_ne!(a, b);
    assert_eq!(a.len(), 43);
    assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
  }

  #[test]
  fn token_digest_is_sha256_hex() {
    let digest = hash_token("abc");
    assert_eq!(
      digest,
      "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
  }

  #[test]
  fn bearer_header_parsing() {
    let mut headers = HeaderMap::new();
    assert_eq!(bearer_token(&headers), None);

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
    assert_eq!(bearer_token(&headers), None);

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
    assert_eq!(bearer_token(&headers), Some("abc.def"));

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
    assert_eq!(bearer_token(&headers), None);

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer abc.def"));
    assert_eq!(bearer_token(&headers), Some("abc.def"));

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("BEARER abc.def"));
    assert_eq!(bearer_token(&headers), Some("abc.def"));

    headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearerabc.def"));
    assert_eq!(bearer_token(&headers), None);
  }
}
