//! Handlers for account endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/register` | Body: [`RegisterBody`]; 409 on a taken email |
//! | `POST` | `/token` | Form: `username`, `password`; 401 on bad credentials |
//! | `GET`  | `/me` | The authenticated user |

use axum::{
  Form, Json,
  extract::{State, rejection::{FormRejection, JsonRejection}},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use medbuddy_core::{clock::parse_zone, store::MedStore, user::NewUser};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  auth::{AuthUser, hash_password, issue_session, verify_password},
  error::ApiError,
};

/// Returned by both `/register` and `/token`.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
  pub access_token: String,
  pub token_type:   &'static str,
  pub email:        String,
}

fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }

// ─── Register ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub email:    String,
  pub password: String,
  /// IANA zone identifier; the configured default when omitted.
  pub timezone: Option<String>,
}

/// `POST /register`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  body: Result<Json<RegisterBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MedStore + Clone + 'static,
{
  let Json(body) = body?;

  let email = normalize_email(&body.email);
  if email.is_empty() || !email.contains('@') {
    return Err(ApiError::BadRequest(format!("invalid email: {:?}", body.email)));
  }
  if body.password.is_empty() {
    return Err(ApiError::BadRequest("password must not be empty".to_owned()));
  }

  // Registration never falls back: an unknown zone is a client error.
  let timezone = match body.timezone.as_deref().map(str::trim) {
    None | Some("") => state.tracker.config().default_timezone.name().to_owned(),
    Some(id) => parse_zone(id)
      .ok_or_else(|| ApiError::BadRequest(format!("unknown timezone: {id:?}")))?
      .name()
      .to_owned(),
  };

  let password_hash = hash_password(&body.password)?;
  let store = state.tracker.store();
  let user = store
    .add_user(NewUser { email: email.clone(), password_hash, timezone })
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::Conflict(format!("email already registered: {email}")))?;

  let access_token = issue_session(store.as_ref(), &state.auth, &user, Utc::now()).await?;
  tracing::info!(user_id = %user.user_id, timezone = %user.timezone, "registered user");

  Ok((
    StatusCode::CREATED,
    Json(TokenResponse { access_token, token_type: "bearer", email: user.email }),
  ))
}

// ─── Token ───────────────────────────────────────────────────────────────────

/// OAuth2 password-grant style form fields.
#[derive(Debug, Deserialize)]
pub struct TokenForm {
  pub username: String,
  pub password: String,
}

/// `POST /token`
pub async fn token<S>(
  State(state): State<AppState<S>>,
  form: Result<Form<TokenForm>, FormRejection>,
) -> Result<Json<TokenResponse>, ApiError>
where
  S: MedStore + Clone + 'static,
{
  let Form(form) = form?;
  let email = normalize_email(&form.username);
  let store = state.tracker.store();

  let creds = store
    .get_credentials(&email)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::Unauthorized)?;
  if !verify_password(&form.password, &creds.password_hash) {
    tracing::info!(user_id = %creds.user.user_id, "rejected login");
    return Err(ApiError::Unauthorized);
  }

  let access_token = issue_session(store.as_ref(), &state.auth, &creds.user, Utc::now()).await?;
  Ok(Json(TokenResponse {
    access_token,
    token_type: "bearer",
    email: creds.user.email,
  }))
}

// ─── Me ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct MeResponse {
  pub user_id:  Uuid,
  pub email:    String,
  pub timezone: String,
}

/// `GET /me`
pub async fn me(AuthUser(user): AuthUser) -> Json<MeResponse> {
  Json(MeResponse {
    user_id:  user.user_id,
    email:    user.email,
    timezone: user.timezone,
  })
}
