//! Handlers for `/vitals`.

use axum::{
  Json,
  extract::{State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use medbuddy_core::{
  clock::parse_instant,
  store::MedStore,
  vitals::{NewVitals, Vitals},
};
use serde::Deserialize;

use crate::{AppState, auth::AuthUser, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct VitalsBody {
  pub systolic:    Option<u16>,
  pub diastolic:   Option<u16>,
  pub heart_rate:  Option<u16>,
  pub temperature: Option<f64>,
  /// Defaults to now.
  pub record_time: Option<String>,
}

/// `POST /vitals` — returns 201 + the stored reading.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  body: Result<Json<VitalsBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MedStore + Clone + 'static,
{
  let Json(body) = body?;
  let record_time = match body.record_time.as_deref() {
    Some(raw) => parse_instant(raw)?.with_timezone(&Utc),
    None => Utc::now(),
  };
  let input = NewVitals::new(
    body.systolic,
    body.diastolic,
    body.heart_rate,
    body.temperature,
    record_time,
  )?;

  let vitals = state
    .tracker
    .store()
    .add_vitals(user.user_id, input)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(vitals)))
}

/// `GET /vitals` — newest first.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
) -> Result<Json<Vec<Vitals>>, ApiError>
where
  S: MedStore + Clone + 'static,
{
  let vitals = state
    .tracker
    .store()
    .list_vitals(user.user_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(vitals))
}
