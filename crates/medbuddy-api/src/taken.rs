//! Handlers for the adherence ledger.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/meds/{id}/take` | Optional body `{scheduled_for?, taken_at?}` |
//! | `DELETE` | `/meds/{id}/take` | `?scheduled_for=` required |
//! | `GET`    | `/taken` | Optional `?date=YYYY-MM-DD` in the caller's zone |
//!
//! Instants must be RFC 3339 with an explicit offset. Query strings need
//! `+` percent-encoded as `%2B`.

use axum::{
  Json,
  body::Bytes,
  extract::{Path, Query, State, rejection::QueryRejection},
};
use chrono::{DateTime, NaiveDate, Utc};
use medbuddy_core::{
  adherence::{TakenRecord, UntakeOutcome},
  clock::parse_instant,
  store::MedStore,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppState, auth::AuthUser, error::ApiError};

// ─── Take ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct TakeBody {
  pub scheduled_for: Option<String>,
  pub taken_at:      Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TakeResponse {
  pub status:   &'static str,
  pub taken_id: Uuid,
}

/// `POST /meds/{id}/take`
///
/// The body may be empty, in which case the dose scheduled "now" is marked.
pub async fn take<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path(id): Path<Uuid>,
  body: Bytes,
) -> Result<Json<TakeResponse>, ApiError>
where
  S: MedStore + Clone + 'static,
{
  let body: TakeBody = if body.iter().all(u8::is_ascii_whitespace) {
    TakeBody::default()
  } else {
    serde_json::from_slice(&body)
      .map_err(|e| ApiError::BadRequest(format!("invalid take body: {e}")))?
  };

  let scheduled_for = body.scheduled_for.as_deref().map(parse_instant).transpose()?;
  let taken_at = body
    .taken_at
    .as_deref()
    .map(parse_instant)
    .transpose()?
    .map(|at| at.with_timezone(&Utc));

  let outcome = state
    .tracker
    .mark_taken(&user, id, scheduled_for, taken_at, Utc::now())
    .await?;

  Ok(Json(TakeResponse {
    status:   outcome.status(),
    taken_id: outcome.record().taken_id,
  }))
}

// ─── Untake ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UntakeParams {
  pub scheduled_for: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UntakeResponse {
  pub status: &'static str,
}

/// `DELETE /meds/{id}/take?scheduled_for=<instant>`
pub async fn untake<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path(id): Path<Uuid>,
  params: Result<Query<UntakeParams>, QueryRejection>,
) -> Result<Json<UntakeResponse>, ApiError>
where
  S: MedStore + Clone + 'static,
{
  let Query(params) = params?;
  let raw = params
    .scheduled_for
    .ok_or_else(|| ApiError::BadRequest("scheduled_for is required".to_owned()))?;
  let scheduled_for = parse_instant(&raw)?;

  match state.tracker.unmark_taken(&user, id, scheduled_for).await? {
    UntakeOutcome::Removed => Ok(Json(UntakeResponse { status: "unmarked" })),
    UntakeOutcome::NotFound => Err(ApiError::NotFound(format!(
      "no taken record for medication {id} at {raw}"
    ))),
  }
}

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Calendar date in the caller's timezone.
  pub date: Option<String>,
}

/// One ledger entry as exposed over HTTP.
#[derive(Debug, Serialize)]
pub struct TakenView {
  pub taken_id:      Uuid,
  pub med_id:        Uuid,
  pub scheduled_for: DateTime<Utc>,
  pub taken_at:      Option<DateTime<Utc>>,
}

impl From<TakenRecord> for TakenView {
  fn from(r: TakenRecord) -> Self {
    Self {
      taken_id:      r.taken_id,
      med_id:        r.medication_id,
      scheduled_for: r.scheduled_for,
      taken_at:      r.taken_at,
    }
  }
}

/// `GET /taken[?date=YYYY-MM-DD]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<TakenView>>, ApiError>
where
  S: MedStore + Clone + 'static,
{
  let Query(params) = params?;
  let date = params
    .date
    .as_deref()
    .map(|d| {
      NaiveDate::parse_from_str(d, "%Y-%m-%d")
        .map_err(|_| ApiError::BadRequest(format!("invalid date {d:?}, expected YYYY-MM-DD")))
    })
    .transpose()?;

  let records = state.tracker.list_taken(&user, date).await?;
  Ok(Json(records.into_iter().map(TakenView::from).collect()))
}
