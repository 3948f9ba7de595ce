//! `GET /reminders` — doses due around "now" that are not yet taken.

use axum::{
  Json,
  extract::{Query, State, rejection::QueryRejection},
};
use chrono::Utc;
use medbuddy_core::{clock::parse_instant, reminder::ReminderEntry, store::MedStore};
use serde::Deserialize;

use crate::{AppState, auth::AuthUser, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ReminderParams {
  /// Override for the current instant, RFC 3339 with offset.
  pub now:            Option<String>,
  pub minutes_before: Option<i64>,
  pub minutes_after:  Option<i64>,
}

/// `GET /reminders[?now=...][&minutes_before=15][&minutes_after=5]`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  params: Result<Query<ReminderParams>, QueryRejection>,
) -> Result<Json<Vec<ReminderEntry>>, ApiError>
where
  S: MedStore + Clone + 'static,
{
  let Query(params) = params?;
  let now = match params.now.as_deref() {
    Some(raw) => parse_instant(raw)?.with_timezone(&Utc),
    None => Utc::now(),
  };

  let due = state
    .tracker
    .reminders(&user, now, params.minutes_before, params.minutes_after)
    .await?;
  Ok(Json(due))
}
