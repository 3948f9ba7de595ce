//! Handlers for `/meds` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/meds` | The caller's medications with `quantity_left` |
//! | `POST`   | `/meds` | Body: [`MedicationDraft`]; returns 201 + `{id, name}` |
//! | `PUT`    | `/meds/{id}` | Body: [`MedicationDraft`]; wholesale replacement |
//! | `DELETE` | `/meds/{id}` | Removes the medication and its ledger |

use axum::{
  Json,
  extract::{Path, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use medbuddy_core::{
  medication::{Medication, MedicationDraft, MedicationSummary},
  store::MedStore,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{AppState, auth::AuthUser, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /meds`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
) -> Result<Json<Vec<MedicationSummary>>, ApiError>
where
  S: MedStore + Clone + 'static,
{
  Ok(Json(state.tracker.list_medications(&user).await?))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CreatedMedication {
  pub id:   Uuid,
  pub name: String,
}

/// `POST /meds`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  body: Result<Json<MedicationDraft>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MedStore + Clone + 'static,
{
  let Json(draft) = body?;
  let med = state.tracker.create_medication(&user, draft, Utc::now()).await?;
  Ok((
    StatusCode::CREATED,
    Json(CreatedMedication { id: med.medication_id, name: med.name }),
  ))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /meds/{id}`
pub async fn update<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path(id): Path<Uuid>,
  body: Result<Json<MedicationDraft>, JsonRejection>,
) -> Result<Json<Medication>, ApiError>
where
  S: MedStore + Clone + 'static,
{
  let Json(draft) = body?;
  Ok(Json(state.tracker.update_medication(&user, id, draft).await?))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DeletedMedication {
  pub status: &'static str,
  pub med_id: Uuid,
}

/// `DELETE /meds/{id}`
pub async fn delete<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path(id): Path<Uuid>,
) -> Result<Json<DeletedMedication>, ApiError>
where
  S: MedStore + Clone + 'static,
{
  state.tracker.delete_medication(&user, id).await?;
  Ok(Json(DeletedMedication { status: "deleted", med_id: id }))
}
