//! The `MedStore` trait: everything the engine needs from persistence.
//!
//! The trait is implemented by storage backends (e.g.
//! `medbuddy-store-sqlite`). [`crate::Tracker`] and the REST layer depend on
//! this abstraction, not on any concrete backend. Ownership checks live in
//! the tracker; the store answers by id alone.

use std::{collections::HashMap, future::Future};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  adherence::{NewTakenRecord, TakeOutcome, TakenRecord},
  clock::TimeSpan,
  medication::{Medication, NewMedication},
  user::{NewUser, Session, User, UserCredentials},
  vitals::{NewVitals, Vitals},
};

/// Abstraction over a MedBuddy store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait MedStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users & sessions ──────────────────────────────────────────────────

  /// Create a user. Returns `None` if the email is already registered.
  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Look a user up by (lower-cased) email, together with the password hash.
  fn get_credentials<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<UserCredentials>, Self::Error>> + Send + 'a;

  fn add_session(
    &self,
    session: Session,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Resolve a token digest to its user, ignoring sessions that expired
  /// before `now`.
  fn session_user<'a>(
    &'a self,
    token_hash: &'a str,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  // ── Medications ───────────────────────────────────────────────────────

  /// Persist a medication and its full set of dose times.
  fn add_medication(
    &self,
    user_id: Uuid,
    input: NewMedication,
  ) -> impl Future<Output = Result<Medication, Self::Error>> + Send + '_;

  fn get_medication(
    &self,
    medication_id: Uuid,
  ) -> impl Future<Output = Result<Option<Medication>, Self::Error>> + Send + '_;

  /// All medications of a user, with their dose times. No ordering is
  /// guaranteed.
  fn list_medications(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Medication>, Self::Error>> + Send + '_;

  /// Overwrite a medication's definition, replacing its dose times
  /// wholesale, in one transaction. Returns `None` if it does not exist.
  fn replace_medication(
    &self,
    medication_id: Uuid,
    input: NewMedication,
  ) -> impl Future<Output = Result<Option<Medication>, Self::Error>> + Send + '_;

  /// Delete a medication together with its dose times and taken records, in
  /// one transaction. Returns `false` if it did not exist.
  fn delete_medication(
    &self,
    medication_id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Adherence ledger ──────────────────────────────────────────────────

  /// Fetch the record for a natural key, if any.
  fn find_taken(
    &self,
    medication_id: Uuid,
    scheduled_for: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<TakenRecord>, Self::Error>> + Send + '_;

  /// Insert a record. A uniqueness conflict on the natural key is not an
  /// error: the existing record is returned as
  /// [`TakeOutcome::AlreadyMarked`].
  fn insert_taken(
    &self,
    input: NewTakenRecord,
  ) -> impl Future<Output = Result<TakeOutcome, Self::Error>> + Send + '_;

  /// Delete the record for a natural key. Returns `false` if none existed.
  fn delete_taken(
    &self,
    medication_id: Uuid,
    scheduled_for: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Taken records across all of a user's medications, optionally limited
  /// to scheduled instants inside `span`. Sorted by scheduled instant.
  fn list_taken(
    &self,
    user_id: Uuid,
    span: Option<TimeSpan>,
  ) -> impl Future<Output = Result<Vec<TakenRecord>, Self::Error>> + Send + '_;

  /// Number of taken records per medication, for a user's medications.
  /// Medications with no records may be absent from the map.
  fn taken_counts(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<HashMap<Uuid, u64>, Self::Error>> + Send + '_;

  // ── Vitals ────────────────────────────────────────────────────────────

  fn add_vitals(
    &self,
    user_id: Uuid,
    input: NewVitals,
  ) -> impl Future<Output = Result<Vitals, Self::Error>> + Send + '_;

  /// A user's readings, newest first.
  fn list_vitals(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Vitals>, Self::Error>> + Send + '_;
}
