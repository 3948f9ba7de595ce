//! The adherence ledger: one record per acknowledged dose.
//!
//! A dose is identified by its natural key, the pair of medication and
//! scheduled instant. The store enforces that key with a uniqueness
//! constraint; a conflicting insert is reported as
//! [`TakeOutcome::AlreadyMarked`], never as an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `(medication_id, scheduled_for)`; the instant is minute-truncated UTC.
pub type NaturalKey = (Uuid, DateTime<Utc>);

/// A dose that has been marked as taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TakenRecord {
  pub taken_id:      Uuid,
  pub medication_id: Uuid,
  /// The scheduled dose this record satisfies, truncated to the minute.
  pub scheduled_for: DateTime<Utc>,
  /// When the dose was actually taken, if known.
  pub taken_at:      Option<DateTime<Utc>>,
}

impl TakenRecord {
  pub fn key(&self) -> NaturalKey { (self.medication_id, self.scheduled_for) }
}

/// Input to [`crate::store::MedStore::insert_taken`].
#[derive(Debug, Clone)]
pub struct NewTakenRecord {
  pub medication_id: Uuid,
  pub scheduled_for: DateTime<Utc>,
  pub taken_at:      Option<DateTime<Utc>>,
}

/// Result of marking a dose as taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TakeOutcome {
  /// A new record was written.
  Created(TakenRecord),
  /// A record for the same natural key already existed; nothing changed.
  AlreadyMarked(TakenRecord),
}

impl TakeOutcome {
  pub fn record(&self) -> &TakenRecord {
    match self {
      Self::Created(r) | Self::AlreadyMarked(r) => r,
    }
  }

  pub fn is_created(&self) -> bool { matches!(self, Self::Created(_)) }

  /// The wire status string: `"ok"` or `"already_marked"`.
  pub fn status(&self) -> &'static str {
    match self {
      Self::Created(_) => "ok",
      Self::AlreadyMarked(_) => "already_marked",
    }
  }
}

/// Result of un-marking a dose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UntakeOutcome {
  Removed,
  NotFound,
}
