//! Medications and their dose schedules.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  schedule::{ActiveRange, ScheduledTime, normalize_times},
};

/// A medication owned by one user, with its fixed daily dose times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
  pub medication_id: Uuid,
  pub user_id:       Uuid,
  pub name:          String,
  /// Free-text dose description, e.g. "500 mg".
  pub dose:          Option<String>,
  /// Always sorted ascending and free of duplicates.
  pub times:         Vec<ScheduledTime>,
  pub active:        ActiveRange,
  /// Total units supplied, if the user is tracking stock.
  pub quantity:      Option<u32>,
  pub created_at:    DateTime<Utc>,
}

impl Medication {
  pub fn is_active_on(&self, date: NaiveDate) -> bool { self.active.contains(date) }
}

/// A [`Medication`] together with how much of it is left.
#[derive(Debug, Clone, Serialize)]
pub struct MedicationSummary {
  #[serde(flatten)]
  pub medication:    Medication,
  /// `quantity` minus the number of recorded doses; `None` when no quantity
  /// is tracked. May go negative if doses outnumber the stock on record.
  pub quantity_left: Option<i64>,
}

// ─── Input ───────────────────────────────────────────────────────────────────

/// Validated input to [`crate::store::MedStore::add_medication`] and
/// [`crate::store::MedStore::replace_medication`].
///
/// Construct it through [`NewMedication::new`], which enforces the schedule
/// invariants; the store trusts what it receives.
#[derive(Debug, Clone)]
pub struct NewMedication {
  pub name:     String,
  pub dose:     Option<String>,
  pub times:    Vec<ScheduledTime>,
  pub active:   ActiveRange,
  pub quantity: Option<u32>,
}

impl NewMedication {
  pub fn new(
    name: impl Into<String>,
    dose: Option<String>,
    times: Vec<ScheduledTime>,
    active_from: NaiveDate,
    active_until: Option<NaiveDate>,
    quantity: Option<u32>,
  ) -> Result<Self> {
    let name = name.into().trim().to_owned();
    if name.is_empty() {
      return Err(Error::invalid("medication name must not be empty"));
    }

    let times = normalize_times(times);
    if times.is_empty() {
      return Err(Error::invalid("at least one dose time is required"));
    }

    let dose = dose
      .map(|d| d.trim().to_owned())
      .filter(|d| !d.is_empty());

    Ok(Self {
      name,
      dose,
      times,
      active: ActiveRange::new(active_from, active_until)?,
      quantity,
    })
  }
}

/// Medication input as a caller supplies it, before defaults are applied.
///
/// The start date is optional here; [`crate::Tracker`] fills it in from the
/// user's local calendar date.
#[derive(Debug, Clone, Deserialize)]
pub struct MedicationDraft {
  pub name:       String,
  pub dose:       Option<String>,
  pub times:      Vec<ScheduledTime>,
  pub start_date: Option<NaiveDate>,
  pub end_date:   Option<NaiveDate>,
  pub quantity:   Option<u32>,
}

impl MedicationDraft {
  /// Validate, using `default_start` when no start date was given.
  pub fn into_new(self, default_start: NaiveDate) -> Result<NewMedication> {
    NewMedication::new(
      self.name,
      self.dose,
      self.times,
      self.start_date.unwrap_or(default_start),
      self.end_date,
      self.quantity,
    )
  }
}
