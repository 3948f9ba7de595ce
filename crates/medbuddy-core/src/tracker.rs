//! [`Tracker`] — the request-scoped service that ties the reminder engine
//! and the adherence ledger to a [`MedStore`].
//!
//! Every operation takes the authenticated [`User`] and an explicit `now`;
//! nothing here reads the wall clock. A medication that belongs to another
//! user is reported exactly like a missing one.

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::{
  EngineConfig, Error, Result,
  adherence::{NewTakenRecord, TakeOutcome, TakenRecord, UntakeOutcome},
  clock::{TimeSpan, local_date, truncate_to_minute},
  medication::{Medication, MedicationDraft, MedicationSummary},
  reminder::{ReminderEntry, ReminderWindow, due_reminders},
  store::MedStore,
  user::User,
};

/// Cheap to clone; the store and configuration are reference-counted.
pub struct Tracker<S> {
  store:  Arc<S>,
  config: Arc<EngineConfig>,
}

impl<S> Clone for Tracker<S> {
  fn clone(&self) -> Self {
    Self {
      store:  Arc::clone(&self.store),
      config: Arc::clone(&self.config),
    }
  }
}

impl<S: MedStore> Tracker<S> {
  pub fn new(store: Arc<S>, config: EngineConfig) -> Self {
    Self { store, config: Arc::new(config) }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn config(&self) -> &EngineConfig { &self.config }

  /// The zone all of `user`'s instants are resolved in.
  pub fn zone(&self, user: &User) -> Result<Tz> {
    self.config.zone_for(Some(&user.timezone))
  }

  /// Fetch a medication, treating one owned by somebody else as absent.
  pub async fn owned_medication(&self, user: &User, medication_id: Uuid) -> Result<Medication> {
    self
      .store
      .get_medication(medication_id)
      .await
      .map_err(Error::store)?
      .filter(|med| med.user_id == user.user_id)
      .ok_or(Error::MedicationNotFound(medication_id))
  }

  // ── Reminders ─────────────────────────────────────────────────────────

  /// Doses of today that are due around `now` and not yet taken.
  ///
  /// Missing window sizes fall back to the configured defaults.
  pub async fn reminders(
    &self,
    user: &User,
    now: DateTime<Utc>,
    minutes_before: Option<i64>,
    minutes_after: Option<i64>,
  ) -> Result<Vec<ReminderEntry>> {
    let window = ReminderWindow::from_minutes(
      minutes_before.unwrap_or(i64::from(self.config.minutes_before)),
      minutes_after.unwrap_or(i64::from(self.config.minutes_after)),
    )?;
    let zone = self.zone(user)?;

    let medications = self
      .store
      .list_medications(user.user_id)
      .await
      .map_err(Error::store)?;

    // Every candidate instant lies on the user's local today.
    let today = TimeSpan::local_day(local_date(now, zone), zone);
    let taken: HashSet<_> = self
      .store
      .list_taken(user.user_id, Some(today))
      .await
      .map_err(Error::store)?
      .iter()
      .map(TakenRecord::key)
      .collect();

    Ok(due_reminders(now, zone, &medications, window, |id, at| {
      taken.contains(&(id, at))
    }))
  }

  // ── Adherence ─────────────────────────────────────────────────────────

  /// Mark a dose as taken.
  ///
  /// `scheduled_for` defaults to `now`; either way it is truncated to the
  /// minute. `taken_at` defaults to `now`. Marking the same dose twice
  /// yields [`TakeOutcome::AlreadyMarked`] with the original record.
  pub async fn mark_taken(
    &self,
    user: &User,
    medication_id: Uuid,
    scheduled_for: Option<DateTime<FixedOffset>>,
    taken_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
  ) -> Result<TakeOutcome> {
    self.owned_medication(user, medication_id).await?;

    let scheduled_for = match scheduled_for {
      Some(at) => truncate_to_minute(at),
      None => truncate_to_minute(now),
    };

    // Fast path only; the store's uniqueness constraint is what guarantees a
    // single record under concurrent requests.
    if let Some(existing) = self
      .store
      .find_taken(medication_id, scheduled_for)
      .await
      .map_err(Error::store)?
    {
      tracing::debug!(%medication_id, %scheduled_for, "dose already marked");
      return Ok(TakeOutcome::AlreadyMarked(existing));
    }

    let outcome = self
      .store
      .insert_taken(NewTakenRecord {
        medication_id,
        scheduled_for,
        taken_at: Some(taken_at.unwrap_or(now)),
      })
      .await
      .map_err(Error::store)?;

    tracing::info!(
      user_id = %user.user_id,
      %medication_id,
      %scheduled_for,
      status = outcome.status(),
      "marked dose taken"
    );
    Ok(outcome)
  }

  /// Remove the record for a dose. The instant is truncated exactly as in
  /// [`Self::mark_taken`].
  pub async fn unmark_taken(
    &self,
    user: &User,
    medication_id: Uuid,
    scheduled_for: DateTime<FixedOffset>,
  ) -> Result<UntakeOutcome> {
    self.owned_medication(user, medication_id).await?;

    let scheduled_for = truncate_to_minute(scheduled_for);
    let removed = self
      .store
      .delete_taken(medication_id, scheduled_for)
      .await
      .map_err(Error::store)?;

    if removed {
      tracing::info!(user_id = %user.user_id, %medication_id, %scheduled_for, "unmarked dose");
      Ok(UntakeOutcome::Removed)
    } else {
      Ok(UntakeOutcome::NotFound)
    }
  }

  /// All of `user`'s taken records, or only those scheduled on `date`
  /// (a calendar date in the user's zone).
  pub async fn list_taken(&self, user: &User, date: Option<NaiveDate>) -> Result<Vec<TakenRecord>> {
    let span = match date {
      Some(date) => Some(TimeSpan::local_day(date, self.zone(user)?)),
      None => None,
    };

    let mut records = self
      .store
      .list_taken(user.user_id, span)
      .await
      .map_err(Error::store)?;
    records.sort_by(|a, b| {
      a.scheduled_for
        .cmp(&b.scheduled_for)
        .then_with(|| a.medication_id.cmp(&b.medication_id))
    });
    Ok(records)
  }

  // ── Medication lifecycle ──────────────────────────────────────────────

  /// Create a medication. A missing start date means "today" in the user's
  /// zone.
  pub async fn create_medication(
    &self,
    user: &User,
    draft: MedicationDraft,
    now: DateTime<Utc>,
  ) -> Result<Medication> {
    let today = local_date(now, self.zone(user)?);
    let input = draft.into_new(today)?;

    let med = self
      .store
      .add_medication(user.user_id, input)
      .await
      .map_err(Error::store)?;

    tracing::info!(
      user_id = %user.user_id,
      medication_id = %med.medication_id,
      times = med.times.len(),
      "created medication"
    );
    Ok(med)
  }

  /// Replace a medication wholesale. A missing start date keeps the current
  /// one.
  pub async fn update_medication(
    &self,
    user: &User,
    medication_id: Uuid,
    draft: MedicationDraft,
  ) -> Result<Medication> {
    let current = self.owned_medication(user, medication_id).await?;
    let input = draft.into_new(current.active.from)?;

    let med = self
      .store
      .replace_medication(medication_id, input)
      .await
      .map_err(Error::store)?
      .ok_or(Error::MedicationNotFound(medication_id))?;

    tracing::info!(user_id = %user.user_id, %medication_id, "replaced medication");
    Ok(med)
  }

  /// Delete a medication along with its schedule and ledger entries.
  pub async fn delete_medication(&self, user: &User, medication_id: Uuid) -> Result<()> {
    self.owned_medication(user, medication_id).await?;

    let deleted = self
      .store
      .delete_medication(medication_id)
      .await
      .map_err(Error::store)?;
    if !deleted {
      return Err(Error::MedicationNotFound(medication_id));
    }

    tracing::info!(user_id = %user.user_id, %medication_id, "deleted medication");
    Ok(())
  }

  /// The user's medications with remaining stock, sorted by name.
  pub async fn list_medications(&self, user: &User) -> Result<Vec<MedicationSummary>> {
    let medications = self
      .store
      .list_medications(user.user_id)
      .await
      .map_err(Error::store)?;
    let counts = self
      .store
      .taken_counts(user.user_id)
      .await
      .map_err(Error::store)?;

    let mut summaries: Vec<MedicationSummary> = medications
      .into_iter()
      .map(|medication| {
        let taken = counts.get(&medication.medication_id).copied().unwrap_or(0);
        let quantity_left = medication
          .quantity
          .map(|q| i64::from(q) - i64::try_from(taken).unwrap_or(i64::MAX));
        MedicationSummary { medication, quantity_left }
      })
      .collect();

    summaries.sort_by(|a, b| {
      a.medication
        .name
        .cmp(&b.medication.name)
        .then_with(|| a.medication.created_at.cmp(&b.medication.created_at))
    });
    Ok(summaries)
  }
}
