//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Instants are stored as RFC 3339 UTC strings with second precision and a
//! `Z` suffix, so string comparison orders them chronologically. Calendar
//! dates are `YYYY-MM-DD`, dose times `HH:MM`, UUIDs hyphenated lowercase.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use medbuddy_core::{
  adherence::TakenRecord,
  medication::Medication,
  schedule::{ActiveRange, ScheduledTime},
  user::User,
  vitals::Vitals,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("instant {s:?}: {e}")))
}

// ─── NaiveDate ────────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| Error::Decode(format!("date {s:?}: {e}")))
}

// ─── ScheduledTime ────────────────────────────────────────────────────────────

pub fn encode_time(t: ScheduledTime) -> String { t.to_string() }

pub fn decode_time(s: &str) -> Result<ScheduledTime> {
  s.parse()
    .map_err(|e| Error::Decode(format!("dose time {s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:    String,
  pub email:      String,
  pub timezone:   String,
  pub created_at: String,
}

impl RawUser {
  /// Column list matching the field order expected by [`Self::from_row`].
  pub const COLUMNS: &'static str = "user_id, email, timezone, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:    row.get(0)?,
      email:      row.get(1)?,
      timezone:   row.get(2)?,
      created_at: row.get(3)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:    decode_uuid(&self.user_id)?,
      email:      self.email,
      timezone:   self.timezone,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `medications` row.
pub struct RawMedication {
  pub medication_id: String,
  pub user_id:       String,
  pub name:          String,
  pub dose:          Option<String>,
  pub active_from:   String,
  pub active_until:  Option<String>,
  pub quantity:      Option<i64>,
  pub created_at:    String,
}

impl RawMedication {
  pub const COLUMNS: &'static str = "medication_id, user_id, name, dose, \
     active_from, active_until, quantity, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      medication_id: row.get(0)?,
      user_id:       row.get(1)?,
      name:          row.get(2)?,
      dose:          row.get(3)?,
      active_from:   row.get(4)?,
      active_until:  row.get(5)?,
      quantity:      row.get(6)?,
      created_at:    row.get(7)?,
    })
  }

  /// Combine with the raw `HH:MM` strings from `schedule_times`.
  pub fn into_medication(self, raw_times: &[String]) -> Result<Medication> {
    let mut times = raw_times
      .iter()
      .map(|t| decode_time(t))
      .collect::<Result<Vec<_>>>()?;
    times.sort_unstable();

    let from = decode_date(&self.active_from)?;
    let until = self.active_until.as_deref().map(decode_date).transpose()?;
    let quantity = self
      .quantity
      .map(u32::try_from)
      .transpose()
      .map_err(|e| Error::Decode(format!("quantity: {e}")))?;

    Ok(Medication {
      medication_id: decode_uuid(&self.medication_id)?,
      user_id: decode_uuid(&self.user_id)?,
      name: self.name,
      dose: self.dose,
      times,
      active: ActiveRange::new(from, until)?,
      quantity,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Attach times, grouped by medication id, to a batch of medication rows.
pub fn assemble_medications(
  raws: Vec<RawMedication>,
  time_rows: Vec<(String, String)>,
) -> Result<Vec<Medication>> {
  let mut by_med: HashMap<String, Vec<String>> = HashMap::new();
  for (medication_id, time) in time_rows {
    by_med.entry(medication_id).or_default().push(time);
  }

  raws
    .into_iter()
    .map(|raw| {
      let times = by_med.remove(&raw.medication_id).unwrap_or_default();
      raw.into_medication(&times)
    })
    .collect()
}

/// Raw values read directly from a `taken_records` row.
pub struct RawTaken {
  pub taken_id:      String,
  pub medication_id: String,
  pub scheduled_for: String,
  pub taken_at:      Option<String>,
}

impl RawTaken {
  pub const COLUMNS: &'static str = "taken_id, medication_id, scheduled_for, taken_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      taken_id:      row.get(0)?,
      medication_id: row.get(1)?,
      scheduled_for: row.get(2)?,
      taken_at:      row.get(3)?,
    })
  }

  pub fn into_record(self) -> Result<TakenRecord> {
    Ok(TakenRecord {
      taken_id:      decode_uuid(&self.taken_id)?,
      medication_id: decode_uuid(&self.medication_id)?,
      scheduled_for: decode_dt(&self.scheduled_for)?,
      taken_at:      self.taken_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw values read directly from a `vitals` row.
pub struct RawVitals {
  pub vitals_id:   String,
  pub user_id:     String,
  pub systolic:    Option<i64>,
  pub diastolic:   Option<i64>,
  pub heart_rate:  Option<i64>,
  pub temperature: Option<f64>,
  pub record_time: String,
}

impl RawVitals {
  pub const COLUMNS: &'static str =
    "vitals_id, user_id, systolic, diastolic, heart_rate, temperature, record_time";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      vitals_id:   row.get(0)?,
      user_id:     row.get(1)?,
      systolic:    row.get(2)?,
      diastolic:   row.get(3)?,
      heart_rate:  row.get(4)?,
      temperature: row.get(5)?,
      record_time: row.get(6)?,
    })
  }

  pub fn into_vitals(self) -> Result<Vitals> {
    let small = |label: &str, v: Option<i64>| -> Result<Option<u16>> {
      v.map(u16::try_from)
        .transpose()
        .map_err(|e| Error::Decode(format!("{label}: {e}")))
    };

    Ok(Vitals {
      vitals_id:   decode_uuid(&self.vitals_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      systolic:    small("systolic", self.systolic)?,
      diastolic:   small("diastolic", self.diastolic)?,
      heart_rate:  small("heart_rate", self.heart_rate)?,
      temperature: self.temperature,
      record_time: decode_dt(&self.record_time)?,
    })
  }
}
