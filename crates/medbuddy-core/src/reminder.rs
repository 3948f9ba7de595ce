//! The reminder window engine.
//!
//! Given "now", a user's zone and medications, and a way to ask whether a
//! dose was already acknowledged, [`due_reminders`] lists every dose of
//! today whose scheduled instant falls inside
//! `[now - before, now + after]`, both ends inclusive.

use chrono::{DateTime, Duration, FixedOffset, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  clock::{local_date, resolve_instant, with_fixed_offset},
  medication::Medication,
};

/// Upper bound on either side of the window (one week).
pub const MAX_WINDOW_MINUTES: i64 = 7 * 24 * 60;

// ─── Window ──────────────────────────────────────────────────────────────────

/// Tolerances around "now" within which a dose counts as due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderWindow {
  pub before: Duration,
  pub after:  Duration,
}

impl ReminderWindow {
  /// Build a window from signed minute counts as they arrive from callers.
  /// Zero is allowed on either side; negative values are rejected.
  pub fn from_minutes(before: i64, after: i64) -> Result<Self> {
    for (label, value) in [("minutes_before", before), ("minutes_after", after)] {
      if value < 0 {
        return Err(Error::invalid(format!("{label} must not be negative, got {value}")));
      }
      if value > MAX_WINDOW_MINUTES {
        return Err(Error::invalid(format!(
          "{label} must be at most {MAX_WINDOW_MINUTES}, got {value}"
        )));
      }
    }
    Ok(Self {
      before: Duration::minutes(before),
      after:  Duration::minutes(after),
    })
  }

  /// The inclusive `(start, end)` bounds of the window around `now`.
  pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (now - self.before, now + self.after)
  }
}

// ─── Entries ─────────────────────────────────────────────────────────────────

/// One dose that is due and not yet acknowledged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderEntry {
  pub medication_id: Uuid,
  pub name:          String,
  pub dose:          Option<String>,
  /// Rendered with the user's UTC offset for that date, e.g.
  /// `2025-01-15T08:00:00+05:30`.
  pub scheduled_for: DateTime<FixedOffset>,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Compute the doses due around `now` for a user living in `zone`.
///
/// `is_taken` is consulted with the minute-precise UTC instant of each
/// candidate; entries it reports as acknowledged are dropped. The result is
/// sorted by scheduled instant, then name, then medication id, regardless of
/// the order `medications` arrived in.
pub fn due_reminders<F>(
  now: DateTime<Utc>,
  zone: Tz,
  medications: &[Medication],
  window: ReminderWindow,
  is_taken: F,
) -> Vec<ReminderEntry>
where
  F: Fn(Uuid, DateTime<Utc>) -> bool,
{
  let (start, end) = window.bounds(now);
  // "Today" is the user's calendar date, not the server's.
  let today = local_date(now, zone);
  let is_taken = &is_taken;

  let mut due: Vec<ReminderEntry> = medications
    .iter()
    .filter(|med| med.is_active_on(today))
    .flat_map(|med| {
      med.times.iter().filter_map(move |&time| {
        let at = resolve_instant(time, today, zone);
        let at_utc = at.with_timezone(&Utc);
        let in_window = start <= at_utc && at_utc <= end;
        (in_window && !is_taken(med.medication_id, at_utc)).then(|| ReminderEntry {
          medication_id: med.medication_id,
          name:          med.name.clone(),
          dose:          med.dose.clone(),
          scheduled_for: with_fixed_offset(at),
        })
      })
    })
    .collect();

  due.sort_by(|a, b| {
    a.scheduled_for
      .cmp(&b.scheduled_for)
      .then_with(|| a.name.cmp(&b.name))
      .then_with(|| a.medication_id.cmp(&b.medication_id))
  });

  tracing::debug!(
    %now,
    zone = zone.name(),
    %start,
    %end,
    due = due.len(),
    "computed reminders"
  );

  due
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use chrono::NaiveDate;
  use chrono_tz::{Asia::Kolkata, UTC};

  use super::*;
  use crate::schedule::{ActiveRange, ScheduledTime};

  fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
  }

  fn date(s: &str) -> NaiveDate { s.parse().unwrap() }

  fn med(name: &str, times: &[&str], from: &str, until: Option<&str>) -> Medication {
    Medication {
      medication_id: Uuid::new_v4(),
      user_id:       Uuid::nil(),
      name:          name.to_owned(),
      dose:          Some("1 tablet".to_owned()),
      times:         times.iter().map(|t| t.parse::<ScheduledTime>().unwrap()).collect(),
      active:        ActiveRange::new(date(from), until.map(date)).unwrap(),
      quantity:      None,
      created_at:    utc("2025-01-01T00:00:00Z"),
    }
  }

  fn default_window() -> ReminderWindow { ReminderWindow::from_minutes(15, 5).unwrap() }

  fn never_taken(_: Uuid, _: DateTime<Utc>) -> bool { false }

  #[test]
  fn window_rejects_negative_minutes() {
    assert!(ReminderWindow::from_minutes(-1, 5).is_err());
    assert!(ReminderWindow::from_minutes(15, -5).is_err());
    assert!(ReminderWindow::from_minutes(0, 0).is_ok());
    assert!(ReminderWindow::from_minutes(MAX_WINDOW_MINUTES + 1, 0).is_err());
  }

  #[test]
  fn window_bounds_are_inclusive() {
    let meds = [med("A", &["07:45", "07:44", "08:05", "08:06"], "2025-01-01", None)];
    let now = utc("2025-01-15T08:00:00Z");

    let due = due_reminders(now, UTC, &meds, default_window(), never_taken);
    let times: Vec<String> = due
      .iter()
      .map(|r| r.scheduled_for.format("%H:%M").to_string())
      .collect();
    assert_eq!(times, ["07:45", "08:05"]);
  }

  #[test]
  fn zero_window_matches_exact_instant_only() {
    let meds = [med("A", &["08:00", "08:01"], "2025-01-01", None)];
    let window = ReminderWindow::from_minutes(0, 0).unwrap();

    let due = due_reminders(utc("2025-01-15T08:00:00Z"), UTC, &meds, window, never_taken);
    assert_eq!(due.len(), 1);

    let due = due_reminders(utc("2025-01-15T08:00:30Z"), UTC, &meds, window, never_taken);
    assert!(due.is_empty());
  }

  #[test]
  fn active_range_gates_medications() {
    let now = utc("2025-01-15T08:00:00Z");
    let meds = [
      med("Future", &["08:00"], "2025-01-16", None),
      med("Expired", &["08:00"], "2025-01-01", Some("2025-01-14")),
      med("Last day", &["08:00"], "2025-01-01", Some("2025-01-15")),
      med("First day", &["08:00"], "2025-01-15", None),
    ];

    let due = due_reminders(now, UTC, &meds, default_window(), never_taken);
    let names: Vec<&str> = due.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["First day", "Last day"]);
  }

  #[test]
  fn user_zone_decides_inclusion() {
    let meds = [med("A", &["08:00"], "2025-01-01", None)];
    // 02:35 UTC is 08:05 in Kolkata.
    let now = utc("2025-01-15T02:35:00Z");

    let due = due_reminders(now, Kolkata, &meds, default_window(), never_taken);
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].scheduled_for.to_rfc3339(), "2025-01-15T08:00:00+05:30");

    assert!(due_reminders(now, UTC, &meds, default_window(), never_taken).is_empty());
  }

  #[test]
  fn today_is_the_users_date_not_utcs() {
    // 20:00 UTC on the 15th is 01:30 on the 16th in Kolkata.
    let now = utc("2025-01-15T20:00:00Z");
    let meds = [
      med("Starts 16th", &["01:30"], "2025-01-16", None),
      med("Ended 15th", &["01:30"], "2025-01-01", Some("2025-01-15")),
    ];

    let due = due_reminders(now, Kolkata, &meds, default_window(), never_taken);
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].name, "Starts 16th");
    assert_eq!(due[0].scheduled_for.with_timezone(&Utc), now);
    assert_eq!(due[0].scheduled_for.to_rfc3339(), "2025-01-16T01:30:00+05:30");
  }

  #[test]
  fn acknowledged_doses_are_suppressed() {
    let paracetamol = med("Paracetamol", &["08:00", "20:00"], "2025-01-15", None);
    let now = utc("2025-01-15T08:02:00Z");

    let due = due_reminders(now, UTC, std::slice::from_ref(&paracetamol), default_window(), never_taken);
    assert_eq!(due.len(), 1);

    let taken: HashSet<_> = [(paracetamol.medication_id, utc("2025-01-15T08:00:00Z"))].into();
    let due = due_reminders(now, UTC, &[paracetamol], default_window(), |id, at| {
      taken.contains(&(id, at))
    });
    assert!(due.is_empty());
  }

  #[test]
  fn medication_without_times_yields_nothing() {
    let mut empty = med("Empty", &["08:00"], "2025-01-01", None);
    empty.times.clear();
    let due = due_reminders(utc("2025-01-15T08:00:00Z"), UTC, &[empty], default_window(), never_taken);
    assert!(due.is_empty());
  }

  #[test]
  fn output_is_sorted_independent_of_input_order() {
    let meds = [
      med("Zinc", &["08:05"], "2025-01-01", None),
      med("Vitamin D", &["08:00"], "2025-01-01", None),
      med("Aspirin", &["08:05"], "2025-01-01", None),
    ];
    let now = utc("2025-01-15T08:00:00Z");

    let forward = due_reminders(now, UTC, &meds, default_window(), never_taken);
    let mut reversed_input = meds.clone();
    reversed_input.reverse();
    let backward = due_reminders(now, UTC, &reversed_input, default_window(), never_taken);

    let names: Vec<&str> = forward.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["Vitamin D", "Aspirin", "Zinc"]);
    assert_eq!(forward, backward);
  }
}
