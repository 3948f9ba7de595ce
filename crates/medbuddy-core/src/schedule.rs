//! Fixed daily dose times and the date range a schedule applies to.
//!
//! A [`ScheduledTime`] carries no date and no timezone. It only becomes a
//! concrete instant once combined with a calendar date and the owning user's
//! zone (see [`crate::clock`]).

use std::{fmt, str::FromStr};

use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::{Error, Result};

// ─── ScheduledTime ───────────────────────────────────────────────────────────

/// A clock time with minute precision, written `HH:MM` (24-hour).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScheduledTime(NaiveTime);

impl ScheduledTime {
  pub fn new(hour: u32, minute: u32) -> Option<Self> {
    NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
  }

  pub fn hour(self) -> u32 { self.0.hour() }

  pub fn minute(self) -> u32 { self.0.minute() }

  pub fn as_naive(self) -> NaiveTime { self.0 }
}

impl FromStr for ScheduledTime {
  type Err = Error;

  /// Accepts exactly `HH:MM`. `8:00`, `08:00:00` and `0800` are rejected.
  fn from_str(s: &str) -> Result<Self> {
    let invalid = || Error::invalid(format!("expected HH:MM, got {s:?}"));

    let (h, m) = s.split_once(':').ok_or_else(invalid)?;
    let two_digits = |p: &str| p.len() == 2 && p.bytes().all(|b| b.is_ascii_digit());
    if !two_digits(h) || !two_digits(m) {
      return Err(invalid());
    }

    let hour: u32 = h.parse().map_err(|_| invalid())?;
    let minute: u32 = m.parse().map_err(|_| invalid())?;
    Self::new(hour, minute).ok_or_else(invalid)
  }
}

impl fmt::Display for ScheduledTime {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:02}:{:02}", self.hour(), self.minute())
  }
}

impl Serialize for ScheduledTime {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

impl<'de> Deserialize<'de> for ScheduledTime {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(de::Error::custom)
  }
}

/// Sort and de-duplicate a list of dose times. Callers store the result
/// wholesale; there is no partial merge with an existing schedule.
pub fn normalize_times(mut times: Vec<ScheduledTime>) -> Vec<ScheduledTime> {
  times.sort_unstable();
  times.dedup();
  times
}

// ─── ActiveRange ─────────────────────────────────────────────────────────────

/// The inclusive calendar-date range during which a medication is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveRange {
  pub from:  NaiveDate,
  /// `None` means open-ended.
  pub until: Option<NaiveDate>,
}

impl ActiveRange {
  /// Rejects ranges that end before they start.
  pub fn new(from: NaiveDate, until: Option<NaiveDate>) -> Result<Self> {
    if let Some(until) = until
      && until < from
    {
      return Err(Error::invalid(format!(
        "end date {until} is before start date {from}"
      )));
    }
    Ok(Self { from, until })
  }

  pub fn contains(&self, date: NaiveDate) -> bool {
    date >= self.from && self.until.is_none_or(|until| date <= until)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
  }

  #[test]
  fn parses_strict_hh_mm() {
    let t: ScheduledTime = "08:05".parse().unwrap();
    assert_eq!((t.hour(), t.minute()), (8, 5));
    assert_eq!(t.to_string(), "08:05");

    let midnight: ScheduledTime = "00:00".parse().unwrap();
    assert_eq!(midnight.to_string(), "00:00");
  }

  #[test]
  fn rejects_loose_time_formats() {
    for bad in ["8:00", "08:00:00", "0800", "24:00", "12:60", "ab:cd", ""] {
      assert!(bad.parse::<ScheduledTime>().is_err(), "{bad:?} should be rejected");
    }
  }

  #[test]
  fn serde_uses_hh_mm_strings() {
    let times: Vec<ScheduledTime> = serde_json::from_str(r#"["20:00","08:00"]"#).unwrap();
    assert_eq!(serde_json::to_string(&times).unwrap(), r#"["20:00","08:00"]"#);
    assert!(serde_json::from_str::<ScheduledTime>("800").is_err());
  }

  #[test]
  fn normalize_sorts_and_dedups() {
    let raw = ["20:00", "08:00", "20:00", "12:30"]
      .iter()
      .map(|s| s.parse().unwrap())
      .collect();
    let out: Vec<String> = normalize_times(raw).iter().map(ToString::to_string).collect();
    assert_eq!(out, ["08:00", "12:30", "20:00"]);
  }

  #[test]
  fn active_range_bounds_are_inclusive() {
    let range = ActiveRange::new(date(2025, 3, 1), Some(date(2025, 3, 10))).unwrap();
    assert!(!range.contains(date(2025, 2, 28)));
    assert!(range.contains(date(2025, 3, 1)));
    assert!(range.contains(date(2025, 3, 10)));
    assert!(!range.contains(date(2025, 3, 11)));

    let open = ActiveRange::new(date(2025, 3, 1), None).unwrap();
    assert!(open.contains(date(2030, 1, 1)));
  }

  #[test]
  fn active_range_rejects_inverted_dates() {
    assert!(ActiveRange::new(date(2025, 3, 10), Some(date(2025, 3, 1))).is_err());
    assert!(ActiveRange::new(date(2025, 3, 10), Some(date(2025, 3, 10))).is_ok());
  }
}
