//! Timezone resolution: turning a clock time and a calendar date into an
//! unambiguous instant in a user's zone.
//!
//! Everything here is a pure function of its inputs and the bundled IANA
//! zone database.

use chrono::{
  DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveDateTime,
  NaiveTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::{Error, Result, config::TimezonePolicy, schedule::ScheduledTime};

// ─── Zones ───────────────────────────────────────────────────────────────────

/// Parse an IANA zone identifier such as `"Asia/Kolkata"` or `"UTC"`.
pub fn parse_zone(timezone_id: &str) -> Option<Tz> {
  timezone_id.trim().parse::<Tz>().ok()
}

/// Pick the zone to use for a user.
///
/// A missing identifier always yields `default`. An unparseable one yields
/// `default` under [`TimezonePolicy::Fallback`] and an error under
/// [`TimezonePolicy::Reject`].
pub fn resolve_zone(
  timezone_id: Option<&str>,
  default: Tz,
  policy: TimezonePolicy,
) -> Result<Tz> {
  let Some(id) = timezone_id.map(str::trim).filter(|id| !id.is_empty()) else {
    return Ok(default);
  };

  match (parse_zone(id), policy) {
    (Some(zone), _) => Ok(zone),
    (None, TimezonePolicy::Fallback) => {
      tracing::warn!(
        timezone = id,
        fallback = default.name(),
        "unknown timezone on record; falling back to default"
      );
      Ok(default)
    }
    (None, TimezonePolicy::Reject) => Err(Error::UnknownTimezone(id.to_owned())),
  }
}

// ─── Instants ────────────────────────────────────────────────────────────────

/// Combine a dose time with a calendar date inside `zone`.
pub fn resolve_instant(time: ScheduledTime, date: NaiveDate, zone: Tz) -> DateTime<Tz> {
  resolve_local(date.and_time(time.as_naive()), zone)
}

/// Map a wall-clock reading to a single instant.
///
/// Repeated wall times (DST fall-back) take the earlier instant. Skipped wall
/// times (DST spring-forward) are read with the offset in force before the
/// transition, which places them just after the gap.
pub fn resolve_local(naive: NaiveDateTime, zone: Tz) -> DateTime<Tz> {
  match zone.from_local_datetime(&naive) {
    LocalResult::Single(dt) => dt,
    LocalResult::Ambiguous(earliest, _) => earliest,
    LocalResult::None => {
      let before = zone
        .offset_from_utc_datetime(&(naive - Duration::days(1)))
        .fix();
      let utc = naive - Duration::seconds(i64::from(before.local_minus_utc()));
      zone.from_utc_datetime(&utc)
    }
  }
}

/// The calendar date `now` falls on in `zone`.
pub fn local_date(now: DateTime<Utc>, zone: Tz) -> NaiveDate {
  now.with_timezone(&zone).date_naive()
}

/// Drop the zone rules and keep only the concrete offset, which is what gets
/// rendered on the wire.
pub fn with_fixed_offset(dt: DateTime<Tz>) -> DateTime<FixedOffset> {
  dt.with_timezone(&dt.offset().fix())
}

/// Parse an RFC 3339 instant. Strings without an explicit offset are rejected.
pub fn parse_instant(s: &str) -> Result<DateTime<FixedOffset>> {
  DateTime::parse_from_rfc3339(s.trim()).map_err(|e| {
    Error::invalid(format!(
      "expected an RFC 3339 instant with offset, got {s:?}: {e}"
    ))
  })
}

/// Discard seconds and sub-second precision. Take and untake both pass their
/// instants through here so that they meet on the same natural key.
pub fn truncate_to_minute<Tz2: TimeZone>(dt: DateTime<Tz2>) -> DateTime<Utc> {
  let secs = dt.timestamp();
  let floored = secs - secs.rem_euclid(60);
  DateTime::from_timestamp(floored, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

// ─── Spans ───────────────────────────────────────────────────────────────────

/// A half-open span of instants, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSpan {
  pub start: DateTime<Utc>,
  pub end:   DateTime<Utc>,
}

impl TimeSpan {
  /// The local day `date` in `zone`, from its first instant up to the first
  /// instant of the following day. Days may be 23 or 25 hours long.
  pub fn local_day(date: NaiveDate, zone: Tz) -> Self {
    let start = resolve_local(date.and_time(NaiveTime::MIN), zone);
    let next = date.succ_opt().unwrap_or(date);
    let end = resolve_local(next.and_time(NaiveTime::MIN), zone);
    Self {
      start: start.with_timezone(&Utc),
      end:   end.with_timezone(&Utc),
    }
  }

  pub fn contains(&self, instant: DateTime<Utc>) -> bool {
    instant >= self.start && instant < self.end
  }
}
