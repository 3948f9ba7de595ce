//! Engine configuration, built once at startup and shared immutably.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{Result, clock};

/// The zone used when a user has no (usable) timezone on record.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Kolkata;

pub const DEFAULT_MINUTES_BEFORE: u32 = 15;
pub const DEFAULT_MINUTES_AFTER: u32 = 5;

/// What to do when a stored timezone identifier cannot be parsed.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TimezonePolicy {
  /// Use [`EngineConfig::default_timezone`] and log a warning.
  #[default]
  Fallback,
  /// Fail the request with [`crate::Error::UnknownTimezone`].
  Reject,
}

/// Defaults applied by [`crate::Tracker`] when a request leaves them out.
#[derive(Debug, Clone)]
pub struct EngineConfig {
  pub default_timezone: Tz,
  pub timezone_policy:  TimezonePolicy,
  /// Default reminder lookback, in minutes.
  pub minutes_before:   u32,
  /// Default reminder lookahead, in minutes.
  pub minutes_after:    u32,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      default_timezone: DEFAULT_TIMEZONE,
      timezone_policy:  TimezonePolicy::default(),
      minutes_before:   DEFAULT_MINUTES_BEFORE,
      minutes_after:    DEFAULT_MINUTES_AFTER,
    }
  }
}

impl EngineConfig {
  /// Resolve a user's stored zone identifier under the configured policy.
  pub fn zone_for(&self, timezone_id: Option<&str>) -> Result<Tz> {
    clock::resolve_zone(timezone_id, self.default_timezone, self.timezone_policy)
  }
}
