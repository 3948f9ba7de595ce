//! Vital-sign readings. Plain records with no scheduling behaviour.

use chrono::{DateTime, SubsecRound as _, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vitals {
  pub vitals_id:   Uuid,
  pub user_id:     Uuid,
  /// Blood pressure, mmHg.
  pub systolic:    Option<u16>,
  pub diastolic:   Option<u16>,
  /// Beats per minute.
  pub heart_rate:  Option<u16>,
  /// Degrees Celsius.
  pub temperature: Option<f64>,
  pub record_time: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVitals {
  pub systolic:    Option<u16>,
  pub diastolic:   Option<u16>,
  pub heart_rate:  Option<u16>,
  pub temperature: Option<f64>,
  pub record_time: DateTime<Utc>,
}

impl NewVitals {
  pub fn new(
    systolic: Option<u16>,
    diastolic: Option<u16>,
    heart_rate: Option<u16>,
    temperature: Option<f64>,
    record_time: DateTime<Utc>,
  ) -> Result<Self> {
    if systolic.is_some() != diastolic.is_some() {
      return Err(Error::invalid(
        "systolic and diastolic must be recorded together",
      ));
    }
    if temperature.is_some_and(|t| !t.is_finite()) {
      return Err(Error::invalid("temperature must be a finite number"));
    }
    // Stored at whole-second precision.
    let record_time = record_time.trunc_subsecs(0);
    Ok(Self { systolic, diastolic, heart_rate, temperature, record_time })
  }
}
