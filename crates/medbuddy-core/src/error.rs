//! Error types for `medbuddy-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  /// The medication does not exist, or belongs to somebody else. The two
  /// cases are never distinguished.
  #[error("medication not found: {0}")]
  MedicationNotFound(Uuid),

  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("invalid input: {0}")]
  InvalidInput(String),

  #[error("unknown timezone: {0:?}")]
  UnknownTimezone(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a backend error so it can cross the core boundary.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }

  pub fn invalid(msg: impl Into<String>) -> Self { Self::InvalidInput(msg.into()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
