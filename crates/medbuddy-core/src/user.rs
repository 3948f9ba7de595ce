//! Users and the credential envelope the identity layer stores for them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An account that owns medications and vitals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:    Uuid,
  /// Lower-cased; unique across the store.
  pub email:      String,
  /// IANA zone identifier, e.g. `"Asia/Kolkata"`. Resolved through
  /// [`crate::EngineConfig::zone_for`], never parsed ad hoc.
  pub timezone:   String,
  pub created_at: DateTime<Utc>,
}

/// A user plus the password hash the identity layer verifies against.
/// The core never inspects `password_hash`.
#[derive(Debug, Clone)]
pub struct UserCredentials {
  pub user:          User,
  pub password_hash: String,
}

/// Input to [`crate::store::MedStore::add_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub email:         String,
  pub password_hash: String,
  pub timezone:      String,
}

/// A bearer session issued to a user.
#[derive(Debug, Clone)]
pub struct Session {
  /// SHA-256 hex digest of the bearer token; the token itself is never stored.
  pub token_hash: String,
  pub user_id:    Uuid,
  pub expires_at: DateTime<Utc>,
}
