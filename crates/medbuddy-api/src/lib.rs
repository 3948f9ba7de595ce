//! JSON REST API for MedBuddy.
//!
//! Exposes an axum [`Router`] backed by any [`medbuddy_core::store::MedStore`].
//! Every route except `/register` and `/token` requires a bearer token.
//! TLS and request tracing are the caller's responsibility.

pub mod auth;
pub mod error;
pub mod meds;
pub mod reminders;
pub mod taken;
pub mod users;
pub mod vitals;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post, put},
};
use medbuddy_core::{Tracker, store::MedStore};

pub use auth::AuthConfig;
pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S> {
  pub tracker: Tracker<S>,
  pub auth:    Arc<AuthConfig>,
}

impl<S: MedStore> AppState<S> {
  pub fn new(tracker: Tracker<S>, auth: AuthConfig) -> Self {
    Self { tracker, auth: Arc::new(auth) }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router<()>
where
  S: MedStore + Clone + 'static,
{
  Router::new()
    // Identity
    .route("/register", post(users::register::<S>))
    .route("/token", post(users::token::<S>))
    .route("/me", get(users::me))
    // Medications
    .route("/meds", get(meds::list::<S>).post(meds::create::<S>))
    .route("/meds/{id}", put(meds::update::<S>).delete(meds::delete::<S>))
    // Adherence
    .route("/meds/{id}/take", post(taken::take::<S>).delete(taken::untake::<S>))
    .route("/taken", get(taken::list::<S>))
    .route("/reminders", get(reminders::handler::<S>))
    // Vitals
    .route("/vitals", get(vitals::list::<S>).post(vitals::create::<S>))
    .with_state(state)
}

// ─── Integration tests ───────────────────────────────────────────────────────
