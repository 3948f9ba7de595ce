//! Core types and the adherence engine for MedBuddy.
//!
//! This crate is deliberately free of HTTP and database dependencies. Storage
//! is reached through the [`store::MedStore`] trait; the REST layer and the
//! SQLite backend both depend on this crate, never the other way round.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod adherence;
pub mod clock;
pub mod config;
pub mod error;
pub mod medication;
pub mod reminder;
pub mod schedule;
pub mod store;
pub mod tracker;
pub mod user;
pub mod vitals;

pub use config::{EngineConfig, TimezonePolicy};
pub use error::{Error, Result};
pub use tracker::Tracker;
