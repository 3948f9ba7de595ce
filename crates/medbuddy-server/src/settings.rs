//! Runtime configuration, deserialised from `config.toml` and `MEDBUDDY_*`
//! environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use medbuddy_api::AuthConfig;
use medbuddy_core::{
  EngineConfig, TimezonePolicy,
  clock::parse_zone,
  config::{DEFAULT_MINUTES_AFTER, DEFAULT_MINUTES_BEFORE},
  reminder::ReminderWindow,
};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  #[serde(default = "default_timezone")]
  pub default_timezone:    String,
  #[serde(default)]
  pub timezone_policy:     TimezonePolicy,
  #[serde(default = "default_minutes_before")]
  pub minutes_before:      u32,
  #[serde(default = "default_minutes_after")]
  pub minutes_after:       u32,
  #[serde(default = "default_session_ttl")]
  pub session_ttl_minutes: u32,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8000 }
fn default_store_path() -> PathBuf { PathBuf::from("medbuddy.db") }
fn default_timezone() -> String { "Asia/Kolkata".to_owned() }
fn default_minutes_before() -> u32 { DEFAULT_MINUTES_BEFORE }
fn default_minutes_after() -> u32 { DEFAULT_MINUTES_AFTER }
fn default_session_ttl() -> u32 { 7 * 24 * 60 }

impl ServerConfig {
  /// Load from an optional TOML file, then let the environment override it.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("MEDBUDDY"))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  /// The engine defaults. Fails on an unknown default zone or an
  /// out-of-range window.
  pub fn engine(&self) -> anyhow::Result<EngineConfig> {
    let default_timezone = parse_zone(&self.default_timezone)
      .with_context(|| format!("unknown default_timezone {:?}", self.default_timezone))?;
    ReminderWindow::from_minutes(self.minutes_before.into(), self.minutes_after.into())
      .context("invalid default reminder window")?;

    Ok(EngineConfig {
      default_timezone,
      timezone_policy: self.timezone_policy,
      minutes_before: self.minutes_before,
      minutes_after: self.minutes_after,
    })
  }

  pub fn auth(&self) -> AuthConfig {
    AuthConfig {
      session_ttl: chrono::Duration::minutes(self.session_ttl_minutes.into()),
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
