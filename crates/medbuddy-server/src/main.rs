//! MedBuddy server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, and serves the JSON API over HTTP.
//!
//! ```sh
//! cargo run -p medbuddy-server -- --config config.toml
//! ```

mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use medbuddy_api::AppState;
use medbuddy_core::Tracker;
use medbuddy_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use settings::{ServerConfig, expand_tilde};

#[derive(Parser)]
#[command(author, version, about = "MedBuddy reminder and adherence server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Create (or migrate) the database and exit.
  #[arg(long)]
  init_db: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let server_cfg = ServerConfig::load(&cli.config)?;

  // Fail fast on a bad default zone or window, before touching the disk.
  let engine = server_cfg.engine()?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  if cli.init_db {
    tracing::info!(path = ?store_path, "database initialised");
    return Ok(());
  }

  tracing::info!(
    default_timezone = engine.default_timezone.name(),
    timezone_policy = ?engine.timezone_policy,
    minutes_before = engine.minutes_before,
    minutes_after = engine.minutes_after,
    "engine configured"
  );

  let state = AppState::new(Tracker::new(Arc::new(store), engine), server_cfg.auth());
  let app = medbuddy_api::router(state).layer(TraceLayer::new_for_http());
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
