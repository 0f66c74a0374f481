//! parcelwatch server binary.
//!
//! Reads `parcelwatch.toml` (or the path given with `--config`) plus
//! `PARCELWATCH_*` environment variables, opens the store and serves the
//! JSON API over HTTP.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use parcelwatch_core::store::MemoryStore;
use parcelwatch_server::ServerConfig;
use parcelwatch_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Parcelwatch shipment alert server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "parcelwatch.toml", env = "PARCELWATCH_CONFIG")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("PARCELWATCH"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  match &server_cfg.store_path {
    Some(path) => {
      let store_path = expand_tilde(path);
      if let Some(parent) = store_path.parent()
        && !parent.as_os_str().is_empty()
      {
        std::fs::create_dir_all(parent)
          .with_context(|| format!("failed to create {parent:?}"))?;
      }
      let store = SqliteStore::open(&store_path)
        .await
        .with_context(|| format!("failed to open store at {store_path:?}"))?;
      parcelwatch_server::serve(store, &server_cfg).await
    }
    None => {
      tracing::warn!("no store_path configured; state will not survive restart");
      parcelwatch_server::serve(MemoryStore::new(), &server_cfg).await
    }
  }
}

/// Resolve a leading `~` component against `$HOME`. Other paths, and `~`
/// when `$HOME` is unset, pass through untouched.
fn expand_tilde(path: &Path) -> PathBuf {
  match (path.strip_prefix("~"), std::env::var_os("HOME")) {
    (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
    _ => path.to_path_buf(),
  }
}
