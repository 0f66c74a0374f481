//! HTTP host for parcelwatch.
//!
//! Wires a store, a notification channel and the JSON API into one axum
//! application. The binary in `main.rs` only parses flags and configuration.

pub mod notifier;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use axum::Router;
use parcelwatch_core::{
  notify::Notifier,
  store::KeyValueStore,
  tracker::{Tracker, TrackerSettings},
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub use notifier::{ChannelNotifier, LogNotifier, NotifyError, WebhookNotifier};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `parcelwatch.toml` and
/// `PARCELWATCH_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  /// SQLite database file. Without one, state lives in memory only.
  #[serde(default)]
  pub store_path:          Option<PathBuf>,
  /// Notification recipient. Without one, nothing is sent.
  #[serde(default)]
  pub recipient:           Option<String>,
  #[serde(default)]
  pub premium:             bool,
  /// POST notifications here instead of logging them.
  #[serde(default)]
  pub webhook_url:         Option<String>,
  #[serde(default = "default_notify_timeout_secs")]
  pub notify_timeout_secs: u64,
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8080 }
fn default_notify_timeout_secs() -> u64 { 10 }

impl ServerConfig {
  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn tracker_settings(&self) -> TrackerSettings {
    TrackerSettings {
      recipient: self.recipient.clone(),
      premium:   self.premium,
    }
  }

  pub fn notifier(&self) -> Result<ChannelNotifier, NotifyError> {
    ChannelNotifier::from_config(
      self.webhook_url.as_deref(),
      Duration::from_secs(self.notify_timeout_secs),
    )
  }
}

// ─── Application ──────────────────────────────────────────────────────────────

/// The API mounted under `/api`, with request tracing.
pub fn app<S, N>(tracker: Arc<Tracker<S, N>>) -> Router
where
  S: KeyValueStore,
  N: Notifier,
{
  Router::new()
    .nest("/api", parcelwatch_api::api_router(tracker))
    .layer(TraceLayer::new_for_http())
}

/// Open the tracker over `store` and serve until the listener fails.
pub async fn serve<S: KeyValueStore>(store: S, cfg: &ServerConfig) -> anyhow::Result<()> {
  let notifier = cfg.notifier().context("failed to build notifier")?;
  if cfg.recipient.is_none() {
    tracing::warn!("no recipient configured; notifications are disabled");
  }

  let tracker =
    Arc::new(Tracker::open(store, notifier, cfg.tracker_settings()).await);
  let address = cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app(tracker)).await.context("server error")?;
  Ok(())
}
