//! Notification channels behind the core [`Notifier`] port.

use std::time::Duration;

use parcelwatch_core::notify::{Notification, Notifier};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),
}

// ─── Log ──────────────────────────────────────────────────────────────────────

/// Emits each notification as a structured log event. Never fails.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  type Error = NotifyError;

  async fn send(
    &self,
    recipient: String,
    notification: Notification,
  ) -> Result<(), NotifyError> {
    match &notification {
      Notification::Alert(p) => tracing::info!(
        %recipient,
        tracking_number = %p.tracking_number,
        status = %p.status,
        title = %p.title,
        "alert notification: {}",
        p.message
      ),
      Notification::Digest(d) => tracing::info!(
        %recipient,
        count = d.count,
        "digest notification"
      ),
    }
    Ok(())
  }
}

// ─── Webhook ──────────────────────────────────────────────────────────────────

/// POSTs each notification as JSON to a fixed URL.
///
/// The client timeout bounds every send; a non-2xx response is a failure.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
  client: reqwest::Client,
  url:    String,
}

#[derive(Serialize)]
struct WebhookBody<'a> {
  recipient:    &'a str,
  notification: &'a Notification,
}

impl WebhookNotifier {
  pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self { client, url: url.into() })
  }
}

impl Notifier for WebhookNotifier {
  type Error = NotifyError;

  async fn send(
    &self,
    recipient: String,
    notification: Notification,
  ) -> Result<(), NotifyError> {
    self
      .client
      .post(&self.url)
      .json(&WebhookBody { recipient: &recipient, notification: &notification })
      .send()
      .await?
      .error_for_status()?;
    Ok(())
  }
}

// ─── Selection ────────────────────────────────────────────────────────────────

/// The channel chosen by configuration.
#[derive(Debug, Clone)]
pub enum ChannelNotifier {
  Log(LogNotifier),
  Webhook(WebhookNotifier),
}

impl ChannelNotifier {
  /// Webhook when a URL is configured, log otherwise.
  pub fn from_config(
    webhook_url: Option<&str>,
    timeout: Duration,
  ) -> Result<Self, NotifyError> {
    match webhook_url {
      Some(url) => Ok(Self::Webhook(WebhookNotifier::new(url, timeout)?)),
      None => Ok(Self::Log(LogNotifier)),
    }
  }
}

impl Notifier for ChannelNotifier {
  type Error = NotifyError;

  async fn send(
    &self,
    recipient: String,
    notification: Notification,
  ) -> Result<(), NotifyError> {
    match self {
      Self::Log(n) => n.send(recipient, notification).await,
      Self::Webhook(n) => n.send(recipient, notification).await,
    }
  }
}

#[cfg(test)]
mod tests {
  use parcelwatch_core::notify::DigestPayload;

  use super::*;

  fn digest() -> Notification {
    Notification::Digest(DigestPayload { alerts: vec![], count: 0 })
  }

  #[test]
  fn selects_webhook_only_with_url() {
    let timeout = Duration::from_secs(5);
    assert!(matches!(
      ChannelNotifier::from_config(None, timeout).unwrap(),
      ChannelNotifier::Log(_)
    ));
    assert!(matches!(
      ChannelNotifier::from_config(Some("http://localhost:9/hook"), timeout)
        .unwrap(),
      ChannelNotifier::Webhook(_)
    ));
  }

  #[tokio::test]
  async fn log_notifier_always_succeeds() {
    let n = ChannelNotifier::Log(LogNotifier);
    assert!(n.send("me@example.com".into(), digest()).await.is_ok());
  }

  #[tokio::test]
  async fn unreachable_webhook_is_an_error() {
    // Port 9 (discard) on localhost is not expected to accept HTTP.
    let n = WebhookNotifier::new("http://127.0.0.1:9/hook", Duration::from_millis(500))
      .unwrap();
    assert!(n.send("me@example.com".into(), digest()).await.is_err());
  }

  #[test]
  fn webhook_body_shape() {
    let n = digest();
    let body = WebhookBody { recipient: "me@example.com", notification: &n };
    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(json["recipient"], "me@example.com");
    assert_eq!(json["notification"]["kind"], "digest");
    assert_eq!(json["notification"]["payload"]["count"], 0);
  }
}
