//! Outbound notifications for newly admitted alerts.
//!
//! Delivery is best-effort: a failed send is logged and forgotten, and never
//! touches the alert set.

use std::{future::Future, sync::Arc};

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;

use crate::{
  alert::{Alert, AlertType, Priority},
  prefs::Preferences,
};

// ─── Payloads ────────────────────────────────────────────────────────────────

/// Body of a single-alert notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPayload {
  pub tracking_number: String,
  /// The shipment status snapshot recorded on the alert.
  pub status:          String,
  pub message:         String,
  pub title:           String,
}

impl From<&Alert> for AlertPayload {
  fn from(alert: &Alert) -> Self {
    Self {
      tracking_number: alert.tracking_number.clone(),
      status:          alert
        .metadata
        .get("status")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_owned(),
      message:         alert.message.clone(),
      title:           alert.title.clone(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestPayload {
  pub alerts: Vec<Alert>,
  pub count:  usize,
}

/// What gets handed to a [`Notifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum Notification {
  Alert(AlertPayload),
  Digest(DigestPayload),
}

impl Notification {
  pub fn kind(&self) -> &'static str {
    match self {
      Self::Alert(_) => "alert",
      Self::Digest(_) => "digest",
    }
  }
}

// ─── Port ────────────────────────────────────────────────────────────────────

/// Abstraction over a notification channel (email sender, webhook, ...).
///
/// Timeouts are the implementation's concern; a hung send only ever stalls
/// its own background task.
pub trait Notifier: Send + Sync + 'static {
  type Error: std::error::Error + Send + Sync + 'static;

  fn send(
    &self,
    recipient: String,
    notification: Notification,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Planning ────────────────────────────────────────────────────────────────

/// Admitted alerts split into what is sent right away and what is batched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationPlan {
  /// High priority; one notification each.
  pub immediate: Vec<Alert>,
  /// Everything else; one digest for all of them.
  pub digest:    Vec<Alert>,
}

impl NotificationPlan {
  pub fn is_empty(&self) -> bool {
    self.immediate.is_empty() && self.digest.is_empty()
  }

  /// The notifications this plan sends, immediate ones first.
  pub fn notifications(&self) -> Vec<Notification> {
    let mut out: Vec<Notification> = self
      .immediate
      .iter()
      .map(|a| Notification::Alert(a.into()))
      .collect();
    if !self.digest.is_empty() {
      out.push(Notification::Digest(DigestPayload {
        alerts: self.digest.clone(),
        count:  self.digest.len(),
      }));
    }
    out
  }
}

/// Filter `admitted` by the user's preferences and split by priority.
///
/// Nothing is planned when email notifications are off. Warnings need
/// `delay_alerts`; successes need `delivery_alerts`.
pub fn plan(admitted: &[Alert], prefs: &Preferences) -> NotificationPlan {
  if !prefs.email_notifications {
    return NotificationPlan::default();
  }

  let mut plan = NotificationPlan::default();
  for alert in admitted {
    let allowed = match alert.alert_type {
      AlertType::Warning => prefs.delay_alerts,
      AlertType::Success => prefs.delivery_alerts,
      AlertType::Info | AlertType::Error => true,
    };
    if !allowed {
      continue;
    }
    if alert.priority == Priority::High {
      plan.immediate.push(alert.clone());
    } else {
      plan.digest.push(alert.clone());
    }
  }
  plan
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

/// Outcome counts of one dispatch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
  pub sent:   usize,
  pub failed: usize,
}

/// Send every notification in `plan` concurrently. Failures are logged, not
/// returned.
pub async fn dispatch<N: Notifier>(
  notifier: Arc<N>,
  recipient: String,
  plan: NotificationPlan,
) -> DispatchSummary {
  let mut tasks = JoinSet::new();
  for notification in plan.notifications() {
    let notifier = Arc::clone(&notifier);
    let recipient = recipient.clone();
    tasks.spawn(async move {
      let kind = notification.kind();
      let result = notifier.send(recipient.clone(), notification).await;
      if let Err(e) = &result {
        tracing::warn!(%recipient, kind, error = %e, "notification failed");
      }
      result.is_ok()
    });
  }

  let mut summary = DispatchSummary::default();
  while let Some(joined) = tasks.join_next().await {
    match joined {
      Ok(true) => summary.sent += 1,
      Ok(false) => summary.failed += 1,
      Err(e) => {
        tracing::warn!(error = %e, "notification task panicked");
        summary.failed += 1;
      }
    }
  }
  tracing::debug!(sent = summary.sent, failed = summary.failed, "dispatch done");
  summary
}
