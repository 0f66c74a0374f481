//! User notification preferences.

use serde::{Deserialize, Serialize};

/// Read-only from the lifecycle manager's point of view; the user edits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
  /// Master switch: nothing is sent when this is off.
  pub email_notifications: bool,
  /// Allow `warning` alerts (delays, overdue) to be sent.
  pub delay_alerts:        bool,
  /// Allow `success` alerts (deliveries) to be sent.
  pub delivery_alerts:     bool,
  pub weekly_digest:       bool,
}

impl Default for Preferences {
  fn default() -> Self {
    Self {
      email_notifications: true,
      delay_alerts:        true,
      delivery_alerts:     true,
      weekly_digest:       true,
    }
  }
}
