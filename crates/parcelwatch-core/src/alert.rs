//! Alert types: the notifications derived from shipment state.
//!
//! Alerts are created only by the rule engine's output passing admission in
//! [`crate::lifecycle::ingest`]; afterwards only the dismissed/read flags ever
//! change.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shipment::Shipment;

// ─── Classification ──────────────────────────────────────────────────────────

/// UI severity class.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AlertType {
  Info,
  Warning,
  Error,
  Success,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Priority {
  High,
  Medium,
  Low,
}

/// Which rule produced an alert. Each kind fixes the alert's type, priority,
/// title and icon.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertKind {
  Overdue,
  WeatherDelay,
  CustomsDelay,
  AddressIssue,
  Delayed,
  OutForDelivery,
  Delivered,
  Stuck,
  UnusualRouting,
  CarrierPattern,
}

impl AlertKind {
  pub fn alert_type(self) -> AlertType {
    match self {
      Self::OutForDelivery => AlertType::Info,
      Self::Delivered => AlertType::Success,
      Self::Stuck => AlertType::Error,
      Self::Overdue
      | Self::WeatherDelay
      | Self::CustomsDelay
      | Self::AddressIssue
      | Self::Delayed
      | Self::UnusualRouting
      | Self::CarrierPattern => AlertType::Warning,
    }
  }

  pub fn priority(self) -> Priority {
    match self {
      Self::WeatherDelay
      | Self::CustomsDelay
      | Self::OutForDelivery
      | Self::Delivered
      | Self::CarrierPattern => Priority::Medium,
      Self::Overdue
      | Self::AddressIssue
      | Self::Delayed
      | Self::Stuck
      | Self::UnusualRouting => Priority::High,
    }
  }

  /// The title is part of the dedup key, so it must not vary per shipment.
  pub fn title(self) -> &'static str {
    match self {
      Self::Overdue => "Package Overdue",
      Self::WeatherDelay => "Weather Delay",
      Self::CustomsDelay => "Customs Delay",
      Self::AddressIssue => "Address Issue",
      Self::Delayed => "Shipment Delayed",
      Self::OutForDelivery => "Delivery Today",
      Self::Delivered => "Package Delivered",
      Self::Stuck => "Shipment Stalled",
      Self::UnusualRouting => "Unusual Routing Detected",
      Self::CarrierPattern => "Carrier Delay Pattern",
    }
  }

  pub fn icon(self) -> &'static str {
    match self {
      Self::Overdue => "⏰",
      Self::WeatherDelay => "🌧️",
      Self::CustomsDelay => "🛃",
      Self::AddressIssue => "📍",
      Self::Delayed => "⚠️",
      Self::OutForDelivery => "🚚",
      Self::Delivered => "✅",
      Self::Stuck => "🚨",
      Self::UnusualRouting => "🔄",
      Self::CarrierPattern => "📊",
    }
  }
}

// ─── Alert ───────────────────────────────────────────────────────────────────

/// A user-facing notification about one shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
  pub id:              Uuid,
  #[serde(rename = "type")]
  pub alert_type:      AlertType,
  pub kind:            AlertKind,
  pub priority:        Priority,
  pub title:           String,
  pub message:         String,
  pub icon:            String,
  /// Creation time; never changes.
  pub timestamp:       DateTime<Utc>,
  /// Weak reference: the alert survives deletion of its shipment only until
  /// the next cleanup pass.
  pub shipment_id:     String,
  pub tracking_number: String,
  #[serde(default)]
  pub dismissed:       bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub dismissed_at:    Option<DateTime<Utc>>,
  #[serde(default)]
  pub read:            bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub read_at:         Option<DateTime<Utc>>,
  #[serde(default)]
  pub metadata:        BTreeMap<String, serde_json::Value>,
}

/// The `(shipment_id, type, title)` triple under which at most one
/// non-dismissed alert may exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DedupKey<'a> {
  pub shipment_id: &'a str,
  pub alert_type:  AlertType,
  pub title:       &'a str,
}

impl Alert {
  /// Build a fresh candidate for `shipment`, stamped with a new id and `now`.
  /// `metadata` gains `carrier` and `status` copied from the shipment.
  pub fn candidate(
    shipment: &Shipment,
    kind: AlertKind,
    message: String,
    now: DateTime<Utc>,
  ) -> Self {
    let mut metadata = BTreeMap::new();
    metadata.insert("carrier".to_owned(), shipment.carrier.clone().into());
    metadata.insert("status".to_owned(), shipment.status.to_string().into());

    Self {
      id: Uuid::new_v4(),
      alert_type: kind.alert_type(),
      kind,
      priority: kind.priority(),
      title: kind.title().to_owned(),
      message,
      icon: kind.icon().to_owned(),
      timestamp: now,
      shipment_id: shipment.shipment_id.clone(),
      tracking_number: shipment.tracking_number.clone(),
      dismissed: false,
      dismissed_at: None,
      read: false,
      read_at: None,
      metadata,
    }
  }

  /// Attach an auxiliary metadata field.
  pub fn with_meta(
    mut self,
    key: &str,
    value: impl Into<serde_json::Value>,
  ) -> Self {
    self.metadata.insert(key.to_owned(), value.into());
    self
  }

  pub fn dedup_key(&self) -> DedupKey<'_> {
    DedupKey {
      shipment_id: &self.shipment_id,
      alert_type:  self.alert_type,
      title:       &self.title,
    }
  }

  /// Why this alert must not be admitted, if anything.
  pub fn malformed_reason(&self) -> Option<&'static str> {
    if self.shipment_id.trim().is_empty() {
      Some("missing shipment_id")
    } else if self.title.trim().is_empty() {
      Some("missing title")
    } else if self.message.trim().is_empty() {
      Some("missing message")
    } else {
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::shipment::ShipmentStatus;

  fn shipment() -> Shipment {
    Shipment {
      shipment_id:         "s-1".into(),
      tracking_number:     "9400111".into(),
      carrier:             "USPS".into(),
      nickname:            "Books".into(),
      status:              ShipmentStatus::InTransit,
      estimated_delivery:  None,
      actual_delivery:     None,
      last_updated:        Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
      historical_statuses: vec![],
    }
  }

  #[test]
  fn candidate_copies_shipment_fields() {
    let now = Utc.timestamp_opt(1_700_000_100, 0).unwrap();
    let alert =
      Alert::candidate(&shipment(), AlertKind::Stuck, "stalled".into(), now);

    assert_eq!(alert.alert_type, AlertType::Error);
    assert_eq!(alert.priority, Priority::High);
    assert_eq!(alert.title, "Shipment Stalled");
    assert_eq!(alert.timestamp, now);
    assert_eq!(alert.tracking_number, "9400111");
    assert!(!alert.dismissed && !alert.read);
    assert_eq!(alert.metadata["carrier"], "USPS");
    assert_eq!(alert.metadata["status"], "in_transit");
  }

  #[test]
  fn type_field_serialises_as_type() {
    let now = Utc.timestamp_opt(1_700_000_100, 0).unwrap();
    let alert =
      Alert::candidate(&shipment(), AlertKind::Delivered, "done".into(), now);
    let json = serde_json::to_value(&alert).unwrap();
    assert_eq!(json["type"], "success");
    assert_eq!(json["kind"], "delivered");
    assert_eq!(json["priority"], "medium");
    assert!(json.get("dismissed_at").is_none());

    let back: Alert = serde_json::from_value(json).unwrap();
    assert_eq!(back, alert);
  }

  #[test]
  fn malformed_candidates_are_detected() {
    let now = Utc.timestamp_opt(1_700_000_100, 0).unwrap();
    let mut alert =
      Alert::candidate(&shipment(), AlertKind::Overdue, "late".into(), now);
    assert_eq!(alert.malformed_reason(), None);
    alert.shipment_id.clear();
    assert_eq!(alert.malformed_reason(), Some("missing shipment_id"));
  }
}
