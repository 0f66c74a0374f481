//! Shipments, the read-only input to alert derivation.
//!
//! Shipments are owned by the orchestration layer ([`crate::tracker`]). The
//! rule engine and lifecycle manager only ever borrow them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Where a shipment currently is in its journey.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ShipmentStatus {
  Pending,
  InTransit,
  OutForDelivery,
  Delivered,
  Delayed,
  Exception,
}

impl ShipmentStatus {
  /// Statuses in which a shipment is expected to keep producing updates.
  pub fn is_moving(self) -> bool {
    matches!(self, Self::Pending | Self::InTransit)
  }
}

/// One observed checkpoint in a shipment's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
  pub status:      ShipmentStatus,
  pub timestamp:   DateTime<Utc>,
  /// Free-text location reported by the carrier. Also carries delay reasons
  /// ("Weather delay in transit"), which the rule engine matches on.
  pub location:    String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
}

// ─── Shipment ────────────────────────────────────────────────────────────────

/// A tracked package as last reported by its carrier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
  /// Opaque identifier, stable for the shipment's lifetime.
  pub shipment_id:         String,
  pub tracking_number:     String,
  pub carrier:             String,
  #[serde(default)]
  pub nickname:            String,
  pub status:              ShipmentStatus,
  pub estimated_delivery:  Option<DateTime<Utc>>,
  /// Set only when `status` is [`ShipmentStatus::Delivered`].
  pub actual_delivery:     Option<DateTime<Utc>>,
  pub last_updated:        DateTime<Utc>,
  /// Append-only; insertion order is chronological order.
  #[serde(default)]
  pub historical_statuses: Vec<StatusEvent>,
}

impl Shipment {
  /// Name to show in alert text: the nickname when set, otherwise the
  /// tracking number.
  pub fn display_name(&self) -> &str {
    if self.nickname.trim().is_empty() {
      &self.tracking_number
    } else {
      &self.nickname
    }
  }

  /// The most recent history entry, if any.
  pub fn latest_event(&self) -> Option<&StatusEvent> {
    self.historical_statuses.last()
  }

  /// Check the structural invariants of a shipment snapshot.
  pub fn validate(&self) -> Result<()> {
    if self.shipment_id.trim().is_empty() {
      return Err(Error::InvalidShipment {
        shipment_id: self.shipment_id.clone(),
        reason:      "shipment_id is empty".into(),
      });
    }
    let delivered = self.status == ShipmentStatus::Delivered;
    if delivered != self.actual_delivery.is_some() {
      return Err(Error::InvalidShipment {
        shipment_id: self.shipment_id.clone(),
        reason:      "actual_delivery must be set iff status is delivered"
          .into(),
      });
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn shipment(status: ShipmentStatus) -> Shipment {
    let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    Shipment {
      shipment_id:         "s-1".into(),
      tracking_number:     "1Z999".into(),
      carrier:             "UPS".into(),
      nickname:            String::new(),
      status,
      estimated_delivery:  None,
      actual_delivery:     None,
      last_updated:        ts,
      historical_statuses: vec![],
    }
  }

  #[test]
  fn display_name_falls_back_to_tracking_number() {
    let mut s = shipment(ShipmentStatus::Pending);
    assert_eq!(s.display_name(), "1Z999");
    s.nickname = "Headphones".into();
    assert_eq!(s.display_name(), "Headphones");
  }

  #[test]
  fn delivered_without_actual_delivery_is_invalid() {
    let s = shipment(ShipmentStatus::Delivered);
    assert!(matches!(s.validate(), Err(Error::InvalidShipment { .. })));
  }

  #[test]
  fn actual_delivery_on_undelivered_is_invalid() {
    let mut s = shipment(ShipmentStatus::InTransit);
    s.actual_delivery = Some(s.last_updated);
    assert!(s.validate().is_err());
  }

  #[test]
  fn empty_id_is_invalid() {
    let mut s = shipment(ShipmentStatus::Pending);
    s.shipment_id = "  ".into();
    assert!(s.validate().is_err());
  }

  #[test]
  fn status_string_forms_match_serde() {
    assert_eq!(ShipmentStatus::OutForDelivery.to_string(), "out_for_delivery");
    let json = serde_json::to_string(&ShipmentStatus::InTransit).unwrap();
    assert_eq!(json, "\"in_transit\"");
    assert_eq!(
      "delayed".parse::<ShipmentStatus>().unwrap(),
      ShipmentStatus::Delayed
    );
  }
}
