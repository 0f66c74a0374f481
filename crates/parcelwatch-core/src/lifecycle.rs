//! Alert lifecycle: admission, expiry and user-driven flags.
//!
//! These are plain functions over alert collections. The stateful owner of
//! the authoritative set is [`crate::tracker::Tracker`], which calls them in
//! the per-cycle order: ingest, cleanup, persist, notify.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
  Error, Result,
  alert::{Alert, AlertKind, AlertType},
  shipment::{Shipment, ShipmentStatus},
};

/// Alerts older than this are dropped by [`cleanup`], dismissed or not.
pub const ALERT_MAX_AGE_DAYS: i64 = 7;

// ─── Admission ───────────────────────────────────────────────────────────────

/// Result of [`ingest`].
#[derive(Debug, Clone, Default)]
pub struct Ingested {
  /// Candidates that became alerts, in candidate order.
  pub admitted: Vec<Alert>,
  /// `admitted` followed by every existing alert.
  pub merged:   Vec<Alert>,
}

type OwnedKey = (String, AlertType, String);

fn owned_key(alert: &Alert) -> OwnedKey {
  let key = alert.dedup_key();
  (key.shipment_id.to_owned(), key.alert_type, key.title.to_owned())
}

/// Admit each candidate unless an alert with the same
/// `(shipment_id, type, title)` already exists, either in `existing` or
/// earlier in `candidates`. Rejected and malformed candidates are dropped.
///
/// Dismissed alerts hold their key too, so a dismissal sticks until
/// [`cleanup`] ages the alert out.
pub fn ingest(candidates: Vec<Alert>, existing: Vec<Alert>) -> Ingested {
  let mut outstanding: HashSet<OwnedKey> =
    existing.iter().map(owned_key).collect();

  let mut admitted = Vec::new();
  for candidate in candidates {
    if let Some(reason) = candidate.malformed_reason() {
      tracing::warn!(
        alert_id = %candidate.id,
        reason,
        "rejecting malformed alert candidate"
      );
      continue;
    }
    if !outstanding.insert(owned_key(&candidate)) {
      tracing::debug!(
        shipment_id = %candidate.shipment_id,
        title = %candidate.title,
        "suppressing duplicate alert"
      );
      continue;
    }
    admitted.push(candidate);
  }

  let mut merged = admitted.clone();
  merged.extend(existing);
  Ingested { admitted, merged }
}

// ─── Expiry ──────────────────────────────────────────────────────────────────

/// Drop alerts whose condition no longer holds:
///
/// - the shipment is gone,
/// - a "Delivery Today" alert whose shipment is no longer out for delivery,
/// - a warning whose shipment has since been delivered,
/// - anything older than [`ALERT_MAX_AGE_DAYS`].
///
/// Idempotent for a fixed `now`: each predicate depends only on the alert and
/// the shipment collection, never on other alerts.
pub fn cleanup(
  alerts: Vec<Alert>,
  shipments: &[Shipment],
  now: DateTime<Utc>,
) -> Vec<Alert> {
  let status_of: HashMap<&str, ShipmentStatus> = shipments
    .iter()
    .map(|s| (s.shipment_id.as_str(), s.status))
    .collect();
  let max_age = Duration::days(ALERT_MAX_AGE_DAYS);

  alerts
    .into_iter()
    .filter(|alert| {
      let Some(&status) = status_of.get(alert.shipment_id.as_str()) else {
        return false;
      };
      if alert.kind == AlertKind::OutForDelivery
        && status != ShipmentStatus::OutForDelivery
      {
        return false;
      }
      if alert.alert_type == AlertType::Warning
        && status == ShipmentStatus::Delivered
      {
        return false;
      }
      now - alert.timestamp <= max_age
    })
    .collect()
}

/// Rebuild an alert set that did not come from a cycle (e.g. an imported
/// document) so it holds the same guarantees: malformed alerts and repeated
/// keys are dropped (first occurrence wins), then [`cleanup`] runs.
pub fn reconcile(
  alerts: Vec<Alert>,
  shipments: &[Shipment],
  now: DateTime<Utc>,
) -> Vec<Alert> {
  let total = alerts.len();
  let Ingested { merged, .. } = ingest(alerts, Vec::new());
  let kept = cleanup(merged, shipments, now);
  if kept.len() < total {
    tracing::warn!(
      dropped = total - kept.len(),
      kept = kept.len(),
      "dropped inconsistent alerts while reconciling"
    );
  }
  kept
}

// ─── User actions ────────────────────────────────────────────────────────────

/// Mark an alert dismissed. Dismissed alerts stay in the set (keeping their
/// dedup key out of play) until [`cleanup`] expires them.
pub fn dismiss(alerts: &mut [Alert], id: Uuid, now: DateTime<Utc>) -> Result<()> {
  let alert = find_mut(alerts, id)?;
  if !alert.dismissed {
    alert.dismissed = true;
    alert.dismissed_at = Some(now);
  }
  Ok(())
}

pub fn mark_read(alerts: &mut [Alert], id: Uuid, now: DateTime<Utc>) -> Result<()> {
  let alert = find_mut(alerts, id)?;
  if !alert.read {
    alert.read = true;
    alert.read_at = Some(now);
  }
  Ok(())
}

/// Mark every visible unread alert read; returns how many changed.
pub fn mark_all_read(alerts: &mut [Alert], now: DateTime<Utc>) -> usize {
  let mut changed = 0;
  for alert in alerts.iter_mut().filter(|a| !a.dismissed && !a.read) {
    alert.read = true;
    alert.read_at = Some(now);
    changed += 1;
  }
  changed
}

/// The externally visible alerts: everything not dismissed.
pub fn visible(alerts: &[Alert]) -> Vec<Alert> {
  alerts.iter().filter(|a| !a.dismissed).cloned().collect()
}

fn find_mut(alerts: &mut [Alert], id: Uuid) -> Result<&mut Alert> {
  alerts
    .iter_mut()
    .find(|a| a.id == id)
    .ok_or(Error::AlertNotFound(id))
}
