//! Shipment change detection: supplies "previous status" to the rule engine.
//!
//! Must run against the previous collection *before* it is overwritten, or
//! edge-triggered rules (the delivered transition) lose their edge for good.

use std::collections::HashMap;

use crate::shipment::{Shipment, ShipmentStatus};

/// One shipment from the new collection paired with its prior status.
#[derive(Debug, Clone, Copy)]
pub struct Observed<'a> {
  pub shipment:        &'a Shipment,
  /// `None` when no shipment with this id was in the previous collection.
  pub previous_status: Option<ShipmentStatus>,
  /// Length of the previous history, for append-only checks.
  previous_history:    Option<usize>,
}

impl Observed<'_> {
  /// True if the carrier history got shorter since the last observation.
  pub fn history_shrank(&self) -> bool {
    self
      .previous_history
      .is_some_and(|len| self.shipment.historical_statuses.len() < len)
  }
}

/// Pair every shipment in `current` with the status it had in `previous`,
/// matched by `shipment_id`. Output order follows `current`.
pub fn observe<'a>(
  current: &'a [Shipment],
  previous: &[Shipment],
) -> Vec<Observed<'a>> {
  let before: HashMap<&str, &Shipment> = previous
    .iter()
    .map(|s| (s.shipment_id.as_str(), s))
    .collect();

  current
    .iter()
    .map(|shipment| {
      let prior = before.get(shipment.shipment_id.as_str());
      Observed {
        shipment,
        previous_status: prior.map(|p| p.status),
        previous_history: prior.map(|p| p.historical_statuses.len()),
      }
    })
    .collect()
}
