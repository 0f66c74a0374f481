//! Alert rule engine: shipment snapshot + previous status → candidate alerts.
//!
//! Every rule is independent and yields at most one candidate, so a single
//! shipment can produce several alerts in one call. The engine keeps no state;
//! its only input besides the arguments is the injected `now`.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::{
  alert::{Alert, AlertKind},
  shipment::{Shipment, ShipmentStatus},
};

/// A shipment in a moving status with no update for longer than this is stuck.
pub const STUCK_AFTER_HOURS: i64 = 48;
/// USPS tracking gap threshold for the premium carrier heuristics.
pub const USPS_GAP_HOURS: i64 = 72;
/// FedEx in-transit duration threshold for the premium carrier heuristics.
pub const FEDEX_TRANSIT_DAYS: i64 = 5;

// ─── Delay classification ────────────────────────────────────────────────────

/// Why a delayed shipment is delayed, guessed from free-text location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum DelayReason {
  Weather,
  Customs,
  Address,
  #[strum(to_string = "unexpected delay in transit")]
  Unexpected,
}

impl DelayReason {
  /// Case-insensitive substring match. First hit wins, in the order weather,
  /// customs, address.
  pub fn classify(location: &str) -> Self {
    let text = location.to_lowercase();
    if text.contains("weather") {
      Self::Weather
    } else if text.contains("customs") {
      Self::Customs
    } else if text.contains("address") {
      Self::Address
    } else {
      Self::Unexpected
    }
  }

  fn kind(self) -> AlertKind {
    match self {
      Self::Weather => AlertKind::WeatherDelay,
      Self::Customs => AlertKind::CustomsDelay,
      Self::Address => AlertKind::AddressIssue,
      Self::Unexpected => AlertKind::Delayed,
    }
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Derive candidate alerts for one shipment.
///
/// `previous_status` is the status this shipment had in the previously
/// observed collection (see [`crate::change`]); `None` for a new shipment.
/// `premium` enables the pattern-detection rules.
pub fn derive_alerts(
  shipment: &Shipment,
  previous_status: Option<ShipmentStatus>,
  premium: bool,
  now: DateTime<Utc>,
) -> Vec<Alert> {
  let mut out = Vec::new();
  let name = shipment.display_name();

  if let Some(days) = days_overdue(shipment, now) {
    out.push(Alert::candidate(
      shipment,
      AlertKind::Overdue,
      format!("{name} is {days} day(s) overdue."),
      now,
    ));
  }

  if shipment.status == ShipmentStatus::Delayed {
    out.push(delay_alert(shipment, now));
  }

  if shipment.status == ShipmentStatus::OutForDelivery {
    out.push(Alert::candidate(
      shipment,
      AlertKind::OutForDelivery,
      format!("{name} is out for delivery and arrives today."),
      now,
    ));
  }

  if shipment.status == ShipmentStatus::Delivered
    && previous_status != Some(ShipmentStatus::Delivered)
  {
    out.push(Alert::candidate(
      shipment,
      AlertKind::Delivered,
      format!("{name} has been delivered."),
      now,
    ));
  }

  let stalled = now - shipment.last_updated;
  if shipment.status.is_moving()
    && stalled > Duration::hours(STUCK_AFTER_HOURS)
  {
    out.push(Alert::candidate(
      shipment,
      AlertKind::Stuck,
      format!(
        "{name} has had no tracking updates for {} hours.",
        stalled.num_hours()
      ),
      now,
    ));
  }

  if premium {
    out.extend(detect_patterns(shipment, now));
  }

  out
}

/// Whole days past the estimate, rounded up. `None` when not overdue, or when
/// the shipment is delivered or already flagged as delayed.
fn days_overdue(shipment: &Shipment, now: DateTime<Utc>) -> Option<i64> {
  let estimate = shipment.estimated_delivery?;
  if now <= estimate
    || matches!(
      shipment.status,
      ShipmentStatus::Delivered | ShipmentStatus::Delayed
    )
  {
    return None;
  }
  let late_ms = (now - estimate).num_milliseconds();
  let day_ms = Duration::days(1).num_milliseconds();
  Some((late_ms + day_ms - 1) / day_ms)
}

fn delay_alert(shipment: &Shipment, now: DateTime<Utc>) -> Alert {
  let reason = shipment
    .latest_event()
    .map(|e| DelayReason::classify(&e.location))
    .unwrap_or(DelayReason::Unexpected);
  let name = shipment.display_name();

  let message = match reason {
    DelayReason::Weather => {
      format!("{name} is delayed due to weather conditions.")
    }
    DelayReason::Customs => format!("{name} is being held at customs."),
    DelayReason::Address => format!(
      "{name} is delayed by an address issue. Please verify the delivery address."
    ),
    DelayReason::Unexpected => {
      format!("{name} has an unexpected delay in transit.")
    }
  };

  Alert::candidate(shipment, reason.kind(), message, now)
    .with_meta("delayReason", reason.to_string())
}

/// Premium-only heuristics.
fn detect_patterns(shipment: &Shipment, now: DateTime<Utc>) -> Vec<Alert> {
  let mut out = Vec::new();
  let name = shipment.display_name();

  // Coarse repeat-count heuristic: more than one revisit overall.
  let locations = &shipment.historical_statuses;
  let unique: HashSet<&str> =
    locations.iter().map(|e| e.location.as_str()).collect();
  if locations.len() > unique.len() + 1 {
    out.push(
      Alert::candidate(
        shipment,
        AlertKind::UnusualRouting,
        format!("{name} has passed through the same location several times."),
        now,
      )
      .with_meta("pattern", "unusual_routing"),
    );
  }

  // Delivered shipments stop updating; the gap is expected there.
  let carrier = shipment.carrier.to_lowercase();
  let since_update = now - shipment.last_updated;
  if carrier == "usps"
    && shipment.status != ShipmentStatus::Delivered
    && since_update > Duration::hours(USPS_GAP_HOURS)
  {
    out.push(
      Alert::candidate(
        shipment,
        AlertKind::CarrierPattern,
        format!(
          "USPS tracking for {name} has not updated in {} hours.",
          since_update.num_hours()
        ),
        now,
      )
      .with_meta("pattern", "usps_tracking_gap"),
    );
  } else if carrier == "fedex"
    && shipment.status == ShipmentStatus::InTransit
    && let Some(first) = shipment.historical_statuses.first()
    && now - first.timestamp > Duration::days(FEDEX_TRANSIT_DAYS)
  {
    out.push(
      Alert::candidate(
        shipment,
        AlertKind::CarrierPattern,
        format!(
          "{name} has been in transit with FedEx for {} days.",
          (now - first.timestamp).num_days()
        ),
        now,
      )
      .with_meta("pattern", "fedex_extended_transit"),
    );
  }

  out
}
