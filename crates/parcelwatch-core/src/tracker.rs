//! [`Tracker`], owner of the shipment collection and the authoritative alert
//! set.
//!
//! Every mutation takes a single async mutex for its whole duration, so one
//! shipment update runs ingest → cleanup → persist → notify to completion
//! before the next one starts. Notification dispatch is spawned and never
//! awaited by the cycle.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{sync::Mutex, task::JoinHandle};
use uuid::Uuid;

use crate::{
  Error, Result,
  alert::Alert,
  change,
  lifecycle::{self, Ingested},
  notify::{self, DispatchSummary, Notifier},
  prefs::Preferences,
  rules,
  shipment::Shipment,
  store::{
    ALERTS_KEY, KeyValueStore, PREFERENCES_KEY, SHIPMENTS_KEY, load_or_default,
  },
};

/// Current [`StateExport::version`].
pub const EXPORT_VERSION: u32 = 1;

// ─── Settings & outputs ──────────────────────────────────────────────────────

/// Runtime knobs that are not user preferences.
#[derive(Debug, Clone, Default)]
pub struct TrackerSettings {
  /// Where notifications go. `None` disables dispatch entirely.
  pub recipient: Option<String>,
  /// Premium feature gate for the pattern-detection rules.
  pub premium:   bool,
}

/// Result of one shipment-collection update.
#[derive(Debug)]
pub struct CycleOutcome {
  /// Alerts created by this cycle.
  pub admitted: Vec<Alert>,
  /// The visible alert list after the cycle.
  pub alerts:   Vec<Alert>,
  /// Handle to the background notification task, if one was spawned.
  pub dispatch: Option<JoinHandle<DispatchSummary>>,
}

/// The full persisted state as a single JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateExport {
  pub version:     u32,
  pub exported_at: DateTime<Utc>,
  pub shipments:   Vec<Shipment>,
  pub alerts:      Vec<Alert>,
  pub preferences: Preferences,
}

// ─── Tracker ─────────────────────────────────────────────────────────────────

struct State {
  shipments:   Vec<Shipment>,
  alerts:      Vec<Alert>,
  preferences: Preferences,
  settings:    TrackerSettings,
}

pub struct Tracker<S: KeyValueStore, N: Notifier> {
  store:    S,
  notifier: Arc<N>,
  state:    Mutex<State>,
}

impl<S: KeyValueStore, N: Notifier> Tracker<S, N> {
  /// Load persisted state from `store`. Missing or corrupt documents fall
  /// back to empty collections and default preferences.
  pub async fn open(store: S, notifier: N, settings: TrackerSettings) -> Self {
    let shipments: Vec<Shipment> = load_or_default(&store, SHIPMENTS_KEY).await;
    let alerts: Vec<Alert> = load_or_default(&store, ALERTS_KEY).await;
    let preferences = load_or_default(&store, PREFERENCES_KEY).await;
    tracing::info!(
      shipments = shipments.len(),
      alerts = alerts.len(),
      "tracker state loaded"
    );

    Self {
      store,
      notifier: Arc::new(notifier),
      state: Mutex::new(State { shipments, alerts, preferences, settings }),
    }
  }

  // ── Shipments ─────────────────────────────────────────────────────────────

  pub async fn shipments(&self) -> Vec<Shipment> {
    self.state.lock().await.shipments.clone()
  }

  /// Replace the whole shipment collection and run one alert cycle.
  pub async fn update_shipments(
    &self,
    shipments: Vec<Shipment>,
  ) -> Result<CycleOutcome> {
    validate_collection(&shipments)?;
    let mut state = self.state.lock().await;
    self.run_cycle(&mut state, shipments).await
  }

  /// Insert or replace one shipment (matched by id) and run a cycle.
  pub async fn upsert_shipment(&self, shipment: Shipment) -> Result<CycleOutcome> {
    shipment.validate()?;
    let mut state = self.state.lock().await;
    let mut next = state.shipments.clone();
    match next.iter_mut().find(|s| s.shipment_id == shipment.shipment_id) {
      Some(slot) => *slot = shipment,
      None => next.push(shipment),
    }
    self.run_cycle(&mut state, next).await
  }

  /// Remove one shipment and run a cycle; its alerts go with it.
  pub async fn remove_shipment(&self, shipment_id: &str) -> Result<CycleOutcome> {
    let mut state = self.state.lock().await;
    let mut next = state.shipments.clone();
    let before = next.len();
    next.retain(|s| s.shipment_id != shipment_id);
    if next.len() == before {
      return Err(Error::ShipmentNotFound(shipment_id.to_owned()));
    }
    self.run_cycle(&mut state, next).await
  }

  async fn run_cycle(
    &self,
    state: &mut State,
    shipments: Vec<Shipment>,
  ) -> Result<CycleOutcome> {
    let now = Utc::now();
    let premium = state.settings.premium;

    // Must see the previous collection before it is replaced below.
    let mut candidates = Vec::new();
    for observed in change::observe(&shipments, &state.shipments) {
      if observed.history_shrank() {
        tracing::warn!(
          shipment_id = %observed.shipment.shipment_id,
          "status history shrank since last observation"
        );
      }
      candidates.extend(rules::derive_alerts(
        observed.shipment,
        observed.previous_status,
        premium,
        now,
      ));
    }

    let existing = std::mem::take(&mut state.alerts);
    let Ingested { admitted, merged } = lifecycle::ingest(candidates, existing);
    let before_cleanup = merged.len();
    state.alerts = lifecycle::cleanup(merged, &shipments, now);
    state.shipments = shipments;

    let admitted: Vec<Alert> = admitted
      .into_iter()
      .filter(|a| state.alerts.iter().any(|kept| kept.id == a.id))
      .collect();
    tracing::info!(
      shipments = state.shipments.len(),
      admitted = admitted.len(),
      expired = before_cleanup - state.alerts.len(),
      alerts = state.alerts.len(),
      "alert cycle complete"
    );

    let saved = match self.save(ALERTS_KEY, &state.alerts).await {
      Ok(()) => self.save(SHIPMENTS_KEY, &state.shipments).await,
      Err(e) => Err(e),
    };
    let dispatch = self.spawn_dispatch(state, &admitted);
    saved?;

    Ok(CycleOutcome {
      admitted,
      alerts: lifecycle::visible(&state.alerts),
      dispatch,
    })
  }

  fn spawn_dispatch(
    &self,
    state: &State,
    admitted: &[Alert],
  ) -> Option<JoinHandle<DispatchSummary>> {
    let plan = notify::plan(admitted, &state.preferences);
    if plan.is_empty() {
      return None;
    }
    let Some(recipient) = state.settings.recipient.clone() else {
      tracing::debug!("no recipient configured; skipping notifications");
      return None;
    };
    Some(tokio::spawn(notify::dispatch(
      Arc::clone(&self.notifier),
      recipient,
      plan,
    )))
  }

  // ── Alerts ────────────────────────────────────────────────────────────────

  /// Visible (non-dismissed) alerts, most recent first.
  pub async fn alerts(&self) -> Vec<Alert> {
    lifecycle::visible(&self.state.lock().await.alerts)
  }

  /// Every alert including dismissed ones.
  pub async fn all_alerts(&self) -> Vec<Alert> {
    self.state.lock().await.alerts.clone()
  }

  pub async fn unread_count(&self) -> usize {
    let state = self.state.lock().await;
    state.alerts.iter().filter(|a| !a.dismissed && !a.read).count()
  }

  pub async fn dismiss(&self, id: Uuid) -> Result<()> {
    let mut state = self.state.lock().await;
    lifecycle::dismiss(&mut state.alerts, id, Utc::now())?;
    self.save(ALERTS_KEY, &state.alerts).await
  }

  pub async fn mark_read(&self, id: Uuid) -> Result<()> {
    let mut state = self.state.lock().await;
    lifecycle::mark_read(&mut state.alerts, id, Utc::now())?;
    self.save(ALERTS_KEY, &state.alerts).await
  }

  pub async fn mark_all_read(&self) -> Result<usize> {
    let mut state = self.state.lock().await;
    let changed = lifecycle::mark_all_read(&mut state.alerts, Utc::now());
    if changed > 0 {
      self.save(ALERTS_KEY, &state.alerts).await?;
    }
    Ok(changed)
  }

  /// Drop every alert, dismissed or not.
  pub async fn clear_all(&self) -> Result<()> {
    let mut state = self.state.lock().await;
    state.alerts.clear();
    self.save(ALERTS_KEY, &state.alerts).await
  }

  // ── Preferences & settings ────────────────────────────────────────────────

  pub async fn preferences(&self) -> Preferences {
    self.state.lock().await.preferences
  }

  pub async fn set_preferences(&self, preferences: Preferences) -> Result<()> {
    let mut state = self.state.lock().await;
    state.preferences = preferences;
    self.save(PREFERENCES_KEY, &state.preferences).await
  }

  pub async fn set_premium(&self, premium: bool) {
    self.state.lock().await.settings.premium = premium;
  }

  pub async fn set_recipient(&self, recipient: Option<String>) {
    self.state.lock().await.settings.recipient = recipient;
  }

  // ── Export / import ───────────────────────────────────────────────────────

  pub async fn export(&self) -> StateExport {
    let state = self.state.lock().await;
    StateExport {
      version:     EXPORT_VERSION,
      exported_at: Utc::now(),
      shipments:   state.shipments.clone(),
      alerts:      state.alerts.clone(),
      preferences: state.preferences,
    }
  }

  /// Replace all state with `doc` and persist. No alert cycle runs, but the
  /// imported alerts are reconciled against the imported shipments first.
  pub async fn import(&self, doc: StateExport) -> Result<()> {
    if doc.version != EXPORT_VERSION {
      return Err(Error::UnsupportedExport(doc.version));
    }
    validate_collection(&doc.shipments)?;
    let alerts = lifecycle::reconcile(doc.alerts, &doc.shipments, Utc::now());

    let mut state = self.state.lock().await;
    state.shipments = doc.shipments;
    state.alerts = alerts;
    state.preferences = doc.preferences;
    tracing::info!(
      shipments = state.shipments.len(),
      alerts = state.alerts.len(),
      "state imported"
    );

    self.save(SHIPMENTS_KEY, &state.shipments).await?;
    self.save(ALERTS_KEY, &state.alerts).await?;
    self.save(PREFERENCES_KEY, &state.preferences).await
  }

  // ── Persistence ───────────────────────────────────────────────────────────

  async fn save<T: Serialize>(&self, key: &'static str, value: &T) -> Result<()> {
    let json = serde_json::to_value(value)?;
    self.store.save(key, json).await.map_err(|e| {
      tracing::warn!(key, error = %e, "save failed");
      Error::Persistence { key, source: Box::new(e) }
    })
  }
}

/// Every shipment valid, no id repeated.
fn validate_collection(shipments: &[Shipment]) -> Result<()> {
  let mut seen = std::collections::HashSet::new();
  for shipment in shipments {
    shipment.validate()?;
    if !seen.insert(shipment.shipment_id.as_str()) {
      return Err(Error::InvalidShipment {
        shipment_id: shipment.shipment_id.clone(),
        reason:      "duplicate shipment_id".into(),
      });
    }
  }
  Ok(())
}
