//! Handlers for `/shipments` endpoints.
//!
//! Every write runs one full alert cycle before responding.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/shipments` | Current collection |
//! | `PUT`    | `/shipments` | Body: `[Shipment]`; replaces the collection |
//! | `POST`   | `/shipments` | Body: `Shipment`; inserts or replaces by id |
//! | `DELETE` | `/shipments/:id` | Removes the shipment; its alerts are cleaned up |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use parcelwatch_core::{
  alert::Alert,
  notify::Notifier,
  shipment::Shipment,
  store::KeyValueStore,
  tracker::{CycleOutcome, Tracker},
};
use serde::Serialize;

use crate::error::ApiError;

/// What a shipment write returns: the alerts it created and the visible list.
#[derive(Debug, Serialize)]
pub struct CycleResponse {
  pub admitted: Vec<Alert>,
  pub alerts:   Vec<Alert>,
}

impl From<CycleOutcome> for CycleResponse {
  // Dropping the dispatch handle detaches the task; it still runs.
  fn from(outcome: CycleOutcome) -> Self {
    Self { admitted: outcome.admitted, alerts: outcome.alerts }
  }
}

/// `GET /shipments`
pub async fn list<S, N>(
  State(tracker): State<Arc<Tracker<S, N>>>,
) -> Json<Vec<Shipment>>
where
  S: KeyValueStore,
  N: Notifier,
{
  Json(tracker.shipments().await)
}

/// `PUT /shipments`
pub async fn replace<S, N>(
  State(tracker): State<Arc<Tracker<S, N>>>,
  Json(body): Json<Vec<Shipment>>,
) -> Result<Json<CycleResponse>, ApiError>
where
  S: KeyValueStore,
  N: Notifier,
{
  let outcome = tracker.update_shipments(body).await?;
  Ok(Json(outcome.into()))
}

/// `POST /shipments`
pub async fn upsert<S, N>(
  State(tracker): State<Arc<Tracker<S, N>>>,
  Json(body): Json<Shipment>,
) -> Result<Json<CycleResponse>, ApiError>
where
  S: KeyValueStore,
  N: Notifier,
{
  let outcome = tracker.upsert_shipment(body).await?;
  Ok(Json(outcome.into()))
}

/// `DELETE /shipments/:id`
pub async fn remove<S, N>(
  State(tracker): State<Arc<Tracker<S, N>>>,
  Path(id): Path<String>,
) -> Result<Json<CycleResponse>, ApiError>
where
  S: KeyValueStore,
  N: Notifier,
{
  let outcome = tracker.remove_shipment(&id).await?;
  Ok(Json(outcome.into()))
}
