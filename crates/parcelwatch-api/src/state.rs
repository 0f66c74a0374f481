//! Handlers for preferences and whole-state export/import.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use parcelwatch_core::{
  notify::Notifier,
  prefs::Preferences,
  store::KeyValueStore,
  tracker::{StateExport, Tracker},
};

use crate::error::ApiError;

/// `GET /preferences`
pub async fn get_preferences<S, N>(
  State(tracker): State<Arc<Tracker<S, N>>>,
) -> Json<Preferences>
where
  S: KeyValueStore,
  N: Notifier,
{
  Json(tracker.preferences().await)
}

/// `PUT /preferences`: replaces all four flags. Omitted ones take defaults.
pub async fn put_preferences<S, N>(
  State(tracker): State<Arc<Tracker<S, N>>>,
  Json(body): Json<Preferences>,
) -> Result<Json<Preferences>, ApiError>
where
  S: KeyValueStore,
  N: Notifier,
{
  tracker.set_preferences(body).await?;
  Ok(Json(body))
}

/// `GET /export`
pub async fn export<S, N>(
  State(tracker): State<Arc<Tracker<S, N>>>,
) -> Json<StateExport>
where
  S: KeyValueStore,
  N: Notifier,
{
  Json(tracker.export().await)
}

/// `POST /import`
pub async fn import<S, N>(
  State(tracker): State<Arc<Tracker<S, N>>>,
  Json(body): Json<StateExport>,
) -> Result<StatusCode, ApiError>
where
  S: KeyValueStore,
  N: Notifier,
{
  tracker.import(body).await?;
  Ok(StatusCode::NO_CONTENT)
}
