//! Handlers for `/alerts` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/alerts` | Visible alerts; `?all=true` includes dismissed |
//! | `DELETE` | `/alerts` | Clear every alert |
//! | `POST`   | `/alerts/read` | Mark all visible alerts read |
//! | `POST`   | `/alerts/:id/dismiss` | Returns 204 |
//! | `POST`   | `/alerts/:id/read` | Returns 204 |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use parcelwatch_core::{
  alert::Alert,
  notify::Notifier,
  store::KeyValueStore,
  tracker::Tracker,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// If `true`, include dismissed alerts. Default `false`.
  #[serde(default)]
  pub all: bool,
}

/// `GET /alerts[?all=true]`
pub async fn list<S, N>(
  State(tracker): State<Arc<Tracker<S, N>>>,
  Query(params): Query<ListParams>,
) -> Json<Vec<Alert>>
where
  S: KeyValueStore,
  N: Notifier,
{
  if params.all {
    Json(tracker.all_alerts().await)
  } else {
    Json(tracker.alerts().await)
  }
}

/// `DELETE /alerts`
pub async fn clear<S, N>(
  State(tracker): State<Arc<Tracker<S, N>>>,
) -> Result<StatusCode, ApiError>
where
  S: KeyValueStore,
  N: Notifier,
{
  tracker.clear_all().await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /alerts/:id/dismiss`
pub async fn dismiss<S, N>(
  State(tracker): State<Arc<Tracker<S, N>>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: KeyValueStore,
  N: Notifier,
{
  tracker.dismiss(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `POST /alerts/:id/read`
pub async fn mark_read<S, N>(
  State(tracker): State<Arc<Tracker<S, N>>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: KeyValueStore,
  N: Notifier,
{
  tracker.mark_read(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct MarkAllRead {
  pub updated: usize,
}

/// `POST /alerts/read`
pub async fn mark_all_read<S, N>(
  State(tracker): State<Arc<Tracker<S, N>>>,
) -> Result<Json<MarkAllRead>, ApiError>
where
  S: KeyValueStore,
  N: Notifier,
{
  let updated = tracker.mark_all_read().await?;
  Ok(Json(MarkAllRead { updated }))
}
