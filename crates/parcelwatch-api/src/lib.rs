//! JSON REST API for parcelwatch.
//!
//! Exposes an axum [`Router`] backed by a shared
//! [`Tracker`](parcelwatch_core::tracker::Tracker). Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", parcelwatch_api::api_router(tracker.clone()))
//! ```

pub mod alerts;
pub mod error;
pub mod shipments;
pub mod state;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use parcelwatch_core::{
  notify::Notifier, store::KeyValueStore, tracker::Tracker,
};

pub use error::ApiError;

/// Build the API router for `tracker`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, N>(tracker: Arc<Tracker<S, N>>) -> Router<()>
where
  S: KeyValueStore,
  N: Notifier,
{
  Router::new()
    // Shipments
    .route(
      "/shipments",
      get(shipments::list::<S, N>)
        .put(shipments::replace::<S, N>)
        .post(shipments::upsert::<S, N>),
    )
    .route("/shipments/{id}", delete(shipments::remove::<S, N>))
    // Alerts
    .route("/alerts", get(alerts::list::<S, N>).delete(alerts::clear::<S, N>))
    .route("/alerts/read", post(alerts::mark_all_read::<S, N>))
    .route("/alerts/{id}/dismiss", post(alerts::dismiss::<S, N>))
    .route("/alerts/{id}/read", post(alerts::mark_read::<S, N>))
    // Preferences & state
    .route(
      "/preferences",
      get(state::get_preferences::<S, N>).put(state::put_preferences::<S, N>),
    )
    .route("/export", get(state::export::<S, N>))
    .route("/import", post(state::import::<S, N>))
    .with_state(tracker)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use chrono::Utc;
  use parcelwatch_core::{
    notify::Notification,
    store::MemoryStore,
    tracker::TrackerSettings,
  };
  use serde_json::{Value, json};
  use tower::ServiceExt as _;

  #[derive(Debug, thiserror::Error)]
  #[error("unused")]
  struct Never;

  struct Discard;

  impl Notifier for Discard {
    type Error = Never;

    async fn send(&self, _: String, _: Notification) -> Result<(), Never> {
      Ok(())
    }
  }

  type TestTracker = Arc<Tracker<MemoryStore, Discard>>;

  async fn make_tracker() -> TestTracker {
    Arc::new(
      Tracker::open(MemoryStore::new(), Discard, TrackerSettings::default())
        .await,
    )
  }

  async fn call(
    tracker: TestTracker,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let resp = api_router(tracker)
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let json = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
  }

  fn shipment(id: &str, status: &str) -> Value {
    let now = Utc::now().to_rfc3339();
    json!({
      "shipment_id": id,
      "tracking_number": format!("TRK-{id}"),
      "carrier": "UPS",
      "nickname": "",
      "status": status,
      "estimated_delivery": null,
      "actual_delivery": if status == "delivered" { json!(now) } else { Value::Null },
      "last_updated": now,
      "historical_statuses": [],
    })
  }

  // ── Shipments ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn put_shipments_returns_admitted_alerts() {
    let t = make_tracker().await;
    let (status, body) = call(
      t.clone(),
      "PUT",
      "/shipments",
      Some(json!([shipment("a", "out_for_delivery"), shipment("b", "delayed")])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["admitted"].as_array().unwrap().len(), 2);

    let (_, list) = call(t, "GET", "/shipments", None).await;
    assert_eq!(list.as_array().unwrap().len(), 2);
  }

  #[tokio::test]
  async fn repeated_put_admits_nothing_new() {
    let t = make_tracker().await;
    let batch = json!([shipment("a", "out_for_delivery")]);
    call(t.clone(), "PUT", "/shipments", Some(batch.clone())).await;
    let (_, body) = call(t, "PUT", "/shipments", Some(batch)).await;
    assert!(body["admitted"].as_array().unwrap().is_empty());
    assert_eq!(body["alerts"].as_array().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn invalid_shipment_is_400() {
    let t = make_tracker().await;
    let mut bad = shipment("a", "delivered");
    bad["actual_delivery"] = Value::Null;
    let (status, body) = call(t, "POST", "/shipments", Some(bad)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("actual_delivery"));
  }

  #[tokio::test]
  async fn delete_shipment_cleans_up_alerts() {
    let t = make_tracker().await;
    call(t.clone(), "POST", "/shipments", Some(shipment("a", "delayed"))).await;
    let (status, body) = call(t.clone(), "DELETE", "/shipments/a", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["alerts"].as_array().unwrap().is_empty());

    let (status, _) = call(t, "DELETE", "/shipments/a", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Alerts ──────────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn dismiss_hides_alert_unless_all_requested() {
    let t = make_tracker().await;
    let (_, body) =
      call(t.clone(), "POST", "/shipments", Some(shipment("a", "delayed"))).await;
    let id = body["admitted"][0]["id"].as_str().unwrap().to_string();

    let (status, _) =
      call(t.clone(), "POST", &format!("/alerts/{id}/dismiss"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, visible) = call(t.clone(), "GET", "/alerts", None).await;
    assert!(visible.as_array().unwrap().is_empty());
    let (_, all) = call(t, "GET", "/alerts?all=true", None).await;
    assert_eq!(all[0]["dismissed"], true);
  }

  #[tokio::test]
  async fn unknown_alert_is_404() {
    let t = make_tracker().await;
    let id = uuid::Uuid::new_v4();
    let (status, body) =
      call(t, "POST", &format!("/alerts/{id}/read"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
  }

  #[tokio::test]
  async fn mark_all_read_and_clear() {
    let t = make_tracker().await;
    call(
      t.clone(),
      "PUT",
      "/shipments",
      Some(json!([shipment("a", "delayed"), shipment("b", "out_for_delivery")])),
    )
    .await;

    let (_, body) = call(t.clone(), "POST", "/alerts/read", None).await;
    assert_eq!(body["updated"], 2);

    let (status, _) = call(t.clone(), "DELETE", "/alerts", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, all) = call(t, "GET", "/alerts?all=true", None).await;
    assert!(all.as_array().unwrap().is_empty());
  }

  // ── Preferences & state ─────────────────────────────────────────────────────

  #[tokio::test]
  async fn preferences_round_trip() {
    let t = make_tracker().await;
    let (_, prefs) = call(t.clone(), "GET", "/preferences", None).await;
    assert_eq!(prefs["email_notifications"], true);

    let update = json!({
      "email_notifications": true,
      "delay_alerts": false,
      "delivery_alerts": true,
      "weekly_digest": false,
    });
    let (status, _) =
      call(t.clone(), "PUT", "/preferences", Some(update.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (_, prefs) = call(t, "GET", "/preferences", None).await;
    assert_eq!(prefs, update);
  }

  #[tokio::test]
  async fn export_then_import_into_fresh_tracker() {
    let t = make_tracker().await;
    call(t.clone(), "POST", "/shipments", Some(shipment("a", "delayed"))).await;
    let (_, doc) = call(t, "GET", "/export", None).await;
    assert_eq!(doc["version"], 1);

    let fresh = make_tracker().await;
    let (status, _) =
      call(fresh.clone(), "POST", "/import", Some(doc.clone())).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, again) = call(fresh, "GET", "/export", None).await;
    assert_eq!(again["alerts"], doc["alerts"]);
    assert_eq!(again["shipments"], doc["shipments"]);
  }
}
