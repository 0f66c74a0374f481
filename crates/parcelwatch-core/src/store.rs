//! The `KeyValueStore` persistence port and its in-memory implementation.
//!
//! Backends (e.g. `parcelwatch-store-sqlite`) store whole JSON documents under
//! a small set of well-known keys. The tracker depends on this abstraction,
//! not on any concrete backend.

use std::{collections::HashMap, future::Future, sync::Mutex};

use serde::de::DeserializeOwned;

// ─── Keys ────────────────────────────────────────────────────────────────────

pub const ALERTS_KEY: &str = "alerts";
pub const SHIPMENTS_KEY: &str = "shipments";
pub const PREFERENCES_KEY: &str = "preferences";

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Load/save of JSON documents by key.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait KeyValueStore: Send + Sync + 'static {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch the document stored under `key`. `Ok(None)` if nothing is stored.
  fn load<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<serde_json::Value>, Self::Error>>
  + Send
  + 'a;

  /// Replace the document stored under `key`.
  fn save<'a>(
    &'a self,
    key: &'a str,
    value: serde_json::Value,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// Load and decode `key`, falling back to `T::default()` when the document
/// is missing, unreadable or does not decode. Failures are logged, never
/// returned.
pub async fn load_or_default<S, T>(store: &S, key: &str) -> T
where
  S: KeyValueStore,
  T: DeserializeOwned + Default,
{
  let value = match store.load(key).await {
    Ok(Some(value)) => value,
    Ok(None) => return T::default(),
    Err(e) => {
      tracing::warn!(key, error = %e, "load failed; using default");
      return T::default();
    }
  };
  match serde_json::from_value(value) {
    Ok(decoded) => decoded,
    Err(e) => {
      tracing::warn!(key, error = %e, "stored document is corrupt; using default");
      T::default()
    }
  }
}

// ─── In-memory store ─────────────────────────────────────────────────────────

/// A process-local store; useful for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
  docs: Mutex<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, thiserror::Error)]
#[error("memory store lock poisoned")]
pub struct PoisonedStore;

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  /// Current document under `key`, bypassing the async port.
  pub fn get(&self, key: &str) -> Option<serde_json::Value> {
    self.docs.lock().ok()?.get(key).cloned()
  }

  /// Seed a document directly, e.g. a corrupt one in tests.
  pub fn insert(&self, key: &str, value: serde_json::Value) {
    if let Ok(mut docs) = self.docs.lock() {
      docs.insert(key.to_owned(), value);
    }
  }
}

impl KeyValueStore for MemoryStore {
  type Error = PoisonedStore;

  async fn load(&self, key: &str) -> Result<Option<serde_json::Value>, PoisonedStore> {
    let docs = self.docs.lock().map_err(|_| PoisonedStore)?;
    Ok(docs.get(key).cloned())
  }

  async fn save(&self, key: &str, value: serde_json::Value) -> Result<(), PoisonedStore> {
    let mut docs = self.docs.lock().map_err(|_| PoisonedStore)?;
    docs.insert(key.to_owned(), value);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::prefs::Preferences;

  #[tokio::test]
  async fn missing_key_yields_default() {
    let store = MemoryStore::new();
    let prefs: Preferences = load_or_default(&store, PREFERENCES_KEY).await;
    assert_eq!(prefs, Preferences::default());
  }

  #[tokio::test]
  async fn corrupt_document_yields_default() {
    let store = MemoryStore::new();
    store.insert(ALERTS_KEY, json!({ "not": "a list" }));
    let alerts: Vec<crate::alert::Alert> =
      load_or_default(&store, ALERTS_KEY).await;
    assert!(alerts.is_empty());
  }

  #[tokio::test]
  async fn saved_document_loads_back() {
    let store = MemoryStore::new();
    let prefs = Preferences { weekly_digest: false, ..Preferences::default() };
    store
      .save(PREFERENCES_KEY, serde_json::to_value(prefs).unwrap())
      .await
      .unwrap();
    let loaded: Preferences = load_or_default(&store, PREFERENCES_KEY).await;
    assert_eq!(loaded, prefs);
  }
}
