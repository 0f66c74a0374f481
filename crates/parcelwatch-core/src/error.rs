//! Error types for `parcelwatch-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("alert not found: {0}")]
  AlertNotFound(Uuid),

  #[error("shipment not found: {0}")]
  ShipmentNotFound(String),

  #[error("invalid shipment {shipment_id:?}: {reason}")]
  InvalidShipment { shipment_id: String, reason: String },

  #[error("unsupported export version {0}")]
  UnsupportedExport(u32),

  /// The persistence port failed to save. In-memory state has already been
  /// updated when this is returned.
  #[error("persistence error on key {key:?}: {source}")]
  Persistence {
    key:    &'static str,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
