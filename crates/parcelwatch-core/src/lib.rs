//! Core types, alert rules and alert lifecycle for parcelwatch.
//!
//! Shipments come in from the orchestration layer, the rule engine turns each
//! one into candidate alerts, and the lifecycle functions decide which of
//! those candidates become persisted alerts and which existing alerts expire.
//! Storage and notification delivery are reached only through the
//! [`store::KeyValueStore`] and [`notify::Notifier`] traits.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod alert;
pub mod change;
pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod prefs;
pub mod rules;
pub mod shipment;
pub mod store;
pub mod tracker;

pub use error::{Error, Result};
