//! [`SqliteStore`], the SQLite implementation of [`KeyValueStore`].

use std::path::Path;

use chrono::Utc;
use parcelwatch_core::store::KeyValueStore;
use rusqlite::OptionalExtension as _;

use crate::{Result, schema::SCHEMA};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A parcelwatch document store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and make sure the schema exists.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::with_schema(tokio_rusqlite::Connection::open(path).await?).await
  }

  /// A store that lives only as long as the connection; used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    Self::with_schema(tokio_rusqlite::Connection::open_in_memory().await?).await
  }

  async fn with_schema(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn.call(|db| Ok(db.execute_batch(SCHEMA)?)).await?;
    Ok(Self { conn })
  }

  /// Store raw text under `key` without JSON validation. Lets tests seed
  /// corrupt documents.
  pub async fn put_raw(&self, key: &str, text: &str) -> Result<()> {
    let key = key.to_owned();
    let text = text.to_owned();
    let at = Utc::now().to_rfc3339();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO records (key, value_json, updated_at) VALUES (?1, ?2, ?3)
           ON CONFLICT(key) DO UPDATE
             SET value_json = excluded.value_json,
                 updated_at = excluded.updated_at",
          rusqlite::params![key, text, at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Every stored key, sorted.
  pub async fn keys(&self) -> Result<Vec<String>> {
    let keys = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT key FROM records ORDER BY key")?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(keys)
  }
}

// ─── KeyValueStore impl ──────────────────────────────────────────────────────

impl KeyValueStore for SqliteStore {
  type Error = crate::Error;

  async fn load(&self, key: &str) -> Result<Option<serde_json::Value>> {
    let key = key.to_owned();

    let text: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT value_json FROM records WHERE key = ?1",
              rusqlite::params![key],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    text.map(|t| serde_json::from_str(&t)).transpose().map_err(Into::into)
  }

  async fn save(&self, key: &str, value: serde_json::Value) -> Result<()> {
    self.put_raw(key, &value.to_string()).await
  }
}
