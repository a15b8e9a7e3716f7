//! [`SqliteStore`] — the SQLite implementation of [`ContentStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;

use herald_core::{
  content::{AlertKind, ContentItem, NewContent, Section},
  region::Region,
  store::ContentStore,
};

use crate::{
  Error, Result,
  encode::{RawContent, encode_dt},
  schema::SCHEMA,
};

const CONTENT_COLUMNS: &str = "id, section, title, name, description, \
   expires_asia, expires_europe, expires_america, image_ref";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Herald store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All
/// writers funnel through the one connection, so a singleton replacement
/// racing a scanner-triggered delete serialises there.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path`, run schema initialisation, and
  /// seed the default region offsets.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        for region in Region::ALL {
          conn.execute(
            "INSERT OR IGNORE INTO server_offsets (region, offset_hours)
             VALUES (?1, ?2)",
            rusqlite::params![region.key(), region.default_offset_hours()],
          )?;
        }
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── ContentStore impl ───────────────────────────────────────────────────────

impl ContentStore for SqliteStore {
  type Error = Error;

  // ── Content ───────────────────────────────────────────────────────────────

  async fn upsert(&self, section: Section, content: NewContent) -> Result<i64> {
    let section_key = section.key();
    let singleton = section.is_singleton();
    let asia = content.expires.asia.map(encode_dt);
    let europe = content.expires.europe.map(encode_dt);
    let america = content.expires.america.map(encode_dt);

    let id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // Singleton sections replace in place, keeping the identity.
        let existing: Option<i64> = if singleton {
          tx.query_row(
            "SELECT id FROM content WHERE section = ?1",
            rusqlite::params![section_key],
            |r| r.get(0),
          )
          .optional()?
        } else {
          None
        };

        let id = match existing {
          Some(id) => {
            tx.execute(
              "UPDATE content SET
                 title = ?1, name = ?2, description = ?3,
                 expires_asia = ?4, expires_europe = ?5, expires_america = ?6,
                 image_ref = ?7
               WHERE id = ?8",
              rusqlite::params![
                content.title,
                content.name,
                content.description,
                asia,
                europe,
                america,
                content.image_ref,
                id,
              ],
            )?;
            // The replaced content must be alertable again; stale ledger
            // rows would suppress its first-time alerts.
            tx.execute(
              "DELETE FROM sent_alerts WHERE content_id = ?1",
              rusqlite::params![id],
            )?;
            id
          }
          None => {
            tx.execute(
              "INSERT INTO content (
                 section, title, name, description,
                 expires_asia, expires_europe, expires_america, image_ref
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
              rusqlite::params![
                section_key,
                content.title,
                content.name,
                content.description,
                asia,
                europe,
                america,
                content.image_ref,
              ],
            )?;
            tx.last_insert_rowid()
          }
        };

        tx.commit()?;
        Ok(id)
      })
      .await?;
    Ok(id)
  }

  async fn get(&self, section: Section) -> Result<Option<ContentItem>> {
    let section_key = section.key();
    let raw = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!(
              "SELECT {CONTENT_COLUMNS} FROM content
               WHERE section = ?1 ORDER BY id LIMIT 1"
            ),
            rusqlite::params![section_key],
            RawContent::from_row,
          )
          .optional()?;
        Ok(raw)
      })
      .await?;
    raw.map(RawContent::decode).transpose()
  }

  async fn list(&self, section: Section) -> Result<Vec<ContentItem>> {
    let section_key = section.key();
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONTENT_COLUMNS} FROM content
           WHERE section = ?1 ORDER BY id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![section_key], RawContent::from_row)?
          .collect::<rusqlite::Result<Vec<RawContent>>>()?;
        Ok(rows)
      })
      .await?;
    rows.into_iter().map(RawContent::decode).collect()
  }

  async fn delete(&self, content_id: i64) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM sent_alerts WHERE content_id = ?1",
          rusqlite::params![content_id],
        )?;
        let n = tx.execute(
          "DELETE FROM content WHERE id = ?1",
          rusqlite::params![content_id],
        )?;
        tx.commit()?;
        Ok(n > 0)
      })
      .await?;
    Ok(removed)
  }

  async fn delete_expired(
    &self,
    section: Section,
    now: DateTime<Utc>,
  ) -> Result<Vec<i64>> {
    let section_key = section.key();
    let now_str = encode_dt(now);
    let ids = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // Due: at least one expiry stored, and every stored expiry passed.
        let ids: Vec<i64> = {
          let mut stmt = tx.prepare(
            "SELECT id FROM content
             WHERE section = ?1
               AND COALESCE(expires_asia, expires_europe, expires_america)
                   IS NOT NULL
               AND (expires_asia    IS NULL OR expires_asia    <= ?2)
               AND (expires_europe  IS NULL OR expires_europe  <= ?2)
               AND (expires_america IS NULL OR expires_america <= ?2)",
          )?;
          stmt
            .query_map(rusqlite::params![section_key, now_str], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?
        };

        for id in &ids {
          tx.execute(
            "DELETE FROM sent_alerts WHERE content_id = ?1",
            rusqlite::params![id],
          )?;
          tx.execute(
            "DELETE FROM content WHERE id = ?1",
            rusqlite::params![id],
          )?;
        }

        tx.commit()?;
        Ok(ids)
      })
      .await?;
    Ok(ids)
  }

  async fn delete_all(&self, section: Section) -> Result<u64> {
    let section_key = section.key();
    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM sent_alerts WHERE content_id IN
             (SELECT id FROM content WHERE section = ?1)",
          rusqlite::params![section_key],
        )?;
        let n = tx.execute(
          "DELETE FROM content WHERE section = ?1",
          rusqlite::params![section_key],
        )?;
        tx.commit()?;
        Ok(n as u64)
      })
      .await?;
    Ok(removed)
  }

  // ── Alert ledger ──────────────────────────────────────────────────────────

  async fn was_sent(
    &self,
    content_id: i64,
    region: Region,
    kind: AlertKind,
  ) -> Result<bool> {
    let sent = self
      .conn
      .call(move |conn| {
        let sent: bool = conn
          .query_row(
            "SELECT 1 FROM sent_alerts
             WHERE content_id = ?1 AND region = ?2 AND kind = ?3",
            rusqlite::params![content_id, region.key(), kind.key()],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        Ok(sent)
      })
      .await?;
    Ok(sent)
  }

  async fn mark_sent(
    &self,
    content_id: i64,
    region: Region,
    kind: AlertKind,
  ) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        // Two scanner ticks racing on the same boundary must not
        // double-count, hence OR IGNORE on the composite key.
        conn.execute(
          "INSERT OR IGNORE INTO sent_alerts (content_id, region, kind)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![content_id, region.key(), kind.key()],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn clear_alerts(&self, content_id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM sent_alerts WHERE content_id = ?1",
          rusqlite::params![content_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Server offset registry ────────────────────────────────────────────────

  async fn get_offset(&self, region: Region) -> Result<i32> {
    let offset = self
      .conn
      .call(move |conn| {
        let offset: Option<i32> = conn
          .query_row(
            "SELECT offset_hours FROM server_offsets WHERE region = ?1",
            rusqlite::params![region.key()],
            |r| r.get(0),
          )
          .optional()?;
        Ok(offset.unwrap_or(0))
      })
      .await?;
    Ok(offset)
  }

  async fn set_offset(&self, region: Region, offset_hours: i32) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO server_offsets (region, offset_hours)
           VALUES (?1, ?2)",
          rusqlite::params![region.key(), offset_hours],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Admin allow-list ──────────────────────────────────────────────────────

  async fn is_admin(&self, user_id: i64) -> Result<bool> {
    let found = self
      .conn
      .call(move |conn| {
        let found: bool = conn
          .query_row(
            "SELECT 1 FROM admins WHERE user_id = ?1",
            rusqlite::params![user_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        Ok(found)
      })
      .await?;
    Ok(found)
  }

  async fn add_admin(&self, user_id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO admins (user_id) VALUES (?1)",
          rusqlite::params![user_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn remove_admin(&self, user_id: i64) -> Result<bool> {
    let removed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM admins WHERE user_id = ?1",
          rusqlite::params![user_id],
        )?;
        Ok(n > 0)
      })
      .await?;
    Ok(removed)
  }
}
