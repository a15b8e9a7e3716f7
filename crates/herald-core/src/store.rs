//! The `ContentStore` trait.
//!
//! Implemented by storage backends (e.g. `herald-store-sqlite`). The bot
//! front end and the expiry scanner depend on this abstraction, not on any
//! concrete backend. The alert ledger lives behind the same trait because
//! its rows are cascade-deleted with their content record — one backend
//! must own both.
//!
//! All methods return `Send` futures so the trait can be used from
//! multi-threaded async runtimes.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  content::{AlertKind, ContentItem, NewContent, Section},
  region::Region,
};

/// Abstraction over Herald's persistent state: content records, the alert
/// ledger, the server offset registry, and the admin allow-list.
pub trait ContentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Content ───────────────────────────────────────────────────────────

  /// Create or replace a record and return its identity.
  ///
  /// Singleton sections are replaced in place: the existing record (if any)
  /// keeps its identity, all fields are overwritten, and its alert history
  /// is cleared so the fresh content is eligible for every alert kind
  /// again. The repeatable section always inserts a new record.
  fn upsert(
    &self,
    section: Section,
    content: NewContent,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// The current record for a singleton section, if any. For the
  /// repeatable section this returns the oldest record.
  fn get(
    &self,
    section: Section,
  ) -> impl Future<Output = Result<Option<ContentItem>, Self::Error>> + Send + '_;

  /// All records for a section, in insertion order.
  fn list(
    &self,
    section: Section,
  ) -> impl Future<Output = Result<Vec<ContentItem>, Self::Error>> + Send + '_;

  /// Remove a single record and its alert history. Returns `false` if the
  /// id did not exist.
  fn delete(
    &self,
    content_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Remove every record in `section` whose stored expiries have all
  /// passed by `now`, cascading alert history. Returns the removed ids.
  fn delete_expired(
    &self,
    section: Section,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<i64>, Self::Error>> + Send + '_;

  /// Remove every record in `section`, cascading alert history. Returns
  /// the number of records removed.
  fn delete_all(
    &self,
    section: Section,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Alert ledger ──────────────────────────────────────────────────────

  /// Whether an alert has already been delivered for this triple.
  fn was_sent(
    &self,
    content_id: i64,
    region: Region,
    kind: AlertKind,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Record a delivered alert. Idempotent: re-marking an existing triple
  /// is a silent no-op, never an error.
  fn mark_sent(
    &self,
    content_id: i64,
    region: Region,
    kind: AlertKind,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Drop every ledger row for a record. Called when the record is
  /// replaced so it becomes alertable again.
  fn clear_alerts(
    &self,
    content_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Server offset registry ────────────────────────────────────────────

  /// The region's offset from UTC in whole hours; 0 when unset, so an
  /// unregistered region is simply treated as UTC.
  fn get_offset(
    &self,
    region: Region,
  ) -> impl Future<Output = Result<i32, Self::Error>> + Send + '_;

  fn set_offset(
    &self,
    region: Region,
    offset_hours: i32,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Admin allow-list ──────────────────────────────────────────────────

  fn is_admin(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Idempotent insert.
  fn add_admin(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Returns `false` if the id was not on the list.
  fn remove_admin(
    &self,
    user_id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
