//! Content records — the unit tracked by the expiry engine.
//!
//! A record belongs to a section. The three singleton sections (banner,
//! ship, tower) hold at most one record each and are replaced in place; the
//! `events` section is an open-ended list whose records are created once
//! and removed when they expire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  region::Region,
};

// ─── Sections ────────────────────────────────────────────────────────────────

/// Content category. Everything except [`Section::Events`] is a singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
  Banner,
  Ship,
  Tower,
  Events,
}

impl Section {
  pub const ALL: [Section; 4] =
    [Section::Banner, Section::Ship, Section::Tower, Section::Events];

  /// Whether at most one record may exist for this section at a time.
  pub fn is_singleton(self) -> bool {
    !matches!(self, Section::Events)
  }

  /// Stable key used in storage.
  pub fn key(self) -> &'static str {
    match self {
      Section::Banner => "banner",
      Section::Ship => "stygian",
      Section::Tower => "spiral_abyss",
      Section::Events => "events",
    }
  }

  pub fn from_key(key: &str) -> Result<Section> {
    match key {
      "banner" => Ok(Section::Banner),
      "stygian" => Ok(Section::Ship),
      "spiral_abyss" => Ok(Section::Tower),
      "events" => Ok(Section::Events),
      other => Err(Error::UnknownSection(other.to_owned())),
    }
  }

  pub fn display_name(self) -> &'static str {
    match self {
      Section::Banner => "Banner",
      Section::Ship => "Stygian Onslaught",
      Section::Tower => "Spiral Abyss",
      Section::Events => "Events",
    }
  }
}

// ─── Alert kinds ─────────────────────────────────────────────────────────────

/// The two notification triggers recognised by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
  OneHourWarning,
  Expired,
}

impl AlertKind {
  pub fn key(self) -> &'static str {
    match self {
      AlertKind::OneHourWarning => "one_hour",
      AlertKind::Expired => "expired",
    }
  }

  pub fn from_key(key: &str) -> Result<AlertKind> {
    match key {
      "one_hour" => Ok(AlertKind::OneHourWarning),
      "expired" => Ok(AlertKind::Expired),
      other => Err(Error::UnknownAlertKind(other.to_owned())),
    }
  }
}

// ─── Expiry set ──────────────────────────────────────────────────────────────

/// Per-region expiry instants, always normalised to UTC.
///
/// Singleton sections populate all three slots; event records populate only
/// the Europe slot by convention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpirySet {
  pub asia:    Option<DateTime<Utc>>,
  pub europe:  Option<DateTime<Utc>>,
  pub america: Option<DateTime<Utc>>,
}

impl ExpirySet {
  pub fn get(&self, region: Region) -> Option<DateTime<Utc>> {
    match region {
      Region::Asia => self.asia,
      Region::Europe => self.europe,
      Region::America => self.america,
    }
  }

  pub fn set(&mut self, region: Region, at: DateTime<Utc>) {
    match region {
      Region::Asia => self.asia = Some(at),
      Region::Europe => self.europe = Some(at),
      Region::America => self.america = Some(at),
    }
  }

  /// Iterate the populated slots in registry order.
  pub fn iter(&self) -> impl Iterator<Item = (Region, DateTime<Utc>)> + '_ {
    Region::ALL
      .into_iter()
      .filter_map(|region| self.get(region).map(|at| (region, at)))
  }

  pub fn is_empty(&self) -> bool {
    self.iter().next().is_none()
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A stored content record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
  pub id:          i64,
  pub section:     Section,
  pub title:       Option<String>,
  pub name:        Option<String>,
  pub description: Option<String>,
  pub expires:     ExpirySet,
  /// Opaque front-end token for an attached image (e.g. a Telegram file id).
  pub image_ref:   Option<String>,
}

impl ContentItem {
  /// Best human-readable label for notifications: name, then title.
  pub fn label(&self) -> &str {
    self
      .name
      .as_deref()
      .filter(|s| !s.is_empty())
      .or(self.title.as_deref())
      .unwrap_or(self.section.display_name())
  }
}

/// Payload for creating or replacing a record; the store assigns the id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewContent {
  pub title:       Option<String>,
  pub name:        Option<String>,
  pub description: Option<String>,
  pub expires:     ExpirySet,
  pub image_ref:   Option<String>,
}
