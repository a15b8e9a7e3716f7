//! Regional game servers and their fixed UTC offsets.
//!
//! Offsets are data, not compiled constants: the store seeds the defaults
//! below at open and an administrator may change them later. A region with
//! no stored offset is treated as UTC so time math never blocks on a
//! missing row.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A named server population with its own fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
  Asia,
  Europe,
  America,
}

impl Region {
  pub const ALL: [Region; 3] = [Region::Asia, Region::Europe, Region::America];

  /// Stable key used in storage and configuration.
  pub fn key(self) -> &'static str {
    match self {
      Region::Asia => "asia",
      Region::Europe => "europe",
      Region::America => "america",
    }
  }

  pub fn from_key(key: &str) -> Result<Region> {
    match key {
      "asia" => Ok(Region::Asia),
      "europe" => Ok(Region::Europe),
      "america" => Ok(Region::America),
      other => Err(Error::UnknownRegion(other.to_owned())),
    }
  }

  /// Offset seeded into a fresh store.
  pub fn default_offset_hours(self) -> i32 {
    match self {
      Region::Asia => 8,
      Region::Europe => 1,
      Region::America => -5,
    }
  }

  pub fn display_name(self) -> &'static str {
    match self {
      Region::Asia => "Asia",
      Region::Europe => "Europe",
      Region::America => "America",
    }
  }
}

/// A point-in-time read of all three offsets, taken from the store before
/// parsing a batch of wall-clock inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetSnapshot {
  pub asia:    i32,
  pub europe:  i32,
  pub america: i32,
}

impl OffsetSnapshot {
  pub fn get(self, region: Region) -> i32 {
    match region {
      Region::Asia => self.asia,
      Region::Europe => self.europe,
      Region::America => self.america,
    }
  }
}

impl Default for OffsetSnapshot {
  fn default() -> Self {
    OffsetSnapshot {
      asia:    Region::Asia.default_offset_hours(),
      europe:  Region::Europe.default_offset_hours(),
      america: Region::America.default_offset_hours(),
    }
  }
}
