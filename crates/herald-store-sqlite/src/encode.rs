//! Row <-> domain-type conversions.
//!
//! Datetimes are stored as `YYYY-MM-DD HH:MM:SS` UTC text so SQL string
//! comparison agrees with chronological order.

use chrono::{DateTime, NaiveDateTime, Utc};
use herald_core::{
  clock::WALL_CLOCK_FORMAT,
  content::{ContentItem, ExpirySet, Section},
};

use crate::{Error, Result};

pub fn encode_dt(at: DateTime<Utc>) -> String {
  at.format(WALL_CLOCK_FORMAT).to_string()
}

pub fn decode_dt(text: &str) -> Result<DateTime<Utc>> {
  NaiveDateTime::parse_from_str(text, WALL_CLOCK_FORMAT)
    .map(|naive| naive.and_utc())
    .map_err(|e| Error::DateParse(format!("{text:?}: {e}")))
}

/// A `content` row as it comes off the wire, before decoding.
pub struct RawContent {
  pub id:              i64,
  pub section:         String,
  pub title:           Option<String>,
  pub name:            Option<String>,
  pub description:     Option<String>,
  pub expires_asia:    Option<String>,
  pub expires_europe:  Option<String>,
  pub expires_america: Option<String>,
  pub image_ref:       Option<String>,
}

impl RawContent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawContent> {
    Ok(RawContent {
      id:              row.get(0)?,
      section:         row.get(1)?,
      title:           row.get(2)?,
      name:            row.get(3)?,
      description:     row.get(4)?,
      expires_asia:    row.get(5)?,
      expires_europe:  row.get(6)?,
      expires_america: row.get(7)?,
      image_ref:       row.get(8)?,
    })
  }

  pub fn decode(self) -> Result<ContentItem> {
    let expires = ExpirySet {
      asia:    self.expires_asia.as_deref().map(decode_dt).transpose()?,
      europe:  self.expires_europe.as_deref().map(decode_dt).transpose()?,
      america: self.expires_america.as_deref().map(decode_dt).transpose()?,
    };
    Ok(ContentItem {
      id: self.id,
      section: Section::from_key(&self.section).map_err(Error::Core)?,
      title: self.title,
      name: self.name,
      description: self.description,
      expires,
      image_ref: self.image_ref,
    })
  }
}
