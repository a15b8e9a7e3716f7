//! Error types for `herald-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Wall-clock input that does not match `YYYY-MM-DD HH:MM:SS` exactly.
  #[error("invalid wall-clock time {0:?} (expected YYYY-MM-DD HH:MM:SS)")]
  InvalidWallClock(String),

  #[error("UTC offset out of range: {0} hours")]
  OffsetOutOfRange(i32),

  #[error("unknown section key: {0:?}")]
  UnknownSection(String),

  #[error("unknown region key: {0:?}")]
  UnknownRegion(String),

  #[error("unknown alert kind key: {0:?}")]
  UnknownAlertKind(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
