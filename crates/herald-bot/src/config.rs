//! Runtime configuration, deserialised from `config.toml` plus `HERALD_*`
//! environment overrides.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
  /// Telegram bot token.
  pub bot_token: String,

  /// Seeded into the admin allow-list at startup.
  pub owner_id: i64,

  /// The single chat every alert is broadcast to. Required: without a
  /// destination the scanner must not start, so a missing value aborts
  /// configuration loading.
  pub broadcast_chat_id: i64,

  /// SQLite database file.
  pub store_path: PathBuf,

  #[serde(default = "default_scan_interval_secs")]
  pub scan_interval_secs: u64,

  #[serde(default = "default_poll_timeout_secs")]
  pub poll_timeout_secs: u64,
}

fn default_scan_interval_secs() -> u64 {
  60
}

fn default_poll_timeout_secs() -> u64 {
  30
}
