//! herald — game content announcement bot.
//!
//! Reads `config.toml` (or the path specified with `--config`), opens the
//! SQLite store, starts the expiry scanner, and long-polls Telegram for
//! commands.

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::Parser;
use herald_bot::{
  BotConfig,
  handler::{Handler, Reply},
  scanner::Scanner,
  telegram::{Broadcaster, Telegram},
};
use herald_core::store::ContentStore as _;
use herald_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "herald", about = "Game content expiry announcer")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration. Missing required keys (token, owner, broadcast
  // destination) fail here, before anything starts.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("HERALD"))
    .build()
    .context("failed to read config file")?;

  let cfg: BotConfig = settings
    .try_deserialize()
    .context("failed to deserialise BotConfig")?;

  // Open the store and seed the owner into the allow-list.
  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;
  store
    .add_admin(cfg.owner_id)
    .await
    .context("failed to seed owner admin")?;

  let client = Telegram::new(&cfg.bot_token);
  let store = Arc::new(store);

  // Start the recurring expiry scanner.
  let scanner = Scanner::new(
    Arc::clone(&store),
    Arc::new(Broadcaster::new(client.clone(), cfg.broadcast_chat_id)),
    Duration::from_secs(cfg.scan_interval_secs),
  );
  tokio::spawn(scanner.run());
  tracing::info!(
    interval_secs = cfg.scan_interval_secs,
    broadcast_chat_id = cfg.broadcast_chat_id,
    "expiry scanner started"
  );

  // Long-poll for chat updates.
  let mut handler = Handler::new(store, cfg.owner_id);
  let mut offset = 0i64;
  tracing::info!("polling for updates");

  loop {
    let updates = match client.get_updates(offset, cfg.poll_timeout_secs).await
    {
      Ok(updates) => updates,
      Err(e) => {
        tracing::warn!(error = %e, "getUpdates failed; backing off");
        tokio::time::sleep(Duration::from_secs(5)).await;
        continue;
      }
    };

    for update in updates {
      offset = offset.max(update.update_id + 1);
      let Some(message) = update.message else { continue };
      let Some(user) = message.from.as_ref() else { continue };
      let chat_id = message.chat.id;

      let replies = match handler
        .handle_message(
          chat_id,
          user.id,
          message.text.as_deref(),
          message.photo_file_id(),
        )
        .await
      {
        Ok(replies) => replies,
        Err(e) => {
          tracing::error!(error = %e, chat_id, "message handling failed");
          continue;
        }
      };

      for reply in replies {
        let outcome = match &reply {
          Reply::Text(text) => client.send_message(chat_id, text).await,
          Reply::Photo { file_id, caption } => {
            client.send_photo(chat_id, file_id, caption).await
          }
        };
        if let Err(e) = outcome {
          tracing::warn!(error = %e, chat_id, "reply failed");
        }
      }
    }
  }
}
