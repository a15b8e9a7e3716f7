//! Minimal Telegram Bot API client.
//!
//! Long polling via `getUpdates`; outbound text and photo messages. Only
//! the handful of payload fields the bot actually reads are modelled.

use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use thiserror::Error;

use crate::scanner::AlertSink;

#[derive(Debug, Error)]
pub enum TelegramError {
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The API answered with `ok: false`.
  #[error("telegram api error: {0}")]
  Api(String),
}

pub type Result<T, E = TelegramError> = std::result::Result<T, E>;

// ─── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
  ok:          bool,
  result:      Option<T>,
  description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
  pub update_id: i64,
  pub message:   Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
  pub from:  Option<User>,
  pub chat:  Chat,
  pub text:  Option<String>,
  /// Thumbnail sizes, smallest first; the last entry is the full photo.
  pub photo: Option<Vec<PhotoSize>>,
}

impl Message {
  /// File id of the largest attached photo, if any.
  pub fn photo_file_id(&self) -> Option<&str> {
    self
      .photo
      .as_ref()
      .and_then(|sizes| sizes.last())
      .map(|size| size.file_id.as_str())
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
  pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
  pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
  pub file_id: String,
}

// ─── Client ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Telegram {
  http: reqwest::Client,
  base: String,
}

impl Telegram {
  pub fn new(token: &str) -> Self {
    Telegram {
      http: reqwest::Client::new(),
      base: format!("https://api.telegram.org/bot{token}"),
    }
  }

  async fn call<T: DeserializeOwned>(
    &self,
    method: &str,
    body: serde_json::Value,
  ) -> Result<T> {
    let response: ApiResponse<T> = self
      .http
      .post(format!("{}/{method}", self.base))
      .json(&body)
      .send()
      .await?
      .json()
      .await?;

    if response.ok {
      response
        .result
        .ok_or_else(|| TelegramError::Api("ok response without result".into()))
    } else {
      Err(TelegramError::Api(
        response.description.unwrap_or_else(|| "unknown error".into()),
      ))
    }
  }

  /// Long-poll for updates past `offset`. Blocks server-side for up to
  /// `timeout_secs`.
  pub async fn get_updates(
    &self,
    offset: i64,
    timeout_secs: u64,
  ) -> Result<Vec<Update>> {
    self
      .call(
        "getUpdates",
        json!({
          "offset": offset,
          "timeout": timeout_secs,
          "allowed_updates": ["message"],
        }),
      )
      .await
  }

  pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<()> {
    let _: serde_json::Value = self
      .call("sendMessage", json!({ "chat_id": chat_id, "text": text }))
      .await?;
    Ok(())
  }

  pub async fn send_photo(
    &self,
    chat_id: i64,
    file_id: &str,
    caption: &str,
  ) -> Result<()> {
    let _: serde_json::Value = self
      .call(
        "sendPhoto",
        json!({ "chat_id": chat_id, "photo": file_id, "caption": caption }),
      )
      .await?;
    Ok(())
  }
}

// ─── Broadcast sink ──────────────────────────────────────────────────────────

/// [`AlertSink`] that delivers every alert to one fixed chat.
#[derive(Clone)]
pub struct Broadcaster {
  client:  Telegram,
  chat_id: i64,
}

impl Broadcaster {
  pub fn new(client: Telegram, chat_id: i64) -> Self {
    Broadcaster { client, chat_id }
  }
}

impl AlertSink for Broadcaster {
  type Error = TelegramError;

  async fn deliver(&self, text: &str) -> Result<()> {
    self.client.send_message(self.chat_id, text).await
  }
}
