//! Inbound message dispatch.
//!
//! Resolves commands, keyword queries, and in-flight wizard steps into
//! structured replies. Storage errors bubble to the poll loop; user
//! mistakes (format errors, missing permissions, empty sections) are
//! always answered with a reply, never silence.

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use herald_core::{
  content::Section,
  region::{OffsetSnapshot, Region},
  store::ContentStore,
};
use tracing::info;

use crate::{
  render,
  wizard::{Step, Wizard, WizardInput},
};

const DENIED: &str = "Sorry, only admins can do that.";

const HELP: &str = "Herald commands:\n\
  banner / ship / tower: remaining time per server\n\
  events: current event list\n\
  Admin: /setbanner /setship /settower /setevents /delevents\n\
  /addadmin <id> /deladmin <id> /setoffset <region> <hours>";

/// One outbound reply to the chat that triggered the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
  Text(String),
  Photo { file_id: String, caption: String },
}

impl Reply {
  fn text(text: impl Into<String>) -> Vec<Reply> {
    vec![Reply::Text(text.into())]
  }
}

/// Per-process dispatch state: the store handle plus one wizard slot per
/// (chat, user). Keying on the user too means nobody else in a group chat
/// can feed steps into, or cancel, someone's in-flight submission.
pub struct Handler<S> {
  store:    Arc<S>,
  owner_id: i64,
  wizards:  HashMap<(i64, i64), Wizard>,
}

impl<S: ContentStore> Handler<S> {
  pub fn new(store: Arc<S>, owner_id: i64) -> Self {
    Handler { store, owner_id, wizards: HashMap::new() }
  }

  /// Route one inbound message. `photo_file_id` is the largest attached
  /// photo, if any.
  pub async fn handle_message(
    &mut self,
    chat_id: i64,
    user_id: i64,
    text: Option<&str>,
    photo_file_id: Option<&str>,
  ) -> Result<Vec<Reply>, S::Error> {
    // A command interrupts whatever else the sender is doing, including
    // their own wizard. Other users' wizards are untouched.
    if let Some(text) = text {
      let trimmed = text.trim();
      if trimmed.starts_with('/') {
        self.wizards.remove(&(chat_id, user_id));
        return self.handle_command(chat_id, user_id, trimmed).await;
      }
    }

    // The sender's in-flight wizard consumes the message next.
    if let Some(state) = self.wizards.remove(&(chat_id, user_id)) {
      return self
        .step_wizard(chat_id, user_id, state, text, photo_file_id)
        .await;
    }

    // Plain-text queries, open to everyone.
    if let Some(text) = text {
      match text.trim().to_lowercase().as_str() {
        "banner" => return self.singleton_view(Section::Banner).await,
        "ship" => return self.singleton_view(Section::Ship).await,
        "tower" => return self.singleton_view(Section::Tower).await,
        "events" => return self.event_list().await,
        _ => {}
      }
    }

    Ok(Vec::new())
  }

  // ── Commands ──────────────────────────────────────────────────────────────

  async fn handle_command(
    &mut self,
    chat_id: i64,
    user_id: i64,
    line: &str,
  ) -> Result<Vec<Reply>, S::Error> {
    let mut parts = line.split_whitespace();
    let command = parts
      .next()
      .and_then(|word| word.split('@').next())
      .unwrap_or("");

    match command {
      "/setbanner" => self.start_wizard(chat_id, user_id, Section::Banner).await,
      "/setship" => self.start_wizard(chat_id, user_id, Section::Ship).await,
      "/settower" => self.start_wizard(chat_id, user_id, Section::Tower).await,
      "/setevents" => self.start_wizard(chat_id, user_id, Section::Events).await,

      "/banner" => self.singleton_view(Section::Banner).await,
      "/ship" => self.singleton_view(Section::Ship).await,
      "/tower" => self.singleton_view(Section::Tower).await,
      "/events" | "/event" => self.event_list().await,

      "/delevents" => {
        if !self.check_admin(user_id).await? {
          return Ok(Reply::text(DENIED));
        }
        let removed = self.store.delete_all(Section::Events).await?;
        info!(user_id, removed, "events cleared");
        Ok(Reply::text(format!("Removed {removed} event(s).")))
      }

      "/addadmin" => {
        if !self.check_admin(user_id).await? {
          return Ok(Reply::text(DENIED));
        }
        let Some(id) = parts.next().and_then(|a| a.parse::<i64>().ok()) else {
          return Ok(Reply::text("Usage: /addadmin <numeric user id>"));
        };
        self.store.add_admin(id).await?;
        info!(user_id, new_admin = id, "admin added");
        Ok(Reply::text(format!("Added {id} to the admin list.")))
      }

      "/deladmin" => {
        if !self.check_admin(user_id).await? {
          return Ok(Reply::text(DENIED));
        }
        let Some(id) = parts.next().and_then(|a| a.parse::<i64>().ok()) else {
          return Ok(Reply::text("Usage: /deladmin <numeric user id>"));
        };
        if id == self.owner_id {
          return Ok(Reply::text("The owner cannot be removed."));
        }
        let removed = self.store.remove_admin(id).await?;
        info!(user_id, removed_admin = id, removed, "admin removal");
        Ok(Reply::text(if removed {
          format!("Removed {id} from the admin list.")
        } else {
          format!("{id} was not on the admin list.")
        }))
      }

      "/setoffset" => {
        if !self.check_admin(user_id).await? {
          return Ok(Reply::text(DENIED));
        }
        let region = parts.next().and_then(|a| Region::from_key(a).ok());
        let hours = parts.next().and_then(|a| a.parse::<i32>().ok());
        let (Some(region), Some(hours)) = (region, hours) else {
          return Ok(Reply::text(
            "Usage: /setoffset <asia|europe|america> <hours>",
          ));
        };
        self.store.set_offset(region, hours).await?;
        info!(user_id, region = region.key(), hours, "offset updated");
        Ok(Reply::text(format!(
          "{} server offset set to UTC{hours:+}.",
          region.display_name()
        )))
      }

      "/help" | "/start" => Ok(Reply::text(HELP)),

      // Unknown slash commands are somebody else's bot in a group chat.
      _ => Ok(Vec::new()),
    }
  }

  async fn start_wizard(
    &mut self,
    chat_id: i64,
    user_id: i64,
    section: Section,
  ) -> Result<Vec<Reply>, S::Error> {
    if !self.check_admin(user_id).await? {
      return Ok(Reply::text(DENIED));
    }
    let (state, prompt) = Wizard::start(section);
    self.wizards.insert((chat_id, user_id), state);
    Ok(Reply::text(prompt))
  }

  async fn step_wizard(
    &mut self,
    chat_id: i64,
    user_id: i64,
    state: Wizard,
    text: Option<&str>,
    photo_file_id: Option<&str>,
  ) -> Result<Vec<Reply>, S::Error> {
    let input = if let Some(file_id) = photo_file_id {
      WizardInput::Photo { file_id }
    } else if let Some(text) = text {
      WizardInput::Text(text)
    } else {
      // Sticker, voice note, etc: leave the wizard where it was.
      self.wizards.insert((chat_id, user_id), state);
      return Ok(Vec::new());
    };

    let offsets = self.offsets().await?;
    match state.step(input, offsets) {
      Step::Prompt { next, reply } => {
        self.wizards.insert((chat_id, user_id), next);
        Ok(Reply::text(reply))
      }
      Step::Finished { section, content } => {
        let label = content
          .name
          .clone()
          .or_else(|| content.title.clone())
          .unwrap_or_else(|| section.display_name().to_owned());
        let id = self.store.upsert(section, content).await?;
        info!(content_id = id, section = section.key(), "content saved");
        Ok(Reply::text(format!("✅ Saved: {label}")))
      }
    }
  }

  // ── Queries ───────────────────────────────────────────────────────────────

  async fn singleton_view(
    &self,
    section: Section,
  ) -> Result<Vec<Reply>, S::Error> {
    let Some(item) = self.store.get(section).await? else {
      return Ok(Reply::text("Nothing here yet."));
    };
    let caption = render::singleton_view(&item, Utc::now());
    Ok(vec![match item.image_ref {
      Some(file_id) => Reply::Photo { file_id, caption },
      None => Reply::Text(caption),
    }])
  }

  async fn event_list(&self) -> Result<Vec<Reply>, S::Error> {
    let now = Utc::now();
    // Sweep first so a listing never shows an item the scanner has not
    // got to yet.
    let removed = self.store.delete_expired(Section::Events, now).await?;
    if !removed.is_empty() {
      info!(count = removed.len(), "expired events swept on listing");
    }

    let items = self.store.list(Section::Events).await?;
    if items.is_empty() {
      return Ok(Reply::text("No events right now."));
    }
    Ok(Reply::text(render::event_list(&items, now)))
  }

  // ── Support ───────────────────────────────────────────────────────────────

  async fn check_admin(&self, user_id: i64) -> Result<bool, S::Error> {
    Ok(user_id == self.owner_id || self.store.is_admin(user_id).await?)
  }

  async fn offsets(&self) -> Result<OffsetSnapshot, S::Error> {
    Ok(OffsetSnapshot {
      asia:    self.store.get_offset(Region::Asia).await?,
      europe:  self.store.get_offset(Region::Europe).await?,
      america: self.store.get_offset(Region::America).await?,
    })
  }
}

#[cfg(test)]
mod tests {
  use herald_core::content::{ExpirySet, NewContent};
  use herald_store_sqlite::SqliteStore;

  use super::*;

  const OWNER: i64 = 1;
  const CHAT: i64 = 100;

  async fn handler() -> Handler<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    store.add_admin(OWNER).await.unwrap();
    Handler::new(Arc::new(store), OWNER)
  }

  async fn send(
    h: &mut Handler<SqliteStore>,
    user: i64,
    text: &str,
  ) -> Vec<Reply> {
    h.handle_message(CHAT, user, Some(text), None).await.unwrap()
  }

  fn single_text(replies: &[Reply]) -> &str {
    match replies {
      [Reply::Text(text)] => text,
      other => panic!("expected one text reply, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn non_admin_set_commands_are_refused_with_a_reply() {
    let mut h = handler().await;
    for command in ["/setbanner", "/setship", "/settower", "/setevents",
                    "/delevents", "/addadmin 5", "/setoffset asia 9"] {
      let replies = send(&mut h, 999, command).await;
      assert_eq!(single_text(&replies), DENIED, "command {command}");
    }
  }

  #[tokio::test]
  async fn banner_wizard_end_to_end() {
    let mut h = handler().await;

    send(&mut h, OWNER, "/setbanner").await;
    send(&mut h, OWNER, "Version 5.0 ; Ballad in Goblets").await;
    send(&mut h, OWNER, "2030-01-01 10:00:00").await;
    send(&mut h, OWNER, "2030-01-01 03:00:00").await;
    send(&mut h, OWNER, "2029-12-31 21:00:00").await;
    let replies = h
      .handle_message(CHAT, OWNER, None, Some("file-7"))
      .await
      .unwrap();
    assert!(single_text(&replies).contains("Saved"), "{replies:?}");

    let item = h.store.get(Section::Banner).await.unwrap().unwrap();
    assert_eq!(item.title.as_deref(), Some("Version 5.0"));
    assert_eq!(item.image_ref.as_deref(), Some("file-7"));
    assert!(item.expires.asia.is_some());
  }

  #[tokio::test]
  async fn format_error_keeps_the_wizard_on_the_same_step() {
    let mut h = handler().await;
    send(&mut h, OWNER, "/setevents").await;

    let replies = send(&mut h, OWNER, "no separators at all").await;
    assert!(single_text(&replies).contains("Format"), "{replies:?}");

    // The retry succeeds from the same state.
    let replies =
      send(&mut h, OWNER, "Lantern Rite ; 2030-02-01 18:00:00").await;
    assert!(single_text(&replies).contains("Saved"), "{replies:?}");
    assert_eq!(h.store.list(Section::Events).await.unwrap().len(), 1);
  }

  #[tokio::test]
  async fn empty_sections_report_nothing_here() {
    let mut h = handler().await;
    let replies = send(&mut h, 999, "banner").await;
    assert_eq!(single_text(&replies), "Nothing here yet.");

    let replies = send(&mut h, 999, "events").await;
    assert_eq!(single_text(&replies), "No events right now.");
  }

  #[tokio::test]
  async fn event_listing_sweeps_expired_rows() {
    let mut h = handler().await;
    let mut expires = ExpirySet::default();
    expires.set(Region::Europe, Utc::now() - chrono::Duration::hours(1));
    h.store
      .upsert(Section::Events, NewContent {
        name: Some("Over".into()),
        expires,
        ..NewContent::default()
      })
      .await
      .unwrap();

    let replies = send(&mut h, 999, "events").await;
    assert_eq!(single_text(&replies), "No events right now.");
    assert!(h.store.list(Section::Events).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn singleton_with_photo_replies_with_a_photo() {
    let mut h = handler().await;
    h.store
      .upsert(Section::Tower, NewContent {
        title: Some("Floor 12".into()),
        image_ref: Some("file-3".into()),
        ..NewContent::default()
      })
      .await
      .unwrap();

    let replies = send(&mut h, 999, "tower").await;
    match &replies[..] {
      [Reply::Photo { file_id, caption }] => {
        assert_eq!(file_id, "file-3");
        assert!(caption.contains("Floor 12"), "{caption}");
      }
      other => panic!("expected photo reply, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn admin_list_management() {
    let mut h = handler().await;

    let replies = send(&mut h, OWNER, "/addadmin 55").await;
    assert!(single_text(&replies).contains("Added 55"), "{replies:?}");
    assert!(h.store.is_admin(55).await.unwrap());

    // The new admin can act.
    let replies = send(&mut h, 55, "/deladmin 55").await;
    assert!(single_text(&replies).contains("Removed 55"), "{replies:?}");
    assert!(!h.store.is_admin(55).await.unwrap());

    let replies = send(&mut h, OWNER, "/deladmin 1").await;
    assert_eq!(single_text(&replies), "The owner cannot be removed.");

    let replies = send(&mut h, OWNER, "/addadmin nonsense").await;
    assert!(single_text(&replies).starts_with("Usage"), "{replies:?}");
  }

  #[tokio::test]
  async fn commands_interrupt_an_active_wizard() {
    let mut h = handler().await;
    send(&mut h, OWNER, "/setbanner").await;
    send(&mut h, OWNER, "/help").await;

    // The old wizard is gone: free text is no longer consumed as a title.
    let replies = send(&mut h, OWNER, "Version 5.0 ; name").await;
    assert!(replies.is_empty(), "{replies:?}");
  }

  #[tokio::test]
  async fn other_users_cannot_step_someones_wizard() {
    let mut h = handler().await;
    send(&mut h, OWNER, "/setevents").await;

    // A bystander's message in the same chat is plain text to the
    // dispatcher, not a wizard step; nothing gets persisted.
    let replies =
      send(&mut h, 999, "Hijacked ; 2030-02-01 18:00:00").await;
    assert!(replies.is_empty(), "{replies:?}");
    assert!(h.store.list(Section::Events).await.unwrap().is_empty());

    // The starter's wizard is still waiting on its own step.
    let replies =
      send(&mut h, OWNER, "Lantern Rite ; 2030-02-01 18:00:00").await;
    assert!(single_text(&replies).contains("Saved"), "{replies:?}");
    let items = h.store.list(Section::Events).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name.as_deref(), Some("Lantern Rite"));
  }

  #[tokio::test]
  async fn other_users_commands_do_not_cancel_a_wizard() {
    let mut h = handler().await;
    send(&mut h, OWNER, "/setbanner").await;
    send(&mut h, 999, "/help").await;

    // Still on the title step: the owner's next message advances it.
    let replies = send(&mut h, OWNER, "Version 5.0 ; name").await;
    assert!(single_text(&replies).contains("Asia"), "{replies:?}");
  }

  #[tokio::test]
  async fn set_offset_changes_wizard_parsing() {
    let mut h = handler().await;
    send(&mut h, OWNER, "/setoffset europe 2").await;

    send(&mut h, OWNER, "/setevents").await;
    send(&mut h, OWNER, "Ley Lines ; 2030-02-01 18:00:00").await;

    let items = h.store.list(Section::Events).await.unwrap();
    // +2 offset: 18:00 local is 16:00 UTC.
    assert_eq!(
      items[0].expires.europe,
      Some(
        chrono::TimeZone::with_ymd_and_hms(&Utc, 2030, 2, 1, 16, 0, 0)
          .unwrap()
      )
    );
  }
}
