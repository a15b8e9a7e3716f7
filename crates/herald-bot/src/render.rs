//! Outbound message text.
//!
//! Everything users and the broadcast chat see is composed here, so the
//! wording lives in one place.

use chrono::{DateTime, Utc};
use herald_core::{
  clock::{TimeLeft, time_left},
  content::ContentItem,
  region::Region,
};

/// Terminal remaining-time text for anything at or past its expiry.
pub const EXPIRED_TEXT: &str = "expired";

pub fn time_left_text(left: TimeLeft) -> String {
  match left {
    TimeLeft::Expired => EXPIRED_TEXT.to_owned(),
    TimeLeft::Remaining { days, hours, minutes, seconds } => {
      format!("{days}d {hours}h {minutes}m {seconds}s")
    }
  }
}

/// The `/events` listing. The first (oldest) entry is highlighted as the
/// featured event.
pub fn event_list(items: &[ContentItem], now: DateTime<Utc>) -> String {
  let mut out = String::from("Current events:\n");
  for (index, item) in items.iter().enumerate() {
    let (icon, label) =
      if index == 0 { ("❖", "Featured event") } else { ("✦", "Event") };
    out.push('\n');
    out.push_str(&format!("{icon} {label} [{}]\n", item.label()));
    if let Some(description) =
      item.description.as_deref().filter(|d| !d.is_empty())
    {
      out.push_str(&format!("About: {description}\n"));
    }
    let left = item
      .expires
      .iter()
      .next()
      .map(|(_, end)| time_left_text(time_left(end, now)))
      .unwrap_or_else(|| "unknown".to_owned());
    out.push_str(&format!("Time left: {left}\n"));
  }
  out
}

/// The banner/ship/tower view: title, event name, and one remaining-time
/// line per region with a stored expiry.
pub fn singleton_view(item: &ContentItem, now: DateTime<Utc>) -> String {
  let mut out = String::new();
  if let Some(title) = item.title.as_deref().filter(|t| !t.is_empty()) {
    out.push_str(&format!("🔹 {title}\n\n"));
  }
  if let Some(name) = item.name.as_deref().filter(|n| !n.is_empty()) {
    out.push_str(&format!("{name}\n\n"));
  }
  for (region, end) in item.expires.iter() {
    out.push_str(&format!(
      "⏳ {} server: {}\n",
      region.display_name(),
      time_left_text(time_left(end, now))
    ));
  }
  out
}

pub fn one_hour_warning(item: &ContentItem, region: Region) -> String {
  format!(
    "⏰ One hour left: {} ({} server)",
    item.label(),
    region.display_name()
  )
}

pub fn expired_alert(item: &ContentItem, region: Region) -> String {
  format!(
    "🏁 Now over: {} ({} server)",
    item.label(),
    region.display_name()
  )
}
