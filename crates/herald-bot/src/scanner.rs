//! The expiry scanner — a recurring pass over every stored record.
//!
//! Each tick snapshots `now` once, walks every (item, region) pair with a
//! stored expiry, and pushes due notifications through the [`AlertSink`].
//! The alert ledger makes each (item, region, kind) fire at most once, and
//! a ledger row is only written after a successful delivery, so a failed
//! send is retried on the next tick instead of being lost.

use std::{future::Future, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use herald_core::{
  content::{AlertKind, ContentItem, Section},
  region::Region,
  store::ContentStore,
};
use tracing::{error, info, warn};

use crate::render;

/// Where triggered alerts go. One fixed destination; delivery failures are
/// reported, never panicked on.
pub trait AlertSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn deliver<'a>(
    &'a self,
    text: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

pub struct Scanner<S, N> {
  store:    Arc<S>,
  sink:     Arc<N>,
  interval: Duration,
}

impl<S: ContentStore, N: AlertSink> Scanner<S, N> {
  pub fn new(store: Arc<S>, sink: Arc<N>, interval: Duration) -> Self {
    Scanner { store, sink, interval }
  }

  /// Run forever. Individual tick failures are logged and the loop
  /// continues; only process shutdown stops it.
  pub async fn run(self) {
    let mut ticker = tokio::time::interval(self.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
      ticker.tick().await;
      if let Err(e) = self.tick(Utc::now()).await {
        error!(error = %e, "scanner tick failed");
      }
    }
  }

  /// One pass. `now` is fixed for the whole tick so every comparison in
  /// the pass agrees.
  pub async fn tick(&self, now: DateTime<Utc>) -> Result<(), S::Error> {
    for section in Section::ALL {
      for item in self.store.list(section).await? {
        self.scan_item(&item, now).await?;
      }
    }
    Ok(())
  }

  async fn scan_item(
    &self,
    item: &ContentItem,
    now: DateTime<Utc>,
  ) -> Result<(), S::Error> {
    for (region, end) in item.expires.iter() {
      if end > now {
        if end - now <= chrono::Duration::hours(1) {
          self.fire(item, region, AlertKind::OneHourWarning).await?;
        }
      } else if self.fire(item, region, AlertKind::Expired).await?
        && !item.section.is_singleton()
      {
        // Repeatable items are ephemeral: once their expiry has been
        // announced the record and its ledger rows go away. Singleton
        // records persist until explicitly replaced.
        self.store.delete(item.id).await?;
        return Ok(());
      }
    }
    Ok(())
  }

  /// Deliver one alert unless the ledger says it already went out.
  /// Returns whether the alert is (now) recorded as sent.
  async fn fire(
    &self,
    item: &ContentItem,
    region: Region,
    kind: AlertKind,
  ) -> Result<bool, S::Error> {
    if self.store.was_sent(item.id, region, kind).await? {
      return Ok(true);
    }

    let text = match kind {
      AlertKind::OneHourWarning => render::one_hour_warning(item, region),
      AlertKind::Expired => render::expired_alert(item, region),
    };

    match self.sink.deliver(&text).await {
      Ok(()) => {
        self.store.mark_sent(item.id, region, kind).await?;
        info!(
          content_id = item.id,
          region = region.key(),
          kind = kind.key(),
          "alert delivered"
        );
        Ok(true)
      }
      Err(e) => {
        // Not marked: the next tick retries while the window holds.
        warn!(
          error = %e,
          content_id = item.id,
          region = region.key(),
          kind = kind.key(),
          "alert delivery failed; will retry next tick"
        );
        Ok(false)
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
  };

  use chrono::Duration as ChronoDuration;
  use herald_core::content::{ExpirySet, NewContent};
  use herald_store_sqlite::SqliteStore;
  use thiserror::Error;

  use super::*;

  #[derive(Debug, Error)]
  #[error("sink down")]
  struct SinkDown;

  /// Records every delivery; optionally fails them all.
  #[derive(Default)]
  struct RecordingSink {
    sent: Mutex<Vec<String>>,
    fail: AtomicBool,
  }

  impl AlertSink for RecordingSink {
    type Error = SinkDown;

    async fn deliver(&self, text: &str) -> Result<(), SinkDown> {
      if self.fail.load(Ordering::SeqCst) {
        return Err(SinkDown);
      }
      self.sent.lock().unwrap().push(text.to_owned());
      Ok(())
    }
  }

  struct Fixture {
    store:   Arc<SqliteStore>,
    sink:    Arc<RecordingSink>,
    scanner: Scanner<SqliteStore, RecordingSink>,
    now:     DateTime<Utc>,
  }

  async fn fixture() -> Fixture {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let sink = Arc::new(RecordingSink::default());
    let scanner = Scanner::new(
      Arc::clone(&store),
      Arc::clone(&sink),
      Duration::from_secs(60),
    );
    let now = chrono::TimeZone::with_ymd_and_hms(&Utc, 2030, 1, 1, 12, 0, 0)
      .unwrap();
    Fixture { store, sink, scanner, now }
  }

  fn sent(sink: &RecordingSink) -> Vec<String> {
    sink.sent.lock().unwrap().clone()
  }

  async fn add_event(
    store: &SqliteStore,
    name: &str,
    end: DateTime<Utc>,
  ) -> i64 {
    let mut expires = ExpirySet::default();
    expires.set(Region::Europe, end);
    store
      .upsert(Section::Events, NewContent {
        name: Some(name.to_owned()),
        expires,
        ..NewContent::default()
      })
      .await
      .unwrap()
  }

  #[tokio::test]
  async fn one_hour_warning_fires_exactly_once() {
    let f = fixture().await;
    add_event(&f.store, "Lantern Rite", f.now + ChronoDuration::minutes(30))
      .await;

    f.scanner.tick(f.now).await.unwrap();
    let first = sent(&f.sink);
    assert_eq!(first.len(), 1);
    assert!(first[0].contains("One hour left"), "{first:?}");
    assert!(first[0].contains("Lantern Rite"), "{first:?}");

    // A second tick before expiry emits nothing new.
    f.scanner.tick(f.now + ChronoDuration::minutes(1)).await.unwrap();
    assert_eq!(sent(&f.sink).len(), 1);
  }

  #[tokio::test]
  async fn nothing_fires_outside_the_warning_window() {
    let f = fixture().await;
    add_event(&f.store, "Far off", f.now + ChronoDuration::hours(2)).await;

    f.scanner.tick(f.now).await.unwrap();
    assert!(sent(&f.sink).is_empty());
  }

  #[tokio::test]
  async fn expired_event_is_announced_once_and_removed() {
    let f = fixture().await;
    add_event(&f.store, "Over", f.now - ChronoDuration::seconds(1)).await;

    f.scanner.tick(f.now).await.unwrap();
    let first = sent(&f.sink);
    assert_eq!(first.len(), 1);
    assert!(first[0].contains("Now over"), "{first:?}");

    // Absent from listings, and a later tick stays quiet.
    assert!(f.store.list(Section::Events).await.unwrap().is_empty());
    f.scanner.tick(f.now + ChronoDuration::minutes(1)).await.unwrap();
    assert_eq!(sent(&f.sink).len(), 1);
  }

  #[tokio::test]
  async fn expired_singleton_is_announced_but_kept() {
    let f = fixture().await;
    f.store
      .upsert(Section::Banner, NewContent {
        title: Some("Version 5.0".into()),
        expires: ExpirySet {
          asia:    Some(f.now - ChronoDuration::hours(1)),
          europe:  Some(f.now + ChronoDuration::hours(6)),
          america: Some(f.now + ChronoDuration::hours(12)),
        },
        ..NewContent::default()
      })
      .await
      .unwrap();

    f.scanner.tick(f.now).await.unwrap();
    let first = sent(&f.sink);
    assert_eq!(first.len(), 1);
    assert!(first[0].contains("Asia"), "{first:?}");

    // Still queryable; no repeat on the next tick.
    assert!(f.store.get(Section::Banner).await.unwrap().is_some());
    f.scanner.tick(f.now + ChronoDuration::minutes(1)).await.unwrap();
    assert_eq!(sent(&f.sink).len(), 1);
  }

  #[tokio::test]
  async fn each_region_is_alerted_independently() {
    let f = fixture().await;
    f.store
      .upsert(Section::Tower, NewContent {
        title: Some("Floor 12".into()),
        expires: ExpirySet {
          asia:    Some(f.now + ChronoDuration::minutes(10)),
          europe:  Some(f.now + ChronoDuration::minutes(45)),
          america: Some(f.now + ChronoDuration::hours(7)),
        },
        ..NewContent::default()
      })
      .await
      .unwrap();

    f.scanner.tick(f.now).await.unwrap();
    let texts = sent(&f.sink);
    assert_eq!(texts.len(), 2, "{texts:?}");
    assert!(texts.iter().any(|t| t.contains("Asia")), "{texts:?}");
    assert!(texts.iter().any(|t| t.contains("Europe")), "{texts:?}");
  }

  #[tokio::test]
  async fn failed_delivery_is_not_marked_and_retries() {
    let f = fixture().await;
    let id =
      add_event(&f.store, "Flaky", f.now + ChronoDuration::minutes(30)).await;

    f.sink.fail.store(true, Ordering::SeqCst);
    f.scanner.tick(f.now).await.unwrap();
    assert!(sent(&f.sink).is_empty());
    assert!(
      !f.store
        .was_sent(id, Region::Europe, AlertKind::OneHourWarning)
        .await
        .unwrap()
    );

    // Transport recovers; the next tick delivers exactly once.
    f.sink.fail.store(false, Ordering::SeqCst);
    f.scanner.tick(f.now + ChronoDuration::minutes(1)).await.unwrap();
    f.scanner.tick(f.now + ChronoDuration::minutes(2)).await.unwrap();
    assert_eq!(sent(&f.sink).len(), 1);
  }

  #[tokio::test]
  async fn failed_expiry_delivery_keeps_the_event() {
    let f = fixture().await;
    add_event(&f.store, "Over", f.now - ChronoDuration::minutes(5)).await;

    f.sink.fail.store(true, Ordering::SeqCst);
    f.scanner.tick(f.now).await.unwrap();
    // Not announced, so not removed either.
    assert_eq!(f.store.list(Section::Events).await.unwrap().len(), 1);

    f.sink.fail.store(false, Ordering::SeqCst);
    f.scanner.tick(f.now).await.unwrap();
    assert_eq!(sent(&f.sink).len(), 1);
    assert!(f.store.list(Section::Events).await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn warning_then_expiry_across_ticks() {
    let f = fixture().await;
    add_event(&f.store, "Short", f.now + ChronoDuration::minutes(10)).await;

    f.scanner.tick(f.now).await.unwrap();
    f.scanner.tick(f.now + ChronoDuration::minutes(11)).await.unwrap();

    let texts = sent(&f.sink);
    assert_eq!(texts.len(), 2, "{texts:?}");
    assert!(texts[0].contains("One hour left"), "{texts:?}");
    assert!(texts[1].contains("Now over"), "{texts:?}");
  }
}
