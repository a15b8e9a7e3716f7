//! Wall-clock parsing and remaining-time math.
//!
//! Inputs are local wall-clock strings interpreted under a region's fixed
//! UTC offset; everything downstream of this module works in UTC only.
//! Offsets are constant per region — there is no daylight-saving logic.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};

use crate::{Error, Result};

/// The only accepted wall-clock shape.
pub const WALL_CLOCK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse `text` as a local wall-clock time `offset_hours` ahead of UTC and
/// return the UTC instant it denotes.
///
/// The input must match [`WALL_CLOCK_FORMAT`] exactly — wrong separators,
/// impossible calendar dates, and trailing garbage are all rejected. There
/// is never a partial result.
pub fn parse_local(text: &str, offset_hours: i32) -> Result<DateTime<Utc>> {
  let naive = NaiveDateTime::parse_from_str(text, WALL_CLOCK_FORMAT)
    .map_err(|_| Error::InvalidWallClock(text.to_owned()))?;
  let offset = FixedOffset::east_opt(offset_hours * 3600)
    .ok_or(Error::OffsetOutOfRange(offset_hours))?;
  let local = naive
    .and_local_timezone(offset)
    .single()
    .ok_or_else(|| Error::InvalidWallClock(text.to_owned()))?;
  Ok(local.with_timezone(&Utc))
}

/// Remaining time until an expiry instant, floored to whole units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeLeft {
  Expired,
  Remaining {
    days:    i64,
    hours:   i64,
    minutes: i64,
    seconds: i64,
  },
}

impl TimeLeft {
  pub fn is_expired(self) -> bool {
    matches!(self, TimeLeft::Expired)
  }
}

/// Classify the time remaining from `now` until `end`.
///
/// `end <= now` is the expired sentinel. Otherwise the whole seconds
/// remaining are decomposed by successive floor division (86400, 3600, 60);
/// any sub-second part is discarded.
pub fn time_left(end: DateTime<Utc>, now: DateTime<Utc>) -> TimeLeft {
  if end <= now {
    return TimeLeft::Expired;
  }
  let total = (end - now).num_seconds();
  TimeLeft::Remaining {
    days:    total / 86_400,
    hours:   total % 86_400 / 3_600,
    minutes: total % 3_600 / 60,
    seconds: total % 60,
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;

  fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
  }

  // ── parse_local ─────────────────────────────────────────────────────────

  #[test]
  fn asia_wall_clock_converts_to_utc() {
    // +8 hours: 10:00 local is 02:00 UTC.
    let parsed = parse_local("2030-01-01 10:00:00", 8).unwrap();
    assert_eq!(parsed, utc(2030, 1, 1, 2, 0, 0));
  }

  #[test]
  fn negative_offset_converts_forward() {
    let parsed = parse_local("2030-01-01 10:00:00", -5).unwrap();
    assert_eq!(parsed, utc(2030, 1, 1, 15, 0, 0));
  }

  #[test]
  fn zero_offset_is_identity() {
    let parsed = parse_local("2030-06-15 23:59:59", 0).unwrap();
    assert_eq!(parsed, utc(2030, 6, 15, 23, 59, 59));
  }

  #[test]
  fn round_trip_preserves_local_fields() {
    for offset in [-5, 0, 1, 8] {
      let parsed = parse_local("2031-03-09 04:30:00", offset).unwrap();
      let local =
        parsed.with_timezone(&FixedOffset::east_opt(offset * 3600).unwrap());
      assert_eq!(
        local.format(WALL_CLOCK_FORMAT).to_string(),
        "2031-03-09 04:30:00"
      );
    }
  }

  #[test]
  fn malformed_inputs_are_rejected() {
    let bad = [
      "",
      "2030-01-01",
      "2030-01-01 10:00",
      "2030/01/01 10:00:00",
      "2030-01-01T10:00:00",
      "2030-01-01 10:00:00 ",
      "2030-01-01 10:00:00 UTC",
      "2030-02-30 10:00:00",
      "2030-01-01 25:00:00",
      "not a time",
    ];
    for text in bad {
      assert!(
        matches!(parse_local(text, 0), Err(Error::InvalidWallClock(_))),
        "accepted {text:?}"
      );
    }
  }

  #[test]
  fn absurd_offset_is_rejected() {
    assert!(matches!(
      parse_local("2030-01-01 10:00:00", 999),
      Err(Error::OffsetOutOfRange(999))
    ));
  }

  // ── time_left ───────────────────────────────────────────────────────────

  #[test]
  fn decomposes_by_floor_division() {
    let now = utc(2030, 1, 1, 0, 0, 0);
    let end = now + Duration::seconds(86_400 + 3_600 + 60 + 1);
    assert_eq!(
      time_left(end, now),
      TimeLeft::Remaining { days: 1, hours: 1, minutes: 1, seconds: 1 }
    );
  }

  #[test]
  fn sub_day_remainder() {
    let now = utc(2030, 1, 1, 0, 0, 0);
    let end = now + Duration::seconds(2 * 3_600 + 35 * 60 + 59);
    assert_eq!(
      time_left(end, now),
      TimeLeft::Remaining { days: 0, hours: 2, minutes: 35, seconds: 59 }
    );
  }

  #[test]
  fn expired_at_and_after_the_instant() {
    let end = utc(2030, 1, 1, 0, 0, 0);
    assert_eq!(time_left(end, end), TimeLeft::Expired);
    assert_eq!(time_left(end, end + Duration::seconds(1)), TimeLeft::Expired);
    assert_eq!(time_left(end, end + Duration::days(400)), TimeLeft::Expired);
  }

  #[test]
  fn non_increasing_as_now_advances() {
    let end = utc(2030, 1, 2, 0, 0, 0);
    let mut now = utc(2030, 1, 1, 0, 0, 0);
    let mut last = (end - now).num_seconds();
    while now < end + Duration::hours(1) {
      let total = match time_left(end, now) {
        TimeLeft::Expired => 0,
        TimeLeft::Remaining { days, hours, minutes, seconds } => {
          days * 86_400 + hours * 3_600 + minutes * 60 + seconds
        }
      };
      assert!(total <= last, "remaining grew at now={now}");
      last = total;
      now += Duration::minutes(17);
    }
  }
}
