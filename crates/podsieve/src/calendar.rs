//! Calendar formatting for timestamps.
//!
//! Filter values and group keys compare publish dates as calendar date
//! strings in a display zone, never as raw timestamps. Two insights
//! published minutes apart on the same local day share a key; the same
//! two insights can land on different days in another zone.

use chrono::{DateTime, Datelike, FixedOffset, Local, Offset, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalendarZone {
  /// The host's local time zone, including daylight-saving transitions.
  #[default]
  Local,
  Fixed(FixedOffset),
}

impl CalendarZone {
  pub fn utc() -> Self {
    CalendarZone::Fixed(Utc.fix())
  }

  /// Zone from an offset in minutes east of UTC. `None` when out of range.
  pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
    FixedOffset::east_opt(minutes.checked_mul(60)?).map(CalendarZone::Fixed)
  }

  /// Calendar date as `M/D/YYYY`, e.g. `1/2/2024`.
  pub fn date_string(&self, ts: &DateTime<Utc>) -> String {
    let (year, month, day) = self.ymd(ts);
    format!("{month}/{day}/{year}")
  }

  /// Month bucket label, e.g. `Jan 2024`.
  pub fn month_label(&self, ts: &DateTime<Utc>) -> String {
    match self {
      CalendarZone::Local => ts.with_timezone(&Local).format("%b %Y").to_string(),
      CalendarZone::Fixed(offset) => ts.with_timezone(offset).format("%b %Y").to_string(),
    }
  }

  /// `(year, month)` of the timestamp in this zone, sortable.
  pub fn year_month(&self, ts: &DateTime<Utc>) -> (i32, u32) {
    let (year, month, _) = self.ymd(ts);
    (year, month)
  }

  fn ymd(&self, ts: &DateTime<Utc>) -> (i32, u32, u32) {
    match self {
      CalendarZone::Local => {
        let local = ts.with_timezone(&Local);
        (local.year(), local.month(), local.day())
      }
      CalendarZone::Fixed(offset) => {
        let fixed = ts.with_timezone(offset);
        (fixed.year(), fixed.month(), fixed.day())
      }
    }
  }
}
