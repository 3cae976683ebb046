//! Ordering and grouping of filtered insights for the episode table.
//!
//! Records are sorted newest first, capped to the display ceiling, then
//! walked once: a new group opens whenever `(episode title, calendar date)`
//! differs from the previous record's. A key that reappears later in the
//! sequence opens a fresh group rather than merging with the earlier one.

use serde::Serialize;

use crate::calendar::CalendarZone;
use crate::model::InsightRecord;

/// Display ceiling applied after sorting and before grouping.
pub const DEFAULT_ROW_LIMIT: usize = 100;

/// A maximal run of consecutive records sharing title and calendar date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayGroup<'a> {
  pub episode_title: &'a str,
  pub date: String,
  pub members: Vec<&'a InsightRecord>,
}

impl DisplayGroup<'_> {
  /// Number of rows the group's header cell spans.
  pub fn span(&self) -> usize {
    self.members.len()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Arrangement<'a> {
  pub groups: Vec<DisplayGroup<'a>>,
  /// Records that passed the filters but fell beyond the row limit.
  pub dropped: usize,
}

impl Arrangement<'_> {
  pub fn row_count(&self) -> usize {
    self.groups.iter().map(DisplayGroup::span).sum()
  }
}

/// Newest first; equal timestamps fall back to ascending insight id.
pub fn sort_newest_first(records: &mut [&InsightRecord]) {
  records.sort_by(|a, b| {
    b.published_at.cmp(&a.published_at).then_with(|| a.insight_id.cmp(&b.insight_id))
  });
}

/// Collapse an already-ordered sequence into display groups in one pass.
pub fn group_runs<'a>(records: &[&'a InsightRecord], zone: &CalendarZone) -> Vec<DisplayGroup<'a>> {
  let mut groups: Vec<DisplayGroup<'a>> = Vec::new();

  for &record in records {
    let date = zone.date_string(&record.published_at);
    match groups.last_mut() {
      Some(current) if current.episode_title == record.episode_title && current.date == date => {
        current.members.push(record);
      }
      _ => groups.push(DisplayGroup {
        episode_title: record.episode_title.as_str(),
        date,
        members: vec![record],
      }),
    }
  }

  groups
}

/// Sort, cap to `limit`, and group the filter output.
pub fn arrange<'a>(
  mut filtered: Vec<&'a InsightRecord>,
  zone: &CalendarZone,
  limit: usize,
) -> Arrangement<'a> {
  sort_newest_first(&mut filtered);

  let dropped = filtered.len().saturating_sub(limit);
  if dropped > 0 {
    tracing::debug!(limit, dropped, "Row limit reached, dropping oldest insights");
    filtered.truncate(limit);
  }

  Arrangement { groups: group_runs(&filtered, zone), dropped }
}
