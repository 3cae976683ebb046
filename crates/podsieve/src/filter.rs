//! Filter engine: per-column accepted-value sets combined with AND.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::calendar::CalendarZone;
use crate::model::InsightRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterColumn {
  /// Publish date, compared as a calendar date string.
  PublishDate,
  Company,
  Sentiment,
}

impl FilterColumn {
  pub const ALL: [FilterColumn; 3] =
    [FilterColumn::PublishDate, FilterColumn::Company, FilterColumn::Sentiment];

  pub fn title(&self) -> &'static str {
    match self {
      FilterColumn::PublishDate => "Publish Date",
      FilterColumn::Company => "Company",
      FilterColumn::Sentiment => "Sentiment",
    }
  }

  /// The value this column exposes for a record.
  pub fn value_of<'a>(&self, record: &'a InsightRecord, zone: &CalendarZone) -> Cow<'a, str> {
    match self {
      FilterColumn::PublishDate => Cow::Owned(zone.date_string(&record.published_at)),
      FilterColumn::Company => Cow::Borrowed(record.company_name.as_str()),
      FilterColumn::Sentiment => Cow::Borrowed(record.sentiment.as_str()),
    }
  }
}

impl fmt::Display for FilterColumn {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.title())
  }
}

impl FromStr for FilterColumn {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().replace(['_', '-', ' '], "").as_str() {
      "publishdate" | "date" => Ok(FilterColumn::PublishDate),
      "company" => Ok(FilterColumn::Company),
      "sentiment" => Ok(FilterColumn::Sentiment),
      other => Err(format!("Unknown filter column '{other}'")),
    }
  }
}

/// Accepted values for each filterable column. An empty set accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
  publish_dates: BTreeSet<String>,
  companies: BTreeSet<String>,
  sentiments: BTreeSet<String>,
}

impl FilterSelection {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, column: FilterColumn) -> &BTreeSet<String> {
    match column {
      FilterColumn::PublishDate => &self.publish_dates,
      FilterColumn::Company => &self.companies,
      FilterColumn::Sentiment => &self.sentiments,
    }
  }

  fn get_mut(&mut self, column: FilterColumn) -> &mut BTreeSet<String> {
    match column {
      FilterColumn::PublishDate => &mut self.publish_dates,
      FilterColumn::Company => &mut self.companies,
      FilterColumn::Sentiment => &mut self.sentiments,
    }
  }

  /// Replace one column's accepted values; other columns are untouched.
  pub fn set<I, S>(&mut self, column: FilterColumn, values: I)
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    *self.get_mut(column) = values.into_iter().map(Into::into).collect();
  }

  /// Add or remove a single value, the way a checkbox does.
  pub fn toggle(&mut self, column: FilterColumn, value: &str, checked: bool) {
    let set = self.get_mut(column);
    if checked {
      set.insert(value.to_string());
    } else {
      set.remove(value);
    }
  }

  pub fn clear(&mut self, column: FilterColumn) {
    self.get_mut(column).clear();
  }

  pub fn is_unrestricted(&self) -> bool {
    FilterColumn::ALL.iter().all(|column| self.get(*column).is_empty())
  }

  pub fn matches(&self, record: &InsightRecord, zone: &CalendarZone) -> bool {
    FilterColumn::ALL.iter().all(|column| {
      let accepted = self.get(*column);
      accepted.is_empty() || accepted.contains(&*column.value_of(record, zone))
    })
  }
}

/// Records passing every column's selection, in input order.
pub fn apply<'a>(
  records: &'a [InsightRecord],
  selection: &FilterSelection,
  zone: &CalendarZone,
) -> Vec<&'a InsightRecord> {
  records.iter().filter(|record| selection.matches(record, zone)).collect()
}

/// Distinct values a column takes across the record set, in first-seen order.
pub fn filter_options(
  records: &[InsightRecord],
  column: FilterColumn,
  zone: &CalendarZone,
) -> Vec<String> {
  let mut seen = HashSet::new();
  let mut options = Vec::new();
  for record in records {
    let value = column.value_of(record, zone).into_owned();
    if seen.insert(value.clone()) {
      options.push(value);
    }
  }
  options
}
