//! Row descriptors for the episode insight table.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::feedback::{FeedbackSnapshot, VoteState};
use crate::grouping::DisplayGroup;
use crate::model::{InsightId, Sentiment};

/// Text longer than this (in characters) is collapsed behind "see more".
pub const DEFAULT_EXPAND_THRESHOLD: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SentimentBadge {
  Positive,
  Negative,
  Other,
}

impl From<&Sentiment> for SentimentBadge {
  fn from(sentiment: &Sentiment) -> Self {
    match sentiment {
      Sentiment::Positive => SentimentBadge::Positive,
      Sentiment::Negative => SentimentBadge::Negative,
      Sentiment::Other(_) => SentimentBadge::Other,
    }
  }
}

/// Merged header cell carried by the first row of each group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupHeader {
  pub episode_title: String,
  pub date: String,
  pub span: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowDescriptor {
  /// Present only on the first row of a group.
  pub header: Option<GroupHeader>,
  /// Zero-based ordinal of the row's group.
  pub group_index: usize,
  /// Odd groups, for zebra striping.
  pub alternate: bool,
  pub insight_id: InsightId,
  pub episode_title: String,
  pub published_at: DateTime<Utc>,
  pub company_name: String,
  pub sentiment: String,
  pub sentiment_label: String,
  pub badge: SentimentBadge,
  pub text: String,
  pub expandable: bool,
  pub vote: VoteState,
  pub busy: bool,
}

/// Map groups and vote state to one descriptor per member record.
pub fn project(
  groups: &[DisplayGroup<'_>],
  feedback: &FeedbackSnapshot,
  expand_threshold: usize,
) -> Vec<RowDescriptor> {
  let mut rows = Vec::with_capacity(groups.iter().map(DisplayGroup::span).sum());

  for (group_index, group) in groups.iter().enumerate() {
    for (position, record) in group.members.iter().enumerate() {
      let header = (position == 0).then(|| GroupHeader {
        episode_title: group.episode_title.to_string(),
        date: group.date.clone(),
        span: group.span(),
      });

      rows.push(RowDescriptor {
        header,
        group_index,
        alternate: group_index % 2 == 1,
        insight_id: record.insight_id,
        episode_title: record.episode_title.clone(),
        published_at: record.published_at,
        company_name: record.company_name.clone(),
        sentiment: record.sentiment.as_str().to_string(),
        sentiment_label: record.sentiment.label(),
        badge: SentimentBadge::from(&record.sentiment),
        text: record.text.clone(),
        expandable: record.text.chars().count() > expand_threshold,
        vote: feedback.state(record.insight_id),
        busy: feedback.is_busy(record.insight_id),
      });
    }
  }

  rows
}
