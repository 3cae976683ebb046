//! State container for one channel's insight table.
//!
//! Owns the fetched record set, the filter selections and the feedback
//! machine, and recomputes row descriptors on demand from all three.

use std::sync::{Arc, Mutex};
use tracing::{error, info};

use crate::calendar::CalendarZone;
use crate::config::Config;
use crate::error::{FeedbackError, PageError};
use crate::feedback::{FeedbackMachine, VoteState};
use crate::filter::{self, FilterColumn, FilterSelection};
use crate::grouping::{self, DEFAULT_ROW_LIMIT};
use crate::model::{Channel, InsightId, InsightRecord, VoteType};
use crate::projection::{self, RowDescriptor, DEFAULT_EXPAND_THRESHOLD};
use crate::store::RecordStore;

const VOTE_FAILED_NOTICE: &str = "Error submitting feedback. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStatus {
  Loading,
  Ready,
  /// Nothing is shown; the user may retry with [`InsightPage::load`].
  Failed { message: String },
}

/// Non-blocking, user-visible message about a failed action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
  pub insight_id: Option<InsightId>,
  pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageOptions {
  pub zone: CalendarZone,
  pub row_limit: usize,
  pub expand_threshold: usize,
}

impl Default for PageOptions {
  fn default() -> Self {
    Self {
      zone: CalendarZone::default(),
      row_limit: DEFAULT_ROW_LIMIT,
      expand_threshold: DEFAULT_EXPAND_THRESHOLD,
    }
  }
}

impl From<&Config> for PageOptions {
  fn from(config: &Config) -> Self {
    Self {
      zone: config.calendar_zone(),
      row_limit: config.display.row_limit,
      expand_threshold: config.display.expand_threshold,
    }
  }
}

pub struct InsightPage {
  store: Arc<dyn RecordStore>,
  channel_name: String,
  options: PageOptions,
  status: PageStatus,
  channel: Option<Channel>,
  records: Vec<InsightRecord>,
  selection: FilterSelection,
  feedback: FeedbackMachine,
  notices: Mutex<Vec<Notice>>,
}

impl InsightPage {
  pub fn new(
    store: Arc<dyn RecordStore>,
    channel_name: impl Into<String>,
    user_id: impl Into<String>,
    options: PageOptions,
  ) -> Self {
    let feedback = FeedbackMachine::new(Arc::clone(&store), user_id);
    Self {
      store,
      channel_name: channel_name.into(),
      options,
      status: PageStatus::Loading,
      channel: None,
      records: Vec::new(),
      selection: FilterSelection::new(),
      feedback,
      notices: Mutex::new(Vec::new()),
    }
  }

  /// Fetch channel metadata, insights and existing votes.
  ///
  /// Any failure leaves the page in [`PageStatus::Failed`] with no records.
  /// Calling again retries; the record set is replaced wholesale.
  pub async fn load(&mut self) -> Result<(), PageError> {
    self.status = PageStatus::Loading;

    let (channel, records, votes) = tokio::join!(
      self.store.fetch_channel(&self.channel_name),
      self.store.fetch_insights(&self.channel_name),
      self.feedback.load(),
    );

    let outcome = match (channel, records, votes) {
      (Ok(Some(channel)), Ok(records), Ok(_)) => Ok((channel, records)),
      (Ok(None), _, _) => Err(PageError::ChannelNotFound(self.channel_name.clone())),
      (Err(err), _, _) | (_, Err(err), _) | (_, _, Err(err)) => Err(PageError::Fetch(err)),
    };

    match outcome {
      Ok((channel, records)) => {
        info!(channel = %self.channel_name, count = records.len(), "Loaded channel insights");
        self.channel = Some(channel);
        self.records = records;
        self.status = PageStatus::Ready;
        Ok(())
      }
      Err(err) => {
        error!(channel = %self.channel_name, error = %err, "Failed to load channel page");
        self.channel = None;
        self.records.clear();
        self.status = PageStatus::Failed { message: err.to_string() };
        Err(err)
      }
    }
  }

  pub fn status(&self) -> &PageStatus {
    &self.status
  }

  pub fn channel(&self) -> Option<&Channel> {
    self.channel.as_ref()
  }

  pub fn records(&self) -> &[InsightRecord] {
    &self.records
  }

  pub fn selection(&self) -> &FilterSelection {
    &self.selection
  }

  pub fn set_filter_selection<I, S>(&mut self, column: FilterColumn, values: I)
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.selection.set(column, values);
  }

  pub fn toggle_filter_value(&mut self, column: FilterColumn, value: &str, checked: bool) {
    self.selection.toggle(column, value, checked);
  }

  pub fn clear_filter(&mut self, column: FilterColumn) {
    self.selection.clear(column);
  }

  /// Values offered for a column's filter, drawn from the loaded records.
  pub fn filter_options(&self, column: FilterColumn) -> Vec<String> {
    filter::filter_options(&self.records, column, &self.options.zone)
  }

  /// Current table rows. Empty unless the page is ready.
  pub fn rows(&self) -> Vec<RowDescriptor> {
    if self.status != PageStatus::Ready {
      return Vec::new();
    }
    let filtered = filter::apply(&self.records, &self.selection, &self.options.zone);
    let arrangement = grouping::arrange(filtered, &self.options.zone, self.options.row_limit);
    projection::project(&arrangement.groups, &self.feedback.snapshot(), self.options.expand_threshold)
  }

  /// Filtered records beyond the row limit, not shown.
  pub fn dropped_rows(&self) -> usize {
    let filtered = filter::apply(&self.records, &self.selection, &self.options.zone);
    filtered.len().saturating_sub(self.options.row_limit)
  }

  /// Cast a vote. Store failures are also queued as a [`Notice`].
  pub async fn vote(&self, insight_id: InsightId, vote: VoteType) -> Result<VoteState, FeedbackError> {
    let result = self.feedback.vote(insight_id, vote).await;
    if let Err(err) = &result {
      if !matches!(err, FeedbackError::Busy(_)) {
        self.push_notice(Notice {
          insight_id: Some(insight_id),
          message: VOTE_FAILED_NOTICE.to_string(),
        });
      }
    }
    result
  }

  /// Drain queued notices.
  pub fn take_notices(&self) -> Vec<Notice> {
    let mut notices = self.notices.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    std::mem::take(&mut *notices)
  }

  fn push_notice(&self, notice: Notice) {
    self.notices.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push(notice);
  }
}
