use thiserror::Error;

use crate::model::InsightId;

/// Failures reported by a [`crate::store::RecordStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
  #[error("Store rejected the request ({status}): {message}")]
  Rejected { status: u16, message: String },

  #[error("Store unreachable: {0}")]
  Transport(String),

  #[error("Failed to decode store response: {0}")]
  Decode(String),

  #[error("Invalid store request: {0}")]
  InvalidRequest(String),
}

impl StoreError {
  /// True when the store answered and refused, as opposed to never answering.
  pub fn is_rejection(&self) -> bool {
    matches!(self, StoreError::Rejected { .. })
  }
}

impl From<reqwest::Error> for StoreError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_decode() {
      StoreError::Decode(err.to_string())
    } else {
      StoreError::Transport(err.to_string())
    }
  }
}

impl From<url::ParseError> for StoreError {
  fn from(err: url::ParseError) -> Self {
    StoreError::InvalidRequest(err.to_string())
  }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedbackError {
  #[error("A vote for insight {0} is already in flight")]
  Busy(InsightId),

  #[error("Vote for insight {insight_id} failed: {source}")]
  Store {
    insight_id: InsightId,
    #[source]
    source: StoreError,
  },

  #[error("Vote for insight {insight_id} was removed but the replacement failed: {source}")]
  SwitchInterrupted {
    insight_id: InsightId,
    #[source]
    source: StoreError,
  },
}

impl FeedbackError {
  pub fn insight_id(&self) -> InsightId {
    match self {
      FeedbackError::Busy(id) => *id,
      FeedbackError::Store { insight_id, .. } => *insight_id,
      FeedbackError::SwitchInterrupted { insight_id, .. } => *insight_id,
    }
  }
}

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Failed to read config file: {0}")]
  Io(#[from] std::io::Error),

  #[error("Failed to parse config file: {0}")]
  Parse(#[from] serde_json::Error),

  #[error("Invalid configuration: {0}")]
  Invalid(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PageError {
  #[error("Channel not found: {0}")]
  ChannelNotFound(String),

  #[error("Failed to load insights data: {0}")]
  Fetch(#[from] StoreError),
}
