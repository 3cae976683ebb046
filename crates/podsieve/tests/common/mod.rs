#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use podsieve::error::StoreError;
use podsieve::model::{Channel, FeedbackRow, InsightId, InsightRecord, MentionRow, Sentiment, VoteType};
use podsieve::store::RecordStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::Notify;

pub const USER: &str = "anon_integration";

/// In-memory record store for testing.
///
/// Enforces one feedback row per `(insight, user)` pair like the real table,
/// and yields once per call so concurrent callers interleave.
#[derive(Default)]
pub struct FakeStore {
  state: Mutex<FakeState>,
}

#[derive(Default)]
pub struct FakeState {
  pub channels: HashMap<String, Channel>,
  pub insights: HashMap<String, Vec<InsightRecord>>,
  pub feedback: Vec<(InsightId, String, VoteType)>,
  pub mentions: Vec<MentionRow>,
  pub fail_reads: bool,
  pub fail_inserts: bool,
  pub fail_deletes: bool,
  /// Deletes wait for a notification when set.
  pub delete_gate: Option<Arc<Notify>>,
  pub calls: Vec<String>,
}

impl FakeStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_channel(name: &str, records: Vec<InsightRecord>) -> Self {
    let store = Self::new();
    {
      let mut state = store.state();
      state.channels.insert(name.to_string(), channel(name));
      state.insights.insert(name.to_string(), records);
    }
    store
  }

  pub fn state(&self) -> MutexGuard<'_, FakeState> {
    self.state.lock().unwrap()
  }

  pub fn votes_for(&self, insight_id: InsightId, user_id: &str) -> Vec<VoteType> {
    self
      .state()
      .feedback
      .iter()
      .filter(|(id, user, _)| *id == insight_id && user == user_id)
      .map(|(_, _, vote)| *vote)
      .collect()
  }

  pub fn calls(&self) -> Vec<String> {
    self.state().calls.clone()
  }

  fn unavailable() -> StoreError {
    StoreError::Transport("connection refused".to_string())
  }
}

#[async_trait]
impl RecordStore for FakeStore {
  async fn fetch_insights(&self, channel: &str) -> Result<Vec<InsightRecord>, StoreError> {
    tokio::task::yield_now().await;
    let mut state = self.state();
    state.calls.push(format!("fetch_insights {channel}"));
    if state.fail_reads {
      return Err(Self::unavailable());
    }
    Ok(state.insights.get(channel).cloned().unwrap_or_default())
  }

  async fn fetch_feedback(&self, user_id: &str) -> Result<Vec<FeedbackRow>, StoreError> {
    tokio::task::yield_now().await;
    let mut state = self.state();
    state.calls.push(format!("fetch_feedback {user_id}"));
    if state.fail_reads {
      return Err(Self::unavailable());
    }
    Ok(
      state
        .feedback
        .iter()
        .filter(|(_, user, _)| user == user_id)
        .map(|(insight_id, _, vote_type)| FeedbackRow { insight_id: *insight_id, vote_type: *vote_type })
        .collect(),
    )
  }

  async fn insert_feedback(
    &self,
    insight_id: InsightId,
    user_id: &str,
    vote_type: VoteType,
  ) -> Result<(), StoreError> {
    tokio::task::yield_now().await;
    let mut state = self.state();
    state.calls.push(format!("insert {insight_id} {vote_type}"));
    if state.fail_inserts {
      return Err(Self::unavailable());
    }
    if state.feedback.iter().any(|(id, user, _)| *id == insight_id && user == user_id) {
      return Err(StoreError::Rejected {
        status: 409,
        message: "duplicate key value violates unique constraint".to_string(),
      });
    }
    state.feedback.push((insight_id, user_id.to_string(), vote_type));
    Ok(())
  }

  async fn delete_feedback(&self, insight_id: InsightId, user_id: &str) -> Result<(), StoreError> {
    tokio::task::yield_now().await;
    let gate = self.state().delete_gate.clone();
    if let Some(gate) = gate {
      gate.notified().await;
    }
    let mut state = self.state();
    state.calls.push(format!("delete {insight_id}"));
    if state.fail_deletes {
      return Err(Self::unavailable());
    }
    state.feedback.retain(|(id, user, _)| !(*id == insight_id && user == user_id));
    Ok(())
  }

  async fn fetch_channel(&self, channel: &str) -> Result<Option<Channel>, StoreError> {
    tokio::task::yield_now().await;
    let mut state = self.state();
    state.calls.push(format!("fetch_channel {channel}"));
    if state.fail_reads {
      return Err(Self::unavailable());
    }
    Ok(state.channels.get(channel).cloned())
  }

  async fn fetch_mentions(
    &self,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
  ) -> Result<Vec<MentionRow>, StoreError> {
    tokio::task::yield_now().await;
    let state = self.state();
    if state.fail_reads {
      return Err(Self::unavailable());
    }
    Ok(
      state
        .mentions
        .iter()
        .filter(|m| m.published_at >= since && m.published_at <= until)
        .cloned()
        .collect(),
    )
  }
}

pub fn ts(raw: &str) -> DateTime<Utc> {
  DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
}

pub fn channel(name: &str) -> Channel {
  Channel {
    channel_id: format!("{name}-id"),
    channel_name: name.to_string(),
    channel_description: Some(format!("Insights from {name}")),
    channel_url: None,
    channel_background_url: None,
    host: None,
  }
}

pub fn record(
  id: i64,
  episode: &str,
  published: &str,
  company: &str,
  sentiment: &str,
  text: &str,
) -> InsightRecord {
  InsightRecord {
    insight_id: InsightId(id),
    episode_title: episode.to_string(),
    published_at: ts(published),
    company_name: company.to_string(),
    sentiment: Sentiment::from_raw(sentiment),
    text: text.to_string(),
  }
}
