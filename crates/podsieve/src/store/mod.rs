//! Record store seam.
//!
//! The pipeline never persists anything itself. It issues reads and writes
//! through [`RecordStore`] and interprets the results.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::model::{Channel, FeedbackRow, InsightId, InsightRecord, MentionRow, VoteType};

pub mod rest;

pub use rest::{RestStore, RestStoreConfig};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
  /// Insight rows for a channel. Ordering is not relied upon.
  async fn fetch_insights(&self, channel: &str) -> Result<Vec<InsightRecord>, StoreError>;

  /// Every vote previously cast by `user_id`.
  async fn fetch_feedback(&self, user_id: &str) -> Result<Vec<FeedbackRow>, StoreError>;

  /// Insert one vote row. Fails with [`StoreError::Rejected`] on constraint violations.
  async fn insert_feedback(
    &self,
    insight_id: InsightId,
    user_id: &str,
    vote_type: VoteType,
  ) -> Result<(), StoreError>;

  /// Delete the vote rows matching the pair. Succeeds when nothing matched.
  async fn delete_feedback(&self, insight_id: InsightId, user_id: &str) -> Result<(), StoreError>;

  /// Channel metadata, `None` when no channel has that name.
  async fn fetch_channel(&self, channel: &str) -> Result<Option<Channel>, StoreError>;

  /// Company mentions across all channels published within `[since, until]`.
  async fn fetch_mentions(
    &self,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
  ) -> Result<Vec<MentionRow>, StoreError>;
}
