//! HTTP record store speaking the PostgREST dialect used by hosted
//! Postgres backends (`/rest/v1/<table>?column=eq.value`).

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;
use url::Url;

use super::RecordStore;
use crate::error::StoreError;
use crate::model::{
  parse_timestamp, Channel, FeedbackRow, InsightId, InsightRecord, MentionRow, Sentiment, VoteType,
};

const INSIGHTS_VIEW: &str = "insights_details_view";
const FEEDBACK_TABLE: &str = "insight_feedback";
const CHANNELS_TABLE: &str = "channels";
const MENTIONS_VIEW: &str = "mentions_view";

/// Configuration for the REST store client
#[derive(Debug, Clone)]
pub struct RestStoreConfig {
  /// Base URL of the store (e.g., "https://project.supabase.co")
  pub base_url: String,
  /// Sent as both `apikey` and bearer token when present
  pub api_key: Option<String>,
  /// Request timeout in seconds
  pub timeout_secs: u64,
}

impl Default for RestStoreConfig {
  fn default() -> Self {
    Self { base_url: "http://localhost:54321".to_string(), api_key: None, timeout_secs: 30 }
  }
}

pub struct RestStore {
  client: Client,
  config: RestStoreConfig,
}

#[derive(Debug, Deserialize)]
struct InsightRow {
  insight_id: i64,
  video_title: String,
  video_publish_datetime: String,
  company_name: String,
  insight_sentiment: String,
  insight_text: String,
}

impl TryFrom<InsightRow> for InsightRecord {
  type Error = StoreError;

  fn try_from(row: InsightRow) -> Result<Self, Self::Error> {
    let published_at = parse_timestamp(&row.video_publish_datetime).ok_or_else(|| {
      StoreError::Decode(format!(
        "insight {} has unreadable publish time '{}'",
        row.insight_id, row.video_publish_datetime
      ))
    })?;
    Ok(InsightRecord {
      insight_id: InsightId(row.insight_id),
      episode_title: row.video_title,
      published_at,
      company_name: row.company_name,
      sentiment: Sentiment::from_raw(&row.insight_sentiment),
      text: row.insight_text,
    })
  }
}

#[derive(Debug, Deserialize)]
struct FeedbackWire {
  insight_id: i64,
  feedback_type: VoteType,
}

#[derive(Debug, Serialize)]
struct NewFeedback<'a> {
  insight_id: i64,
  user_id: &'a str,
  feedback_type: VoteType,
}

#[derive(Debug, Deserialize)]
struct MentionWire {
  company_name: String,
  sentiment: String,
  video_publish_date: String,
}

impl RestStore {
  pub fn new(config: RestStoreConfig) -> Result<Self, StoreError> {
    let client = Client::builder().timeout(Duration::from_secs(config.timeout_secs)).build()?;
    Ok(Self { client, config })
  }

  fn table_url(&self, table: &str) -> Result<Url, StoreError> {
    let mut url = Url::parse(&self.config.base_url)?;
    url
      .path_segments_mut()
      .map_err(|_| StoreError::InvalidRequest(format!("{} cannot be a base URL", self.config.base_url)))?
      .pop_if_empty()
      .extend(["rest", "v1", table]);
    Ok(url)
  }

  fn request(&self, method: Method, url: Url) -> RequestBuilder {
    let builder = self.client.request(method, url);
    match &self.config.api_key {
      Some(key) => builder.header("apikey", key).bearer_auth(key),
      None => builder,
    }
  }

  async fn send(&self, builder: RequestBuilder) -> Result<Response, StoreError> {
    let response = timeout(Duration::from_secs(self.config.timeout_secs), builder.send())
      .await
      .map_err(|_| StoreError::Transport("request timed out".to_string()))??;

    let status = response.status();
    if !status.is_success() {
      let message = response.text().await.unwrap_or_default();
      return Err(StoreError::Rejected { status: status.as_u16(), message });
    }
    Ok(response)
  }

  async fn get_rows<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>, StoreError> {
    debug!(%url, "Store read");
    let response = self.send(self.request(Method::GET, url)).await?;
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|err| StoreError::Decode(err.to_string()))
  }
}

fn timestamp_param(ts: &DateTime<Utc>) -> String {
  ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl RecordStore for RestStore {
  async fn fetch_insights(&self, channel: &str) -> Result<Vec<InsightRecord>, StoreError> {
    let mut url = self.table_url(INSIGHTS_VIEW)?;
    url
      .query_pairs_mut()
      .append_pair(
        "select",
        "video_title,video_publish_datetime,company_name,insight_sentiment,insight_text,insight_id",
      )
      .append_pair("channel_name", &format!("eq.{channel}"))
      .append_pair("order", "video_publish_datetime.desc");

    let rows: Vec<InsightRow> = self.get_rows(url).await?;
    rows.into_iter().map(InsightRecord::try_from).collect()
  }

  async fn fetch_feedback(&self, user_id: &str) -> Result<Vec<FeedbackRow>, StoreError> {
    let mut url = self.table_url(FEEDBACK_TABLE)?;
    url
      .query_pairs_mut()
      .append_pair("select", "insight_id,feedback_type")
      .append_pair("user_id", &format!("eq.{user_id}"));

    let rows: Vec<FeedbackWire> = self.get_rows(url).await?;
    Ok(
      rows
        .into_iter()
        .map(|row| FeedbackRow { insight_id: InsightId(row.insight_id), vote_type: row.feedback_type })
        .collect(),
    )
  }

  async fn insert_feedback(
    &self,
    insight_id: InsightId,
    user_id: &str,
    vote_type: VoteType,
  ) -> Result<(), StoreError> {
    let url = self.table_url(FEEDBACK_TABLE)?;
    let body = NewFeedback { insight_id: insight_id.0, user_id, feedback_type: vote_type };
    debug!(%insight_id, %vote_type, "Store insert");

    let builder =
      self.request(Method::POST, url).header("Prefer", "return=minimal").json(&body);
    self.send(builder).await?;
    Ok(())
  }

  async fn delete_feedback(&self, insight_id: InsightId, user_id: &str) -> Result<(), StoreError> {
    let mut url = self.table_url(FEEDBACK_TABLE)?;
    url
      .query_pairs_mut()
      .append_pair("insight_id", &format!("eq.{insight_id}"))
      .append_pair("user_id", &format!("eq.{user_id}"));
    debug!(%insight_id, "Store delete");

    self.send(self.request(Method::DELETE, url)).await?;
    Ok(())
  }

  async fn fetch_channel(&self, channel: &str) -> Result<Option<Channel>, StoreError> {
    let mut url = self.table_url(CHANNELS_TABLE)?;
    url
      .query_pairs_mut()
      .append_pair("select", "*")
      .append_pair("channel_name", &format!("eq.{channel}"))
      .append_pair("limit", "1");

    let channels: Vec<Channel> = self.get_rows(url).await?;
    Ok(channels.into_iter().next())
  }

  async fn fetch_mentions(
    &self,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
  ) -> Result<Vec<MentionRow>, StoreError> {
    let mut url = self.table_url(MENTIONS_VIEW)?;
    url
      .query_pairs_mut()
      .append_pair("select", "company_name,sentiment,video_publish_date")
      .append_pair("video_publish_date", &format!("gte.{}", timestamp_param(&since)))
      .append_pair("video_publish_date", &format!("lte.{}", timestamp_param(&until)));

    let rows: Vec<MentionWire> = self.get_rows(url).await?;
    rows
      .into_iter()
      .map(|row| {
        let published_at = parse_timestamp(&row.video_publish_date).ok_or_else(|| {
          StoreError::Decode(format!("unreadable mention date '{}'", row.video_publish_date))
        })?;
        Ok(MentionRow {
          company_name: row.company_name,
          sentiment: Sentiment::from_raw(&row.sentiment),
          published_at,
        })
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn store(base_url: &str) -> RestStore {
    RestStore::new(RestStoreConfig { base_url: base_url.to_string(), ..Default::default() }).unwrap()
  }

  #[test]
  fn test_table_url_appends_rest_prefix() {
    let url = store("https://example.supabase.co").table_url("channels").unwrap();
    assert_eq!(url.as_str(), "https://example.supabase.co/rest/v1/channels");

    let url = store("https://example.com/proxy/").table_url("channels").unwrap();
    assert_eq!(url.as_str(), "https://example.com/proxy/rest/v1/channels");
  }

  #[test]
  fn test_invalid_base_url_is_invalid_request() {
    let err = store("not a url").table_url("channels").unwrap_err();
    assert!(matches!(err, StoreError::InvalidRequest(_)));
  }

  #[test]
  fn test_insight_row_conversion() {
    let row: InsightRow = serde_json::from_str(
      r#"{
        "insight_id": 12,
        "video_title": "Ep 1",
        "video_publish_datetime": "2024-01-02T09:00:00+00:00",
        "company_name": "Acme",
        "insight_sentiment": "Positive",
        "insight_text": "Strong quarter"
      }"#,
    )
    .unwrap();

    let record = InsightRecord::try_from(row).unwrap();
    assert_eq!(record.insight_id, InsightId(12));
    assert_eq!(record.sentiment, Sentiment::Positive);
  }

  #[test]
  fn test_bad_timestamp_is_decode_error() {
    let row = InsightRow {
      insight_id: 1,
      video_title: String::new(),
      video_publish_datetime: "soon".to_string(),
      company_name: String::new(),
      insight_sentiment: String::new(),
      insight_text: String::new(),
    };
    assert!(matches!(InsightRecord::try_from(row), Err(StoreError::Decode(_))));
  }
}
