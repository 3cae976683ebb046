//! Domain records shared by every stage of the insight pipeline.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable identifier of an insight row in the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InsightId(pub i64);

impl fmt::Display for InsightId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl FromStr for InsightId {
  type Err = std::num::ParseIntError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    s.trim().parse().map(InsightId)
  }
}

/// Sentiment attached to an insight.
///
/// Anything other than positive or negative is kept verbatim so filter
/// values still match what the store returned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Sentiment {
  Positive,
  Negative,
  Other(String),
}

impl Sentiment {
  pub fn from_raw(raw: &str) -> Self {
    match raw.trim().to_lowercase().as_str() {
      "positive" => Sentiment::Positive,
      "negative" => Sentiment::Negative,
      _ => Sentiment::Other(raw.to_string()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      Sentiment::Positive => "positive",
      Sentiment::Negative => "negative",
      Sentiment::Other(raw) => raw,
    }
  }

  /// Display label: first character upper-cased, the rest lower-cased.
  pub fn label(&self) -> String {
    let mut chars = self.as_str().chars();
    match chars.next() {
      Some(first) => {
        let rest = chars.as_str().to_lowercase();
        let mut label: String = first.to_uppercase().collect();
        label.push_str(&rest);
        label
      }
      None => String::new(),
    }
  }
}

impl fmt::Display for Sentiment {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl Serialize for Sentiment {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.as_str())
  }
}

impl<'de> Deserialize<'de> for Sentiment {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(Sentiment::from_raw(&raw))
  }
}

/// One insight as fetched for a channel. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRecord {
  pub insight_id: InsightId,
  pub episode_title: String,
  pub published_at: DateTime<Utc>,
  pub company_name: String,
  pub sentiment: Sentiment,
  pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
  Up,
  Down,
}

impl VoteType {
  pub fn as_str(&self) -> &'static str {
    match self {
      VoteType::Up => "up",
      VoteType::Down => "down",
    }
  }
}

impl fmt::Display for VoteType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for VoteType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "up" | "helpful" => Ok(VoteType::Up),
      "down" | "unhelpful" => Ok(VoteType::Down),
      other => Err(format!("Unknown vote type '{other}' (expected up or down)")),
    }
  }
}

/// An existing vote for the current anonymous identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRow {
  pub insight_id: InsightId,
  pub vote_type: VoteType,
}

/// Channel metadata shown above the insight table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
  #[serde(deserialize_with = "string_or_number")]
  pub channel_id: String,
  pub channel_name: String,
  #[serde(default)]
  pub channel_description: Option<String>,
  #[serde(default)]
  pub channel_url: Option<String>,
  #[serde(default)]
  pub channel_background_url: Option<String>,
  #[serde(default)]
  pub host: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  match serde_json::Value::deserialize(deserializer)? {
    serde_json::Value::String(s) => Ok(s),
    serde_json::Value::Number(n) => Ok(n.to_string()),
    other => Err(serde::de::Error::custom(format!("expected string or number id, got {other}"))),
  }
}

/// A single company mention used for cross-channel tallies.
#[derive(Debug, Clone, PartialEq)]
pub struct MentionRow {
  pub company_name: String,
  pub sentiment: Sentiment,
  pub published_at: DateTime<Utc>,
}

/// Parse a store timestamp.
///
/// Accepts RFC 3339, a bare `YYYY-MM-DDTHH:MM:SS[.f]` (taken as UTC) and a
/// plain `YYYY-MM-DD` date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
  let raw = raw.trim();
  if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
    return Some(ts.with_timezone(&Utc));
  }
  for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
      return Some(naive.and_utc());
    }
  }
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .ok()
    .and_then(|date| date.and_hms_opt(0, 0, 0))
    .map(|naive| naive.and_utc())
}
