//! Company mention tallies and per-channel sentiment trends.

use chrono::{DateTime, Duration, Months, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::calendar::CalendarZone;
use crate::model::{InsightRecord, MentionRow, Sentiment};

pub const MAX_VISIBLE_TALLIES: usize = 12;
pub const MAX_TREND_MONTHS: usize = 6;
pub const MAX_TOP_COMPANIES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Timeframe {
  #[default]
  OneWeek,
  OneMonth,
  ThreeMonths,
}

impl Timeframe {
  /// `[since, until]` ending at `now`.
  pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let since = match self {
      Timeframe::OneWeek => now - Duration::days(7),
      Timeframe::OneMonth => now.checked_sub_months(Months::new(1)).unwrap_or(now - Duration::days(30)),
      Timeframe::ThreeMonths => {
        now.checked_sub_months(Months::new(3)).unwrap_or(now - Duration::days(90))
      }
    };
    (since, now)
  }
}

impl fmt::Display for Timeframe {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Timeframe::OneWeek => "1W",
      Timeframe::OneMonth => "1M",
      Timeframe::ThreeMonths => "3M",
    })
  }
}

impl FromStr for Timeframe {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_uppercase().as_str() {
      "1W" => Ok(Timeframe::OneWeek),
      "1M" => Ok(Timeframe::OneMonth),
      "3M" => Ok(Timeframe::ThreeMonths),
      other => Err(format!("Unknown timeframe '{other}' (expected 1W, 1M or 3M)")),
    }
  }
}

/// Which side of the tally is ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum MentionTab {
  #[default]
  Positive,
  Negative,
}

impl FromStr for MentionTab {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "positive" => Ok(MentionTab::Positive),
      "negative" => Ok(MentionTab::Negative),
      other => Err(format!("Unknown tab '{other}' (expected positive or negative)")),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyTally {
  pub company_name: String,
  pub positive: usize,
  pub negative: usize,
}

impl CompanyTally {
  pub fn count(&self, tab: MentionTab) -> usize {
    match tab {
      MentionTab::Positive => self.positive,
      MentionTab::Negative => self.negative,
    }
  }

  pub fn total(&self) -> usize {
    self.positive + self.negative
  }
}

/// Per-company positive/negative counts in first-seen order.
fn tally<'a, I>(mentions: I) -> Vec<CompanyTally>
where
  I: IntoIterator<Item = (&'a str, &'a Sentiment)>,
{
  let mut index: HashMap<&str, usize> = HashMap::new();
  let mut tallies: Vec<CompanyTally> = Vec::new();

  for (company, sentiment) in mentions {
    let slot = *index.entry(company).or_insert_with(|| {
      tallies.push(CompanyTally { company_name: company.to_string(), positive: 0, negative: 0 });
      tallies.len() - 1
    });
    match sentiment {
      Sentiment::Positive => tallies[slot].positive += 1,
      Sentiment::Negative => tallies[slot].negative += 1,
      Sentiment::Other(_) => {}
    }
  }

  tallies
}

/// Companies ranked by their count on `tab`, zero counts dropped, top 12.
pub fn mention_tallies(mentions: &[MentionRow], tab: MentionTab) -> Vec<CompanyTally> {
  let mut tallies: Vec<CompanyTally> = tally(
    mentions.iter().map(|m| (m.company_name.as_str(), &m.sentiment)),
  )
  .into_iter()
  .filter(|t| t.count(tab) > 0)
  .collect();

  tallies.sort_by(|a, b| b.count(tab).cmp(&a.count(tab)));
  tallies.truncate(MAX_VISIBLE_TALLIES);
  tallies
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
  pub label: String,
  pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompanyTrend {
  pub company_name: String,
  /// Newest month first.
  pub months: Vec<MonthlyCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopCompany {
  pub company_name: String,
  pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelTrends {
  pub bullish: Option<CompanyTrend>,
  pub bearish: Option<CompanyTrend>,
  pub top_companies: Vec<TopCompany>,
}

fn leader(tallies: &[CompanyTally], tab: MentionTab) -> Option<&CompanyTally> {
  tallies.iter().fold(None, |best: Option<&CompanyTally>, candidate| match best {
    Some(current) if current.count(tab) >= candidate.count(tab) => Some(current),
    _ if candidate.count(tab) > 0 => Some(candidate),
    _ => best,
  })
}

fn monthly_trend(
  records: &[InsightRecord],
  company: &str,
  sentiment: &Sentiment,
  zone: &CalendarZone,
) -> Vec<MonthlyCount> {
  let mut buckets: HashMap<(i32, u32), MonthlyCount> = HashMap::new();
  for record in records
    .iter()
    .filter(|r| r.company_name == company && &r.sentiment == sentiment)
  {
    buckets
      .entry(zone.year_month(&record.published_at))
      .or_insert_with(|| MonthlyCount { label: zone.month_label(&record.published_at), count: 0 })
      .count += 1;
  }

  let mut months: Vec<((i32, u32), MonthlyCount)> = buckets.into_iter().collect();
  months.sort_by(|a, b| b.0.cmp(&a.0));
  months.into_iter().take(MAX_TREND_MONTHS).map(|(_, count)| count).collect()
}

/// Most bullish and bearish companies with monthly counts, plus the most
/// mentioned companies overall. `None` when the channel has no insights.
pub fn channel_trends(records: &[InsightRecord], zone: &CalendarZone) -> Option<ChannelTrends> {
  if records.is_empty() {
    return None;
  }

  let tallies = tally(records.iter().map(|r| (r.company_name.as_str(), &r.sentiment)));

  let trend_for = |tab: MentionTab| {
    let sentiment = match tab {
      MentionTab::Positive => Sentiment::Positive,
      MentionTab::Negative => Sentiment::Negative,
    };
    leader(&tallies, tab).map(|t| CompanyTrend {
      company_name: t.company_name.clone(),
      months: monthly_trend(records, &t.company_name, &sentiment, zone),
    })
  };

  let mut top_companies: Vec<TopCompany> = tallies
    .iter()
    .map(|t| TopCompany { company_name: t.company_name.clone(), count: t.total() })
    .collect();
  top_companies.sort_by(|a, b| b.count.cmp(&a.count));
  top_companies.truncate(MAX_TOP_COMPANIES);

  Some(ChannelTrends {
    bullish: trend_for(MentionTab::Positive),
    bearish: trend_for(MentionTab::Negative),
    top_companies,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::InsightId;

  fn ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
  }

  fn mention(company: &str, sentiment: &str) -> MentionRow {
    MentionRow {
      company_name: company.to_string(),
      sentiment: Sentiment::from_raw(sentiment),
      published_at: ts("2024-01-01T00:00:00Z"),
    }
  }

  fn insight(id: i64, company: &str, sentiment: &str, published: &str) -> InsightRecord {
    InsightRecord {
      insight_id: InsightId(id),
      episode_title: "Ep".to_string(),
      published_at: ts(published),
      company_name: company.to_string(),
      sentiment: Sentiment::from_raw(sentiment),
      text: String::new(),
    }
  }

  #[test]
  fn test_timeframe_windows() {
    let now = ts("2024-03-31T12:00:00Z");
    assert_eq!(Timeframe::OneWeek.window(now).0, ts("2024-03-24T12:00:00Z"));
    assert_eq!(Timeframe::OneMonth.window(now).0, ts("2024-02-29T12:00:00Z"));
    assert_eq!(Timeframe::ThreeMonths.window(now).0, ts("2023-12-31T12:00:00Z"));
    assert_eq!("3m".parse::<Timeframe>().unwrap(), Timeframe::ThreeMonths);
  }

  #[test]
  fn test_tallies_rank_and_drop_zero_counts() {
    let mentions = vec![
      mention("Acme", "positive"),
      mention("Globex", "Positive"),
      mention("Globex", "positive"),
      mention("Initech", "negative"),
      mention("Acme", "neutral"),
    ];

    let positive = mention_tallies(&mentions, MentionTab::Positive);
    let names: Vec<&str> = positive.iter().map(|t| t.company_name.as_str()).collect();
    assert_eq!(names, vec!["Globex", "Acme"]);
    assert_eq!(positive[0].positive, 2);

    let negative = mention_tallies(&mentions, MentionTab::Negative);
    assert_eq!(negative.len(), 1);
    assert_eq!(negative[0].company_name, "Initech");
  }

  #[test]
  fn test_tallies_cap_at_visible_rows() {
    let mentions: Vec<MentionRow> =
      (0..20).map(|i| mention(&format!("Company{i}"), "negative")).collect();
    assert_eq!(mention_tallies(&mentions, MentionTab::Negative).len(), MAX_VISIBLE_TALLIES);
  }

  #[test]
  fn test_channel_trends() {
    let records = vec![
      insight(1, "Acme", "positive", "2024-01-05T00:00:00Z"),
      insight(2, "Acme", "positive", "2024-02-05T00:00:00Z"),
      insight(3, "Acme", "positive", "2024-02-06T00:00:00Z"),
      insight(4, "Globex", "negative", "2024-02-07T00:00:00Z"),
      insight(5, "Initech", "positive", "2024-02-08T00:00:00Z"),
      insight(6, "Umbrella", "neutral", "2024-02-09T00:00:00Z"),
    ];
    let trends = channel_trends(&records, &CalendarZone::utc()).unwrap();

    let bullish = trends.bullish.unwrap();
    assert_eq!(bullish.company_name, "Acme");
    assert_eq!(
      bullish.months,
      vec![
        MonthlyCount { label: "Feb 2024".to_string(), count: 2 },
        MonthlyCount { label: "Jan 2024".to_string(), count: 1 },
      ]
    );
    assert_eq!(trends.bearish.unwrap().company_name, "Globex");

    let top: Vec<(&str, usize)> =
      trends.top_companies.iter().map(|t| (t.company_name.as_str(), t.count)).collect();
    assert_eq!(top, vec![("Acme", 3), ("Globex", 1), ("Initech", 1)]);
  }

  #[test]
  fn test_tied_leaders_keep_first_seen_company() {
    let records = vec![
      insight(1, "Zeta", "positive", "2024-01-05T00:00:00Z"),
      insight(2, "Alpha", "positive", "2024-01-06T00:00:00Z"),
      insight(3, "Alpha", "negative", "2024-01-07T00:00:00Z"),
      insight(4, "Zeta", "negative", "2024-01-08T00:00:00Z"),
    ];
    let trends = channel_trends(&records, &CalendarZone::utc()).unwrap();

    assert_eq!(trends.bullish.unwrap().company_name, "Zeta");
    assert_eq!(trends.bearish.unwrap().company_name, "Zeta");
    let top: Vec<&str> = trends.top_companies.iter().map(|t| t.company_name.as_str()).collect();
    assert_eq!(top, vec!["Zeta", "Alpha"]);
  }

  #[test]
  fn test_trends_without_negatives_has_no_bearish() {
    let records = vec![insight(1, "Acme", "positive", "2024-01-05T00:00:00Z")];
    let trends = channel_trends(&records, &CalendarZone::utc()).unwrap();
    assert!(trends.bearish.is_none());
  }

  #[test]
  fn test_empty_channel_has_no_trends() {
    assert!(channel_trends(&[], &CalendarZone::utc()).is_none());
  }
}
