use anyhow::{Context as _, Result};
use chrono::Utc;
use colored::*;
use std::sync::Arc;
use tracing::debug;

use crate::analytics::{self, MentionTab, Timeframe};
use crate::cli::display;
use crate::config::Config;
use crate::error::FeedbackError;
use crate::feedback::VoteState;
use crate::filter::FilterColumn;
use crate::identity::AnonymousIdentity;
use crate::model::{InsightId, VoteType};
use crate::page::{InsightPage, PageOptions};
use crate::store::{RecordStore, RestStore};

/// Everything a command needs: settings, the store and who is voting.
pub struct Session {
  pub config: Config,
  pub store: Arc<dyn RecordStore>,
  pub identity: AnonymousIdentity,
}

impl Session {
  pub fn from_config(config: Config) -> Result<Self> {
    let store = RestStore::new(config.rest_store_config()).context("Failed to build store client")?;
    let identity = match &config.identity_path {
      Some(path) => AnonymousIdentity::at(path),
      None => AnonymousIdentity::new(),
    };
    Ok(Self { config, store: Arc::new(store), identity })
  }

  pub fn with_store(config: Config, store: Arc<dyn RecordStore>, identity: AnonymousIdentity) -> Self {
    Self { config, store, identity }
  }

  async fn open_page(&self, channel: &str) -> Result<InsightPage> {
    let user_id = self.identity.get_or_create();
    let mut page =
      InsightPage::new(Arc::clone(&self.store), channel, user_id, PageOptions::from(&self.config));
    page.load().await.with_context(|| format!("Could not open channel '{channel}'"))?;
    Ok(page)
  }
}

/// Accepted values per filter column, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct FilterArgs {
  pub dates: Vec<String>,
  pub companies: Vec<String>,
  pub sentiments: Vec<String>,
}

/// Show a channel's insight table.
pub async fn show_insights(
  session: &Session,
  channel: &str,
  filters: &FilterArgs,
  full_text: bool,
) -> Result<()> {
  let mut page = session.open_page(channel).await?;

  page.set_filter_selection(FilterColumn::PublishDate, filters.dates.iter().cloned());
  page.set_filter_selection(FilterColumn::Company, filters.companies.iter().cloned());
  page.set_filter_selection(FilterColumn::Sentiment, filters.sentiments.iter().cloned());

  if let Some(channel) = page.channel() {
    display::display_channel_header(channel);
  }

  if !page.selection().is_unrestricted() {
    for column in FilterColumn::ALL {
      let accepted = page.selection().get(column);
      if !accepted.is_empty() {
        let values: Vec<&str> = accepted.iter().map(String::as_str).collect();
        println!("{} {}: {}", "Filtered by".dimmed(), column.title(), values.join(", ").yellow());
      }
    }
    println!();
  }

  let rows = page.rows();
  if rows.is_empty() {
    println!("No insights match the current filters.");
    return Ok(());
  }

  display::display_rows(&rows, session.config.display.expand_threshold, full_text);

  let dropped = page.dropped_rows();
  if dropped > 0 {
    println!(
      "\n{} {} more insights not shown; narrow the filters to see them",
      "…".dimmed(),
      dropped
    );
  }
  Ok(())
}

/// List the values a filter column offers for a channel.
pub async fn show_filter_options(session: &Session, channel: &str, column: FilterColumn) -> Result<()> {
  let page = session.open_page(channel).await?;
  let options = page.filter_options(column);

  if options.is_empty() {
    println!("No values available for {}.", column.title().yellow());
    return Ok(());
  }

  println!("{}", column.title().blue().bold());
  for value in options {
    println!("  {value}");
  }
  Ok(())
}

/// Cast a vote on an insight and report the resulting state.
pub async fn vote(session: &Session, channel: &str, insight_id: InsightId, vote: VoteType) -> Result<()> {
  let page = session.open_page(channel).await?;

  if !page.records().iter().any(|record| record.insight_id == insight_id) {
    anyhow::bail!("Insight {insight_id} is not part of channel '{channel}'");
  }

  match page.vote(insight_id, vote).await {
    Ok(state) => {
      let message = match state {
        VoteState::Up => "marked helpful",
        VoteState::Down => "marked not helpful",
        VoteState::NoVote => "vote removed",
      };
      println!("{} Insight {} {}", "✓".green(), insight_id.to_string().cyan(), message);
      Ok(())
    }
    Err(err @ FeedbackError::Busy(_)) => Err(err.into()),
    Err(err) => {
      for notice in page.take_notices() {
        println!("{} {}", "✗".red(), notice.message);
      }
      Err(err.into())
    }
  }
}

/// Companies most mentioned across all channels in a timeframe.
pub async fn mentions(session: &Session, timeframe: Timeframe, tab: MentionTab) -> Result<()> {
  let (since, until) = timeframe.window(Utc::now());
  debug!(%since, %until, "Fetching mentions");

  let rows = session
    .store
    .fetch_mentions(since, until)
    .await
    .context("Failed to fetch company mentions")?;

  let tallies = analytics::mention_tallies(&rows, tab);
  display::display_mentions(&tallies, timeframe, tab);
  Ok(())
}

/// Bullish, bearish and most discussed companies for one channel.
pub async fn trends(session: &Session, channel: &str) -> Result<()> {
  let records = session
    .store
    .fetch_insights(channel)
    .await
    .with_context(|| format!("Failed to fetch insights for '{channel}'"))?;

  match analytics::channel_trends(&records, &session.config.calendar_zone()) {
    Some(trends) => display::display_trends(&trends),
    None => println!("No insights available for {}.", channel.yellow()),
  }
  Ok(())
}

/// Print the anonymous identity token used for votes.
pub fn whoami(session: &Session) -> Result<()> {
  let token = session.identity.get_or_create();
  println!("{token}");
  println!("{} {}", "stored at".dimmed(), session.identity.path().display());
  Ok(())
}
