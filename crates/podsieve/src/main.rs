use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use podsieve::analytics::{MentionTab, Timeframe};
use podsieve::cli::commands::{self, FilterArgs, Session};
use podsieve::config::Config;
use podsieve::filter::FilterColumn;
use podsieve::model::{InsightId, VoteType};

#[derive(Parser)]
#[command(name = "podsieve")]
#[command(about = "PodSieve - Episode Insights\nBrowse, filter and rate company insights from podcast episodes")]
#[command(version)]
struct Cli {
  /// Path to a config file (defaults to the platform config directory)
  #[arg(long, global = true, env = "PODSIEVE_CONFIG")]
  config: Option<PathBuf>,

  /// Enable verbose logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Args)]
struct Filters {
  /// Only show insights published on this date (M/D/YYYY), repeatable
  #[arg(long = "date")]
  dates: Vec<String>,
  /// Only show insights about this company, repeatable
  #[arg(long = "company")]
  companies: Vec<String>,
  /// Only show insights with this sentiment, repeatable
  #[arg(long = "sentiment")]
  sentiments: Vec<String>,
}

#[derive(Subcommand)]
enum Command {
  /// Show a channel's episode insights, grouped by episode and day
  Insights {
    /// Channel name
    channel: String,
    #[command(flatten)]
    filters: Filters,
    /// Show full insight text instead of collapsing long entries
    #[arg(long)]
    full: bool,
    /// List the values available for a filter column instead of the table
    #[arg(long, value_name = "COLUMN")]
    options: Option<FilterColumn>,
  },
  /// Mark an insight helpful (up) or not helpful (down); repeating a vote removes it
  Vote {
    /// Channel name
    channel: String,
    /// Insight identifier
    insight_id: InsightId,
    /// up or down
    vote: VoteType,
  },
  /// Most mentioned companies across all channels
  Mentions {
    /// Time window: 1W, 1M or 3M
    #[arg(short, long, default_value = "1W")]
    timeframe: Timeframe,
    /// Rank by positive or negative mentions
    #[arg(long, default_value = "positive")]
    tab: MentionTab,
  },
  /// Most bullish and bearish companies for a channel
  Trends {
    /// Channel name
    channel: String,
  },
  /// Show the anonymous identity used for votes
  Whoami,
}

async fn handle(session: &Session, command: Command) -> Result<()> {
  match command {
    Command::Insights { channel, filters, full, options } => match options {
      Some(column) => commands::show_filter_options(session, &channel, column).await,
      None => {
        let filters = FilterArgs {
          dates: filters.dates,
          companies: filters.companies,
          sentiments: filters.sentiments,
        };
        commands::show_insights(session, &channel, &filters, full).await
      }
    },
    Command::Vote { channel, insight_id, vote } => {
      commands::vote(session, &channel, insight_id, vote).await
    }
    Command::Mentions { timeframe, tab } => commands::mentions(session, timeframe, tab).await,
    Command::Trends { channel } => commands::trends(session, &channel).await,
    Command::Whoami => commands::whoami(session),
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_filter = if cli.verbose { "podsieve=debug,info" } else { "podsieve=info,warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
  tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

  let config = Config::load(cli.config.as_deref())?;
  let session = Session::from_config(config)?;

  handle(&session, cli.command).await
}
