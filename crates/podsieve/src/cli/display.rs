//! Display formatting utilities for CLI output

use colored::*;

use crate::analytics::{ChannelTrends, CompanyTally, CompanyTrend, MentionTab, Timeframe};
use crate::feedback::VoteState;
use crate::model::Channel;
use crate::projection::{RowDescriptor, SentimentBadge};

const TEXT_WIDTH: usize = 80;

/// First `limit` characters of `text`, with an ellipsis when cut.
pub fn collapse_text(text: &str, limit: usize) -> String {
  match text.char_indices().nth(limit) {
    Some((cut, _)) => format!("{}...", &text[..cut]),
    None => text.to_string(),
  }
}

/// Wrap text to fit within a specified width
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
  let mut lines = Vec::new();

  for paragraph in text.split('\n') {
    let mut current_line = String::new();
    for word in paragraph.split_whitespace() {
      if current_line.is_empty() {
        current_line = word.to_string();
      } else if current_line.chars().count() + 1 + word.chars().count() <= width {
        current_line.push(' ');
        current_line.push_str(word);
      } else {
        lines.push(std::mem::take(&mut current_line));
        current_line = word.to_string();
      }
    }
    lines.push(current_line);
  }

  lines
}

fn badge(row: &RowDescriptor) -> ColoredString {
  let label = format!(" {} ", row.sentiment_label);
  match row.badge {
    SentimentBadge::Positive => label.black().on_green(),
    SentimentBadge::Negative => label.white().on_red(),
    SentimentBadge::Other => label.black().on_white(),
  }
}

fn vote_marker(vote: VoteState, busy: bool) -> ColoredString {
  if busy {
    return "…".dimmed();
  }
  match vote {
    VoteState::Up => "▲ helpful".green().bold(),
    VoteState::Down => "▼ not helpful".red().bold(),
    VoteState::NoVote => "·".dimmed(),
  }
}

pub fn display_channel_header(channel: &Channel) {
  println!("{}", channel.channel_name.blue().bold());
  if let Some(host) = &channel.host {
    println!("Hosted by {}", host.cyan());
  }
  if let Some(description) = &channel.channel_description {
    for line in wrap_text(description, TEXT_WIDTH) {
      println!("{}", line.dimmed());
    }
  }
  println!();
}

/// Print table rows, one block per episode group.
pub fn display_rows(rows: &[RowDescriptor], expand_threshold: usize, full_text: bool) {
  for row in rows {
    if let Some(header) = &row.header {
      let title = if row.alternate { header.episode_title.yellow() } else { header.episode_title.cyan() };
      println!(
        "{} {} {}",
        title.bold(),
        header.date.dimmed(),
        format!("({} insights)", header.span).dimmed()
      );
    }

    println!(
      "  {} {} {} {}",
      format!("#{}", row.insight_id).dimmed(),
      row.company_name.bold(),
      badge(row),
      vote_marker(row.vote, row.busy)
    );

    let text = if row.expandable && !full_text {
      format!("{} {}", collapse_text(&row.text, expand_threshold), "(see more: --full)".dimmed())
    } else {
      row.text.clone()
    };
    for line in wrap_text(&text, TEXT_WIDTH) {
      println!("    {line}");
    }
  }
}

pub fn display_mentions(tallies: &[CompanyTally], timeframe: Timeframe, tab: MentionTab) {
  let heading = match tab {
    MentionTab::Positive => "Top positive mentions".green().bold(),
    MentionTab::Negative => "Top negative mentions".red().bold(),
  };
  println!("{} {}", heading, format!("({timeframe})").dimmed());

  if tallies.is_empty() {
    println!("No mentions found.");
    return;
  }

  for (rank, tally) in tallies.iter().enumerate() {
    println!(
      "{:>3}. {:<30} {} {}",
      rank + 1,
      tally.company_name,
      format!("+{}", tally.positive).green(),
      format!("-{}", tally.negative).red()
    );
  }
}

fn display_trend(heading: ColoredString, trend: Option<&CompanyTrend>) {
  match trend {
    Some(trend) => {
      println!("{} {}", heading, trend.company_name.bold());
      for month in &trend.months {
        println!("  {:<10} {}", month.label, month.count);
      }
    }
    None => println!("{} {}", heading, "none".dimmed()),
  }
}

pub fn display_trends(trends: &ChannelTrends) {
  display_trend("Most bullish:".green().bold(), trends.bullish.as_ref());
  display_trend("Most bearish:".red().bold(), trends.bearish.as_ref());

  println!("{}", "Top companies:".blue().bold());
  for company in &trends.top_companies {
    println!("  {:<30} {}", company.company_name, company.count);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_collapse_text_counts_characters() {
    assert_eq!(collapse_text("short", 10), "short");
    assert_eq!(collapse_text("abcdef", 3), "abc...");
    assert_eq!(collapse_text("ééééé", 2), "éé...");
  }

  #[test]
  fn test_wrap_text() {
    let lines = wrap_text("one two three four", 9);
    assert_eq!(lines, vec!["one two", "three", "four"]);
    assert_eq!(wrap_text("a\n\nb", 10), vec!["a", "", "b"]);
  }
}
