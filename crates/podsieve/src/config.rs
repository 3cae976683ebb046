//! Configuration management for podsieve
//!
//! Defaults, then an optional JSON file, then environment overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::calendar::CalendarZone;
use crate::error::ConfigError;
use crate::grouping::DEFAULT_ROW_LIMIT;
use crate::identity::podsieve_home;
use crate::projection::DEFAULT_EXPAND_THRESHOLD;
use crate::store::RestStoreConfig;

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub store: StoreSettings,
  #[serde(default)]
  pub display: DisplaySettings,
  /// Where the anonymous identity token lives
  #[serde(default)]
  pub identity_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
  /// Base URL of the record store (e.g., "https://project.supabase.co")
  #[serde(default = "default_base_url")]
  pub base_url: String,
  /// Anonymous API key sent with every request
  #[serde(default)]
  pub api_key: Option<String>,
  /// Request timeout in seconds
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySettings {
  /// Maximum rows shown after filtering
  #[serde(default = "default_row_limit")]
  pub row_limit: usize,
  /// Fixed offset for calendar dates; host local time when absent
  #[serde(default)]
  pub utc_offset_minutes: Option<i32>,
  /// Characters of insight text shown before collapsing
  #[serde(default = "default_expand_threshold")]
  pub expand_threshold: usize,
}

fn default_base_url() -> String {
  "http://localhost:54321".to_string()
}
fn default_timeout_secs() -> u64 {
  30
}
fn default_row_limit() -> usize {
  DEFAULT_ROW_LIMIT
}
fn default_expand_threshold() -> usize {
  DEFAULT_EXPAND_THRESHOLD
}

impl Default for StoreSettings {
  fn default() -> Self {
    Self { base_url: default_base_url(), api_key: None, timeout_secs: default_timeout_secs() }
  }
}

impl Default for DisplaySettings {
  fn default() -> Self {
    Self {
      row_limit: default_row_limit(),
      utc_offset_minutes: None,
      expand_threshold: default_expand_threshold(),
    }
  }
}

impl Config {
  /// Default config file location.
  pub fn default_path() -> PathBuf {
    if std::env::var_os("PODSIEVE_HOME").is_some() {
      return podsieve_home().join(CONFIG_FILE);
    }
    dirs::config_dir()
      .map(|dir| dir.join("podsieve").join(CONFIG_FILE))
      .unwrap_or_else(|| podsieve_home().join(CONFIG_FILE))
  }

  pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
  }

  /// Load from `path` (or the default location), then apply environment overrides.
  ///
  /// A missing file means defaults; an unreadable or malformed one is an error.
  pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);

    let mut config = if path.exists() {
      debug!(path = %path.display(), "Loading config file");
      Self::load_from_file(&path)?
    } else {
      Config::default()
    };

    config.apply_env();
    config.validate()?;
    Ok(config)
  }

  pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
    let content = serde_json::to_string_pretty(self)?;
    std::fs::write(path, content)?;
    Ok(())
  }

  fn apply_env(&mut self) {
    if let Ok(url) = std::env::var("PODSIEVE_STORE_URL") {
      self.store.base_url = url;
    }
    if let Ok(key) = std::env::var("PODSIEVE_API_KEY") {
      self.store.api_key = Some(key);
    }
    if let Some(secs) = std::env::var("PODSIEVE_TIMEOUT_SECS").ok().and_then(|raw| raw.parse().ok()) {
      self.store.timeout_secs = secs;
    }
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.store.base_url.trim().is_empty() {
      return Err(ConfigError::Invalid("store.base_url must not be empty".to_string()));
    }
    if self.store.timeout_secs == 0 {
      return Err(ConfigError::Invalid("store.timeout_secs must be at least 1".to_string()));
    }
    if self.display.row_limit == 0 {
      return Err(ConfigError::Invalid("display.row_limit must be at least 1".to_string()));
    }
    if let Some(minutes) = self.display.utc_offset_minutes {
      if CalendarZone::from_offset_minutes(minutes).is_none() {
        return Err(ConfigError::Invalid(format!(
          "display.utc_offset_minutes {minutes} is outside +/-24h"
        )));
      }
    }
    Ok(())
  }

  pub fn calendar_zone(&self) -> CalendarZone {
    self
      .display
      .utc_offset_minutes
      .and_then(CalendarZone::from_offset_minutes)
      .unwrap_or_default()
  }

  pub fn rest_store_config(&self) -> RestStoreConfig {
    RestStoreConfig {
      base_url: self.store.base_url.clone(),
      api_key: self.store.api_key.clone(),
      timeout_secs: self.store.timeout_secs,
    }
  }
}
