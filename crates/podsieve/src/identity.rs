//! Anonymous per-device identity used to key feedback votes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

const IDENTITY_FILE: &str = "anonymous_id";
const TOKEN_PREFIX: &str = "anon_";

/// Root directory for podsieve's local state.
///
/// `PODSIEVE_HOME` wins when set; otherwise the platform data directory.
pub fn podsieve_home() -> PathBuf {
  if let Ok(home) = std::env::var("PODSIEVE_HOME") {
    return PathBuf::from(home);
  }
  dirs::data_local_dir()
    .or_else(dirs::home_dir)
    .unwrap_or_else(|| PathBuf::from("."))
    .join("podsieve")
}

enum Stored {
  Token(String),
  Missing,
  Unreadable(io::Error),
}

fn new_token() -> String {
  format!("{TOKEN_PREFIX}{}", Uuid::new_v4().simple())
}

/// A stable opaque token persisted on this device, created on first use.
#[derive(Debug, Clone)]
pub struct AnonymousIdentity {
  path: PathBuf,
}

impl Default for AnonymousIdentity {
  fn default() -> Self {
    Self::new()
  }
}

impl AnonymousIdentity {
  pub fn new() -> Self {
    Self::at(podsieve_home().join(IDENTITY_FILE))
  }

  pub fn at(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Return the persisted token, generating and storing one if absent.
  ///
  /// Never fails. A stored token is never replaced: if the file exists but
  /// cannot be read, a token is issued for this session only. If a new
  /// token cannot be written it is still returned for this session.
  pub fn get_or_create(&self) -> String {
    match self.read() {
      Stored::Token(existing) => existing,
      Stored::Unreadable(err) => {
        warn!(path = %self.path.display(), error = %err, "Could not read anonymous identity, using a session token");
        new_token()
      }
      Stored::Missing => {
        let token = new_token();
        match self.write(&token) {
          Ok(()) => info!(path = %self.path.display(), "Created anonymous identity"),
          Err(err) => warn!(path = %self.path.display(), error = %err, "Could not persist anonymous identity"),
        }
        token
      }
    }
  }

  fn read(&self) -> Stored {
    let bytes = match fs::read(&self.path) {
      Ok(bytes) => bytes,
      Err(err) if err.kind() == io::ErrorKind::NotFound => return Stored::Missing,
      Err(err) => return Stored::Unreadable(err),
    };
    // Non-UTF-8 tokens are kept, not replaced.
    let content = String::from_utf8_lossy(&bytes);
    let token = content.trim();
    if token.is_empty() {
      debug!(path = %self.path.display(), "Ignoring empty identity file");
      return Stored::Missing;
    }
    Stored::Token(token.to_string())
  }

  fn write(&self, token: &str) -> io::Result<()> {
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::write(&self.path, token)
  }
}
