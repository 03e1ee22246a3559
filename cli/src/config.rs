//! Command-line and environment configuration.

use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("timeout must be at least one second")]
    ZeroTimeout,

    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Browse users and their latest post.
///
/// Without `--search`, lists everyone, then treats each line on stdin as a
/// new search submission.
#[derive(Debug, Parser)]
#[command(name = "feed", version)]
pub struct Args {
    /// Root of the users/posts API.
    #[arg(long, env = "FEED_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[arg(long, env = "FEED_TIMEOUT_SECS", default_value_t = 10)]
    pub timeout_secs: u64,

    /// Run a single search and exit.
    #[arg(long)]
    pub search: Option<String>,
}

impl Args {
    /// Check the values clap cannot check on its own.
    pub fn validate(&self) -> Result<(), CliError> {
        let invalid = |reason: String| CliError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason,
        };
        let url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        if self.timeout_secs == 0 {
            return Err(CliError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
