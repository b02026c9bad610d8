//! Configuration file parser for ~/.config/feedlens/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are accepted, though we log a warning since they are usually
//! typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::feed::catalog::{DEFAULT_FEATURED_COUNT, DEFAULT_RELATED_COUNT};
use crate::feed::{FetchError, Relay};
use crate::util::DateLocale;

/// Feed shown when neither the config file nor the command line names one.
pub const DEFAULT_FEED_URL: &str = "https://www.shz.de/deutschland-welt/schleswig-holstein/klima/rss";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// SEC-014: Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed to fetch.
    pub feed_url: String,

    /// Relay endpoint; the feed URL is appended as the `url` query parameter.
    pub relay_url: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Articles in the featured selection.
    pub featured_count: usize,

    /// Related articles listed under an article.
    pub related_count: usize,

    /// Excerpt length in the article list.
    pub list_excerpt_length: usize,

    /// Excerpt length for featured articles.
    pub featured_excerpt_length: usize,

    /// Locale for publication dates ("de", "en-us", "en-gb").
    pub date_locale: DateLocale,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            relay_url: Relay::DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: 30,
            featured_count: DEFAULT_FEATURED_COUNT,
            related_count: DEFAULT_RELATED_COUNT,
            list_excerpt_length: 120,
            featured_excerpt_length: 180,
            date_locale: DateLocale::default(),
        }
    }
}

impl Config {
    /// SEC-014: Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 8] = [
        "feed_url",
        "relay_url",
        "request_timeout_secs",
        "featured_count",
        "related_count",
        "list_excerpt_length",
        "featured_excerpt_length",
        "date_locale",
    ];

    /// Default location: `$HOME/.config/feedlens/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME").map(|home| {
            PathBuf::from(home)
                .join(".config")
                .join("feedlens")
                .join("config.toml")
        })
    }

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        tracing::info!(feed = %config.feed_url, relay = %config.relay_url, "Loaded configuration");
        Ok(config)
    }

    /// Builds the relay described by this configuration.
    pub fn relay(&self) -> Result<Relay, FetchError> {
        Ok(Relay::new(&self.relay_url)?
            .with_timeout(Duration::from_secs(self.request_timeout_secs.max(1))))
    }
}

// ============================================================================
// Tests
// ============================================================================
