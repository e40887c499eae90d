//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/chatlens/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/chatlens/` (~/.config/chatlens/)
//! - State/Logs: `$XDG_STATE_HOME/chatlens/` (~/.local/state/chatlens/)
//!
//! The message archive itself is never written; it lives wherever the
//! messaging client keeps it (`~/Library/Messages/chat.db` by default).

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Log file name (and rotation prefix) inside [`Config::state_dir`].
pub const LOG_FILE_NAME: &str = "chatlens.log";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Archive location override
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Analytics configuration
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Contacts source configuration
    #[serde(default)]
    pub contacts: ContactsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where to find the message archive
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ArchiveConfig {
    /// Explicit path to `chat.db`. Falls back to [`Config::default_archive_path`].
    pub path: Option<PathBuf>,
}

/// Smoothing and ranking knobs
#[derive(Debug, Deserialize, Clone)]
pub struct AnalyticsConfig {
    /// EMA decay constant applied to daily series
    #[serde(default = "default_smoothing_alpha")]
    pub smoothing_alpha: f64,

    /// Minimum accumulated words for a record to enter top/bottom rankings
    #[serde(default = "default_min_ranking_words")]
    pub min_ranking_words: u64,

    /// Length of the top/bottom readability rankings
    #[serde(default = "default_ranking_size")]
    pub ranking_size: usize,

    /// Length of the most-prolific ranking
    #[serde(default = "default_prolific_size")]
    pub prolific_size: usize,

    /// Number of persons kept by the top-series views
    #[serde(default = "default_series_limit")]
    pub series_limit: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            smoothing_alpha: default_smoothing_alpha(),
            min_ranking_words: default_min_ranking_words(),
            ranking_size: default_ranking_size(),
            prolific_size: default_prolific_size(),
            series_limit: default_series_limit(),
        }
    }
}

impl AnalyticsConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if !(self.smoothing_alpha > 0.0 && self.smoothing_alpha <= 1.0) {
            return Err(Error::Config(format!(
                "analytics.smoothing_alpha must be in (0, 1], got {}",
                self.smoothing_alpha
            )));
        }
        if self.ranking_size == 0 || self.prolific_size == 0 || self.series_limit == 0 {
            return Err(Error::Config(
                "analytics ranking sizes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_smoothing_alpha() -> f64 {
    0.1
}

fn default_min_ranking_words() -> u64 {
    50
}

fn default_ranking_size() -> usize {
    5
}

fn default_prolific_size() -> usize {
    10
}

fn default_series_limit() -> usize {
    10
}

/// Contacts source configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct ContactsConfig {
    /// vCard (`.vcf`) export used to build the name index
    pub vcard_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.analytics.validate()?;
        Ok(config)
    }

    /// The archive path to read: the configured override or the platform default.
    pub fn archive_path(&self) -> PathBuf {
        self.archive
            .path
            .clone()
            .unwrap_or_else(Self::default_archive_path)
    }

    /// Returns the default archive location
    ///
    /// `~/Library/Messages/chat.db`
    pub fn default_archive_path() -> PathBuf {
        home_dir().join("Library").join("Messages").join("chat.db")
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/chatlens/config.toml` (~/.config/chatlens/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("chatlens").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/chatlens/` (~/.local/state/chatlens/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("chatlens")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join(LOG_FILE_NAME)
    }
}
