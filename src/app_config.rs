/*!
 * Application configuration management.
 *
 * Loads and validates the JSON configuration file, providing defaults for
 * every field so a generated file works out of the box.
 */

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::chunker::TEXT_DELIMITER;
use crate::language_utils::{languages_match, normalize_to_part1};

/// Log level for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Convert to the log crate's level filter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Timing and retry knobs for the request client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Hard upper bound on payload size, in characters
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    /// Minimum interval between consecutive submissions, in seconds
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: f64,

    /// Number of submit attempts per logical request
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: usize,

    /// Base wait budget per attempt; the effective budget grows by one
    /// second per 80 input characters
    #[serde(default = "default_base_timeout_secs")]
    pub base_timeout_secs: u64,

    /// Lower bound of the jittered delay between output samples, in seconds
    #[serde(default = "default_poll_interval_min_secs")]
    pub poll_interval_min_secs: f64,

    /// Upper bound of the jittered delay between output samples, in seconds
    #[serde(default = "default_poll_interval_max_secs")]
    pub poll_interval_max_secs: f64,

    /// Consecutive identical non-empty samples required before the output
    /// counts as stable
    #[serde(default = "default_required_stable_cycles")]
    pub required_stable_cycles: usize,

    /// Lower bound of the backoff before a retry, in seconds
    #[serde(default = "default_backoff_min_secs")]
    pub backoff_min_secs: f64,

    /// Upper bound of the backoff before a retry, in seconds
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: f64,

    /// How long to wait for the session to become authenticated, in seconds
    #[serde(default = "default_auth_timeout_secs")]
    pub auth_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_input_chars: default_max_input_chars(),
            cooldown_secs: default_cooldown_secs(),
            retry_attempts: default_retry_attempts(),
            base_timeout_secs: default_base_timeout_secs(),
            poll_interval_min_secs: default_poll_interval_min_secs(),
            poll_interval_max_secs: default_poll_interval_max_secs(),
            required_stable_cycles: default_required_stable_cycles(),
            backoff_min_secs: default_backoff_min_secs(),
            backoff_max_secs: default_backoff_max_secs(),
            auth_timeout_secs: default_auth_timeout_secs(),
        }
    }
}

fn default_max_input_chars() -> usize {
    4950
}

fn default_cooldown_secs() -> f64 {
    2.0
}

fn default_retry_attempts() -> usize {
    3
}

fn default_base_timeout_secs() -> u64 {
    60
}

fn default_poll_interval_min_secs() -> f64 {
    0.8
}

fn default_poll_interval_max_secs() -> f64 {
    1.2
}

fn default_required_stable_cycles() -> usize {
    3
}

fn default_backoff_min_secs() -> f64 {
    3.0
}

fn default_backoff_max_secs() -> f64 {
    5.0
}

fn default_auth_timeout_secs() -> u64 {
    300
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source language (name or ISO code)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language (name or ISO code)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Items whose name contains any of these keywords are skipped
    #[serde(default = "default_excluded_keywords")]
    pub excluded_keywords: Vec<String>,

    /// Upper bound on the character length of one translation batch
    #[serde(default = "default_max_chars_per_chunk")]
    pub max_chars_per_chunk: usize,

    /// Path of the checkpoint database file
    #[serde(default = "default_checkpoint_db")]
    pub checkpoint_db: PathBuf,

    /// Literal substrings stripped from service output before splitting
    #[serde(default = "default_strip_patterns")]
    pub strip_patterns: Vec<String>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Request client knobs
    #[serde(default)]
    pub client: ClientConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_language: default_source_language(),
            target_language: default_target_language(),
            excluded_keywords: default_excluded_keywords(),
            max_chars_per_chunk: default_max_chars_per_chunk(),
            checkpoint_db: default_checkpoint_db(),
            strip_patterns: default_strip_patterns(),
            log_level: LogLevel::default(),
            client: ClientConfig::default(),
        }
    }
}

fn default_source_language() -> String {
    "english".to_string()
}

fn default_target_language() -> String {
    "french".to_string()
}

fn default_excluded_keywords() -> Vec<String> {
    ["toc", "nav", "cover", "title", "index", "info", "copyright"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_chars_per_chunk() -> usize {
    4950
}

fn default_checkpoint_db() -> PathBuf {
    PathBuf::from("checkpoints/translation_checkpoint.db")
}

fn default_strip_patterns() -> Vec<String> {
    vec!["Translated with DeepL.com (free version)".to_string()]
}

impl Config {
    /// Load the configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from a file if it exists, otherwise write defaults there
    pub fn from_file_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            let config = Config::default();
            config.save(path)?;
            log::info!("Created default configuration at {:?}", path);
            Ok(config)
        }
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
            }
        }
        let contents =
            serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;
        Ok(())
    }

    /// Validate field ranges and language identifiers
    pub fn validate(&self) -> Result<()> {
        normalize_to_part1(&self.source_language)
            .with_context(|| format!("Invalid source language: {}", self.source_language))?;
        normalize_to_part1(&self.target_language)
            .with_context(|| format!("Invalid target language: {}", self.target_language))?;

        if languages_match(&self.source_language, &self.target_language) {
            return Err(anyhow!(
                "Source and target languages are the same: {}",
                self.target_language
            ));
        }

        if self.max_chars_per_chunk <= TEXT_DELIMITER.len() {
            return Err(anyhow!(
                "max_chars_per_chunk must exceed the delimiter length ({})",
                TEXT_DELIMITER.len()
            ));
        }

        let c = &self.client;
        if c.retry_attempts == 0 {
            return Err(anyhow!("retry_attempts must be at least 1"));
        }
        if c.required_stable_cycles == 0 {
            return Err(anyhow!("required_stable_cycles must be at least 1"));
        }
        if c.max_input_chars == 0 {
            return Err(anyhow!("max_input_chars must be positive"));
        }
        if c.poll_interval_min_secs <= 0.0 || c.poll_interval_max_secs < c.poll_interval_min_secs {
            return Err(anyhow!(
                "poll interval bounds must be positive and ordered (got {}..{})",
                c.poll_interval_min_secs,
                c.poll_interval_max_secs
            ));
        }
        if c.backoff_min_secs < 0.0 || c.backoff_max_secs < c.backoff_min_secs {
            return Err(anyhow!(
                "backoff bounds must be non-negative and ordered (got {}..{})",
                c.backoff_min_secs,
                c.backoff_max_secs
            ));
        }
        if c.cooldown_secs < 0.0 {
            return Err(anyhow!("cooldown_secs must be non-negative"));
        }

        Ok(())
    }
}
