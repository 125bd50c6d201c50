use anyhow::{anyhow, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use crate::providers::SessionParams;
use crate::providers::gemini::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::translation::backoff::{BackoffPolicy, DEFAULT_BASE_DELAY_SECS, DEFAULT_MAX_BACKOFF_SECS};
use crate::translation::completion::{DEFAULT_REQUIRED_STREAK, DEFAULT_THRESHOLD_PERCENT};
use crate::translation::engine::{EngineConfig, DEFAULT_MAX_RETRIES};

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Language of the input subtitles (name or ISO code)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Language to translate into (name or ISO code)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Free-form context embedded in the opening prompt
    #[serde(default)]
    pub context: String,

    /// Checkpoint accumulated blocks so jobs can resume
    #[serde(default = "default_true")]
    pub save_progress: bool,

    /// Base backoff delay in seconds
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,

    /// Backoff ceiling in seconds
    #[serde(default = "default_max_backoff_secs")]
    pub max_backoff_secs: u64,

    /// Attempts per credential before rotating
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Near-completion heuristic settings
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Near-completion heuristic settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CompletionConfig {
    /// Completion percentage at which stalled replies start counting
    #[serde(default = "default_threshold_percent")]
    pub threshold_percent: f64,

    /// Consecutive stalled replies that end a job
    #[serde(default = "default_required_streak")]
    pub required_streak: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            threshold_percent: default_threshold_percent(),
            required_streak: default_required_streak(),
        }
    }
}

/// Provider configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProviderConfig {
    // @field: Model name
    #[serde(default = "default_model")]
    pub model: String,

    // @field: Service URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    // @field: API keys, tried in order
    #[serde(default)]
    pub api_keys: Vec<String>,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Generation and safety parameters
    #[serde(default)]
    pub session: SessionParams,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            endpoint: default_endpoint(),
            api_keys: Vec::new(),
            timeout_secs: default_timeout_secs(),
            session: SessionParams::default(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
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
    // @returns: Matching log crate filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "English".to_string()
}

fn default_target_language() -> String {
    "Portuguese".to_string()
}

fn default_true() -> bool {
    true
}

fn default_base_delay_secs() -> u64 {
    DEFAULT_BASE_DELAY_SECS
}

fn default_max_backoff_secs() -> u64 {
    DEFAULT_MAX_BACKOFF_SECS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_threshold_percent() -> f64 {
    DEFAULT_THRESHOLD_PERCENT
}

fn default_required_streak() -> u32 {
    DEFAULT_REQUIRED_STREAK
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    // Whole-file prompts with long outputs are slow
    300
}

impl Config {

    /// Load the configuration at `path`, writing a default one first when the
    /// file does not exist
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let file = File::open(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok(config);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.source_language.trim().is_empty() {
            return Err(anyhow!("Source language must not be empty"));
        }
        if self.target_language.trim().is_empty() {
            return Err(anyhow!("Target language must not be empty"));
        }
        if self.max_retries == 0 {
            return Err(anyhow!("max_retries must be at least 1"));
        }
        if self.base_delay_secs > self.max_backoff_secs {
            return Err(anyhow!(
                "base_delay_secs ({}) must not exceed max_backoff_secs ({})",
                self.base_delay_secs, self.max_backoff_secs
            ));
        }
        let threshold = self.completion.threshold_percent;
        if !(threshold > 0.0 && threshold <= 100.0) {
            return Err(anyhow!("completion.threshold_percent must be in (0, 100], got {}", threshold));
        }
        if self.completion.required_streak == 0 {
            return Err(anyhow!("completion.required_streak must be at least 1"));
        }
        if self.provider.model.trim().is_empty() {
            return Err(anyhow!("Provider model must not be empty"));
        }

        Ok(())
    }

    /// API keys with blanks removed
    pub fn api_keys(&self) -> Vec<String> {
        self.provider.api_keys.iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect()
    }

    /// Engine settings derived from this configuration
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            save_progress: self.save_progress,
            max_retries: self.max_retries,
            backoff: BackoffPolicy::new(
                Duration::from_secs(self.base_delay_secs),
                Duration::from_secs(self.max_backoff_secs),
            ),
            completion_threshold_percent: self.completion.threshold_percent,
            completion_required_streak: self.completion.required_streak,
            session: self.provider.session.clone(),
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            context: String::new(),
            save_progress: true,
            base_delay_secs: default_base_delay_secs(),
            max_backoff_secs: default_max_backoff_secs(),
            max_retries: default_max_retries(),
            completion: CompletionConfig::default(),
            provider: ProviderConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}
