//! Layered configuration: `.env`, optional TOML file, then environment
//!
//! Environment variables use the `CONTEXT_WINDOW` prefix with `__` as the
//! section separator, e.g. `CONTEXT_WINDOW__WINDOW__BUDGET_RATIO=0.75`.

use crate::context::{CacheKeyStrategy, EstimatorKind, EvictionPolicy};
use crate::error::{ContextError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "CONTEXT_WINDOW";

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub window: WindowConfig,

    #[serde(default)]
    pub estimator: EstimatorConfig,

    #[serde(default)]
    pub summary_cache: SummaryCacheConfig,

    #[serde(default)]
    pub models: ModelsConfig,
}

impl Config {
    /// Load configuration from an optional TOML file and the environment.
    ///
    /// A missing file is not an error; defaults and environment overrides
    /// still apply.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());

        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from an inline TOML document
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from_str(toml, ::config::FileFormat::Toml))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.window.validate()?;
        self.estimator.validate()?;
        self.summary_cache.validate()?;
        self.models.validate()?;
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Context window policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Share of the model window usable by the prompt; the rest is left for the reply
    #[serde(default = "default_budget_ratio")]
    pub budget_ratio: f64,

    /// Most recent messages kept verbatim when summarizing
    #[serde(default = "default_keep_recent")]
    pub keep_recent_messages: usize,

    /// Conversations shorter than this are never summarized
    #[serde(default = "default_min_messages")]
    pub min_messages_for_summary: usize,

    /// Token cap for a generated summary
    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: usize,

    /// Header line of the synthetic summary message
    #[serde(default = "default_summary_preamble")]
    pub summary_preamble: String,
}

fn default_budget_ratio() -> f64 {
    0.80
}

fn default_keep_recent() -> usize {
    10
}

fn default_min_messages() -> usize {
    12
}

fn default_summary_max_tokens() -> usize {
    600
}

fn default_summary_preamble() -> String {
    "Summary of the earlier conversation (older messages were condensed to fit the context window):"
        .to_string()
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            budget_ratio: default_budget_ratio(),
            keep_recent_messages: default_keep_recent(),
            min_messages_for_summary: default_min_messages(),
            summary_max_tokens: default_summary_max_tokens(),
            summary_preamble: default_summary_preamble(),
        }
    }
}

impl WindowConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.budget_ratio > 0.0 && self.budget_ratio <= 1.0) {
            return Err(ContextError::Configuration(format!(
                "window.budget_ratio must be in (0, 1], got {}",
                self.budget_ratio
            )));
        }
        if self.keep_recent_messages >= self.min_messages_for_summary {
            return Err(ContextError::Configuration(format!(
                "window.keep_recent_messages ({}) must be below window.min_messages_for_summary ({})",
                self.keep_recent_messages, self.min_messages_for_summary
            )));
        }
        if self.summary_max_tokens == 0 {
            return Err(ContextError::Configuration(
                "window.summary_max_tokens must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Token estimator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimatorConfig {
    #[serde(default)]
    pub kind: EstimatorKind,

    #[serde(default = "default_tokens_per_word")]
    pub tokens_per_word: f64,

    /// Surcharge per fenced code block pair
    #[serde(default = "default_code_block_tokens")]
    pub code_block_tokens: usize,

    /// Surcharge per embedded URL
    #[serde(default = "default_url_tokens")]
    pub url_tokens: usize,

    /// Tokens per digit sequence, rounded up over the whole text
    #[serde(default = "default_digit_sequence_ratio")]
    pub digit_sequence_ratio: f64,

    /// Role/formatting overhead per message
    #[serde(default = "default_message_overhead")]
    pub message_overhead: usize,

    /// Flat priming cost per request
    #[serde(default = "default_priming_tokens")]
    pub priming_tokens: usize,
}

fn default_tokens_per_word() -> f64 {
    1.33
}

fn default_code_block_tokens() -> usize {
    3
}

fn default_url_tokens() -> usize {
    5
}

fn default_digit_sequence_ratio() -> f64 {
    0.3
}

fn default_message_overhead() -> usize {
    4
}

fn default_priming_tokens() -> usize {
    3
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            kind: EstimatorKind::default(),
            tokens_per_word: default_tokens_per_word(),
            code_block_tokens: default_code_block_tokens(),
            url_tokens: default_url_tokens(),
            digit_sequence_ratio: default_digit_sequence_ratio(),
            message_overhead: default_message_overhead(),
            priming_tokens: default_priming_tokens(),
        }
    }
}

impl EstimatorConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.tokens_per_word > 0.0) {
            return Err(ContextError::Configuration(format!(
                "estimator.tokens_per_word must be positive, got {}",
                self.tokens_per_word
            )));
        }
        if self.digit_sequence_ratio < 0.0 {
            return Err(ContextError::Configuration(format!(
                "estimator.digit_sequence_ratio must not be negative, got {}",
                self.digit_sequence_ratio
            )));
        }
        Ok(())
    }
}

/// Summary cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryCacheConfig {
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    #[serde(default)]
    pub eviction: EvictionPolicy,

    #[serde(default)]
    pub key: CacheKeyStrategy,
}

fn default_cache_capacity() -> usize {
    20
}

impl Default for SummaryCacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            eviction: EvictionPolicy::default(),
            key: CacheKeyStrategy::default(),
        }
    }
}

impl SummaryCacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(ContextError::Configuration(
                "summary_cache.capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Model catalog settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Window size assumed for unknown model ids
    #[serde(default = "default_context_limit")]
    pub default_context_limit: usize,

    /// Extra or replacement entries merged over the built-in table
    #[serde(default)]
    pub overrides: HashMap<String, usize>,
}

fn default_context_limit() -> usize {
    crate::context::model_catalog::DEFAULT_CONTEXT_LIMIT
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            default_context_limit: default_context_limit(),
            overrides: HashMap::new(),
        }
    }
}

impl ModelsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_context_limit == 0 {
            return Err(ContextError::Configuration(
                "models.default_context_limit must be positive".to_string(),
            ));
        }
        if let Some((model, _)) = self.overrides.iter().find(|(_, limit)| **limit == 0) {
            return Err(ContextError::Configuration(format!(
                "models.overrides.{} must be positive",
                model
            )));
        }
        Ok(())
    }
}
