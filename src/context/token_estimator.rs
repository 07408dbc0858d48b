//! Token estimation for sizing decisions
//!
//! The heuristic estimator never runs a real tokenizer; it aims for roughly
//! ±10 % of a BPE count. `TiktokenEstimator` can be swapped in behind the same
//! trait when exact counts matter.

use super::models::Message;
use crate::config::EstimatorConfig;
use crate::error::{ContextError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tiktoken_rs::{cl100k_base, CoreBPE};

static CODE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```.*?```").unwrap());
static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").unwrap());
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Which estimator backs a manager
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimatorKind {
    #[default]
    Heuristic,
    Tiktoken,
}

/// Token estimator trait for different tokenization strategies
pub trait TokenEstimator: Send + Sync {
    /// Estimate the number of tokens in the given text
    fn estimate(&self, text: &str) -> usize;

    /// Role/formatting overhead added per message
    fn message_overhead(&self) -> usize {
        4
    }

    /// Flat cost of priming a request
    fn priming_tokens(&self) -> usize {
        3
    }

    /// Estimate tokens for multiple texts
    fn estimate_batch(&self, texts: &[&str]) -> Vec<usize> {
        texts.iter().map(|t| self.estimate(t)).collect()
    }

    /// Estimate a whole request: per-message content plus overhead, plus priming
    fn estimate_messages(&self, messages: &[Message]) -> usize {
        messages
            .iter()
            .map(|m| self.estimate(&m.content) + self.message_overhead())
            .sum::<usize>()
            + self.priming_tokens()
    }
}

/// Word-count heuristic with surcharges for code fences, URLs and numbers
#[derive(Debug, Clone)]
pub struct HeuristicEstimator {
    tokens_per_word: f64,
    code_block_tokens: usize,
    url_tokens: usize,
    digit_sequence_ratio: f64,
    message_overhead: usize,
    priming_tokens: usize,
}

impl HeuristicEstimator {
    pub fn new(config: &EstimatorConfig) -> Self {
        Self {
            tokens_per_word: config.tokens_per_word,
            code_block_tokens: config.code_block_tokens,
            url_tokens: config.url_tokens,
            digit_sequence_ratio: config.digit_sequence_ratio,
            message_overhead: config.message_overhead,
            priming_tokens: config.priming_tokens,
        }
    }

    pub fn tokens_per_word(&self) -> f64 {
        self.tokens_per_word
    }
}

impl Default for HeuristicEstimator {
    fn default() -> Self {
        Self::new(&EstimatorConfig::default())
    }
}

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        let words = text.split_whitespace().count() as f64;
        let code_blocks = CODE_BLOCK.find_iter(text).count();
        let urls = URL.find_iter(text).count();
        let digit_runs = DIGITS.find_iter(text).count() as f64;

        let estimate = words * self.tokens_per_word
            + (code_blocks * self.code_block_tokens) as f64
            + (urls * self.url_tokens) as f64
            + (digit_runs * self.digit_sequence_ratio).ceil();

        (estimate.ceil() as usize).max(1)
    }

    fn message_overhead(&self) -> usize {
        self.message_overhead
    }

    fn priming_tokens(&self) -> usize {
        self.priming_tokens
    }
}

/// Tiktoken-based token estimator using cl100k_base (GPT-4, GPT-3.5-turbo)
pub struct TiktokenEstimator {
    bpe: Arc<CoreBPE>,
    message_overhead: usize,
    priming_tokens: usize,
}

impl TiktokenEstimator {
    /// Create a new tiktoken estimator with cl100k_base encoding
    pub fn new(config: &EstimatorConfig) -> Result<Self> {
        let bpe = cl100k_base().map_err(|e| ContextError::Tokenizer(e.to_string()))?;
        Ok(Self {
            bpe: Arc::new(bpe),
            message_overhead: config.message_overhead,
            priming_tokens: config.priming_tokens,
        })
    }
}

impl TokenEstimator for TiktokenEstimator {
    fn estimate(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    fn message_overhead(&self) -> usize {
        self.message_overhead
    }

    fn priming_tokens(&self) -> usize {
        self.priming_tokens
    }
}

/// Build the estimator selected by configuration
pub fn build_estimator(config: &EstimatorConfig) -> Result<Arc<dyn TokenEstimator>> {
    Ok(match config.kind {
        EstimatorKind::Heuristic => Arc::new(HeuristicEstimator::new(config)),
        EstimatorKind::Tiktoken => Arc::new(TiktokenEstimator::new(config)?),
    })
}

/// Estimate tokens of `text` with default heuristic settings
pub fn estimate_tokens(text: &str) -> usize {
    HeuristicEstimator::default().estimate(text)
}

/// Estimate tokens of a message list with default heuristic settings
pub fn estimate_messages_tokens(messages: &[Message]) -> usize {
    HeuristicEstimator::default().estimate_messages(messages)
}
