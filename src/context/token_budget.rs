//! Prompt budget within a model's context window
//!
//! A fixed share of the window is reserved for the model's reply; the prompt
//! must fit in the remainder. The ratio is checked by `WindowConfig::validate`.

use serde::{Deserialize, Serialize};

/// Prompt budget for one model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextBudget {
    pub context_limit: usize,
    pub max_tokens: usize,
}

impl ContextBudget {
    /// `max_tokens = floor(context_limit * ratio)`
    pub fn new(context_limit: usize, ratio: f64) -> Self {
        Self {
            context_limit,
            max_tokens: (context_limit as f64 * ratio).floor() as usize,
        }
    }

    /// Tokens held back for the response
    pub fn reserved(&self) -> usize {
        self.context_limit - self.max_tokens
    }

    pub fn fits(&self, tokens: usize) -> bool {
        tokens <= self.max_tokens
    }

    pub fn remaining(&self, used: usize) -> usize {
        self.max_tokens.saturating_sub(used)
    }
}
