//! Context window orchestration
//!
//! Decides whether a conversation can be sent verbatim or must have its older
//! messages replaced by a summary:
//! - Fits within the prompt budget, or is too short to summarize: send as is
//! - Otherwise: summarize everything but the most recent turns
//! - Still too large: drop the oldest of the recent turns until it fits

use super::model_catalog::ModelCatalog;
use super::models::{ContextPreparationResult, Message};
use super::summarizer::{LocalSummarizer, Summarizer};
use super::summary_cache::SummaryCache;
use super::token_budget::ContextBudget;
use super::token_estimator::{build_estimator, TokenEstimator};
use crate::config::{Config, WindowConfig};
use crate::error::Result;
use crate::metrics::METRICS;
use std::sync::Arc;
use tracing::{debug, info, warn};

const OUTCOME_FIT: &str = "fit";
const OUTCOME_SUMMARIZED: &str = "summarized";
const OUTCOME_TRIMMED: &str = "trimmed";

/// Prepares conversations for a model's context window
pub struct ContextWindowManager {
    window: WindowConfig,
    estimator: Arc<dyn TokenEstimator>,
    catalog: ModelCatalog,
    summarizer: Arc<dyn Summarizer>,
    cache: SummaryCache,
}

impl ContextWindowManager {
    /// Create a manager with a custom estimator and summarizer
    pub fn new(
        config: &Config,
        estimator: Arc<dyn TokenEstimator>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            window: config.window.clone(),
            estimator,
            catalog: ModelCatalog::new(&config.models),
            summarizer,
            cache: SummaryCache::new(&config.summary_cache),
        })
    }

    /// Create a manager with the configured estimator and the local summarizer
    pub fn from_config(config: &Config) -> Result<Self> {
        let estimator = build_estimator(&config.estimator)?;
        let summarizer = Arc::new(LocalSummarizer::new(
            estimator.clone(),
            config.window.summary_max_tokens,
            config.estimator.tokens_per_word,
        ));
        Self::new(config, estimator, summarizer)
    }

    /// Prepare a conversation for `model_id`.
    ///
    /// Async only to match caller conventions; nothing is awaited.
    pub async fn prepare_context_window(
        &self,
        system_prompt: &Message,
        all_messages: &[Message],
        model_id: &str,
    ) -> ContextPreparationResult {
        self.prepare(system_prompt, all_messages, model_id)
    }

    /// Synchronous form of [`prepare_context_window`](Self::prepare_context_window)
    pub fn prepare(
        &self,
        system_prompt: &Message,
        all_messages: &[Message],
        model_id: &str,
    ) -> ContextPreparationResult {
        let budget = self.budget_for(model_id);

        let system_tokens = self.estimator.estimate_messages(std::slice::from_ref(system_prompt));
        let messages_tokens = self.estimator.estimate_messages(all_messages);
        let total_tokens = system_tokens + messages_tokens;

        debug!(
            "Context sizing: model={}, limit={}, max={}, reserved={}, system={}, messages={}, total={}",
            model_id,
            budget.context_limit,
            budget.max_tokens,
            budget.reserved(),
            system_tokens,
            messages_tokens,
            total_tokens
        );

        if budget.fits(total_tokens) || all_messages.len() < self.window.min_messages_for_summary {
            if !budget.fits(total_tokens) {
                debug!(
                    "Conversation over budget ({} > {}) but only {} messages, sending as is",
                    total_tokens,
                    budget.max_tokens,
                    all_messages.len()
                );
            }

            let mut messages = Vec::with_capacity(all_messages.len() + 1);
            messages.push(system_prompt.clone());
            messages.extend_from_slice(all_messages);

            METRICS.record_preparation(OUTCOME_FIT, total_tokens);
            return ContextPreparationResult {
                messages,
                token_count: total_tokens,
                was_truncated: false,
                summary: None,
                summarized_count: 0,
                kept_count: all_messages.len(),
            };
        }

        let recent_count = self.window.keep_recent_messages.min(all_messages.len());
        let split = all_messages.len() - recent_count;
        let (old_messages, recent_messages) = all_messages.split_at(split);

        let summary = self
            .cache
            .get_or_insert_with(old_messages, || self.summarizer.summarize(old_messages));
        let summary_message = self.summary_message(&summary);

        info!(
            "Summarizing {} older messages for {}, keeping {} recent",
            old_messages.len(),
            model_id,
            recent_messages.len()
        );

        let mut messages = Vec::with_capacity(recent_messages.len() + 2);
        messages.push(system_prompt.clone());
        messages.push(summary_message);
        messages.extend_from_slice(recent_messages);

        let prepared_tokens = self.estimator.estimate_messages(&messages);

        if budget.fits(prepared_tokens) {
            METRICS.record_preparation(OUTCOME_SUMMARIZED, prepared_tokens);
            METRICS.messages_summarized.inc_by(old_messages.len() as f64);
            return ContextPreparationResult {
                messages,
                token_count: prepared_tokens,
                was_truncated: true,
                summary: Some(summary),
                summarized_count: old_messages.len(),
                kept_count: recent_messages.len(),
            };
        }

        // Summary plus every recent turn still overflows: keep the newest turns that fit.
        let header_tokens = self.estimator.estimate_messages(&messages[..2]);
        let available = budget.remaining(header_tokens);
        let kept = self.newest_that_fit(recent_messages, available);
        let trimmed_recent = &recent_messages[recent_messages.len() - kept..];
        let dropped = recent_messages.len() - kept;

        messages.truncate(2);
        messages.extend_from_slice(trimmed_recent);
        let token_count = self.estimator.estimate_messages(&messages);

        warn!(
            "Dropped {} recent messages for {}: {} tokens after summarization, {} allowed",
            dropped, model_id, prepared_tokens, budget.max_tokens
        );

        METRICS.record_preparation(OUTCOME_TRIMMED, token_count);
        METRICS.messages_summarized.inc_by(old_messages.len() as f64);
        METRICS.messages_dropped.inc_by(dropped as f64);

        ContextPreparationResult {
            messages,
            token_count,
            was_truncated: true,
            summary: Some(summary),
            summarized_count: old_messages.len() + dropped,
            kept_count: kept,
        }
    }

    /// Count of trailing messages that fit in `available`, newest first,
    /// stopping at the first message that does not fit.
    fn newest_that_fit(&self, recent: &[Message], available: usize) -> usize {
        let mut used = 0;
        let mut kept = 0;

        for message in recent.iter().rev() {
            let cost = self.estimator.estimate(&message.content) + self.estimator.message_overhead();
            if used + cost > available {
                break;
            }
            used += cost;
            kept += 1;
        }

        kept
    }

    fn summary_message(&self, summary: &str) -> Message {
        Message::system(format!("{}\n\n{}", self.window.summary_preamble, summary))
    }

    /// Prompt budget for `model_id`
    pub fn budget_for(&self, model_id: &str) -> ContextBudget {
        ContextBudget::new(self.catalog.context_limit(model_id), self.window.budget_ratio)
    }

    /// Context window size for `model_id`
    pub fn context_limit(&self, model_id: &str) -> usize {
        self.catalog.context_limit(model_id)
    }

    pub fn estimator(&self) -> &Arc<dyn TokenEstimator> {
        &self.estimator
    }

    pub fn cache(&self) -> &SummaryCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::models::Role;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSummarizer {
        calls: AtomicUsize,
    }

    impl Summarizer for CountingSummarizer {
        fn summarize(&self, messages: &[Message]) -> String {
            self.calls.fetch_add(1, Ordering::SeqCst);
            format!("Total messages summarized: {}", messages.len())
        }
    }

    fn manager() -> ContextWindowManager {
        ContextWindowManager::from_config(&Config::default()).unwrap()
    }

    fn conversation(count: usize, words_per_message: usize) -> Vec<Message> {
        (0..count)
            .map(|i| {
                let body = "lorem ".repeat(words_per_message);
                if i % 2 == 0 {
                    Message::user(format!("Tell me about topic {}. {}", i, body))
                } else {
                    Message::assistant(format!("Here is what I know about topic {}. {}", i, body))
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn test_short_conversation_fits() {
        let manager = manager();
        let system = Message::system("You are a helpful assistant.");
        let messages = conversation(3, 5);

        let result = manager
            .prepare_context_window(&system, &messages, "claude-3-opus")
            .await;

        assert!(!result.was_truncated);
        assert_eq!(result.messages.len(), 4);
        assert_eq!(result.kept_count, 3);
        assert_eq!(result.summarized_count, 0);
        assert!(result.summary.is_none());
        assert_eq!(result.messages[0], system);
    }

    #[test]
    fn test_fewer_than_minimum_never_summarized() {
        let manager = manager();
        let system = Message::system("sys");
        // 11 messages far larger than gpt-4's 8192 window
        let messages = conversation(11, 2_000);

        let result = manager.prepare(&system, &messages, "gpt-4");

        assert!(!result.was_truncated);
        assert_eq!(result.kept_count, 11);
        assert!(result.token_count > manager.budget_for("gpt-4").max_tokens);
    }

    #[test]
    fn test_summarizes_older_messages() {
        let manager = manager();
        let system = Message::system("sys");
        let messages = conversation(15, 800);

        let result = manager.prepare(&system, &messages, "gpt-3.5-turbo");

        assert!(result.was_truncated);
        assert_eq!(result.summarized_count, 5);
        assert_eq!(result.kept_count, 10);
        assert_eq!(result.messages.len(), 12);
        assert_eq!(result.messages[1].role, Role::System);
        assert_eq!(&result.messages[2..], &messages[5..]);
        assert!(result.token_count <= manager.budget_for("gpt-3.5-turbo").max_tokens);
        assert_eq!(result.token_count, manager.estimator().estimate_messages(&result.messages));
    }

    #[test]
    fn test_trims_oldest_recent_messages() {
        let manager = manager();
        let system = Message::system("sys");
        // ~2000 tokens per message; 10 recent turns cannot fit in 13108
        let messages = conversation(14, 1_500);

        let result = manager.prepare(&system, &messages, "gpt-3.5-turbo");
        let max = manager.budget_for("gpt-3.5-turbo").max_tokens;

        assert!(result.was_truncated);
        assert!(result.kept_count < 10);
        assert!(result.kept_count > 0);
        assert_eq!(result.summarized_count + result.kept_count, 14);
        assert!(result.token_count <= max);
        assert_eq!(result.messages.len(), result.kept_count + 2);
        assert_eq!(result.messages.last(), messages.last());
    }

    #[test]
    fn test_trimming_stops_at_first_oversized_message() {
        let mut config = Config::default();
        config.models.overrides.insert("small-window".to_string(), 5_000);
        let manager = ContextWindowManager::from_config(&config).unwrap();
        let system = Message::system("sys");

        let mut messages: Vec<Message> = (0..14)
            .map(|i| Message::user(format!("short question {}", i)))
            .collect();
        // second-newest alone exceeds the 4000-token prompt budget
        messages[12] = Message::user("big ".repeat(5_000));

        let result = manager.prepare(&system, &messages, "small-window");

        assert!(result.was_truncated);
        assert_eq!(result.kept_count, 1);
        assert_eq!(result.summarized_count, 13);
        assert_eq!(result.messages.len(), 3);
        assert_eq!(result.messages.last(), messages.last());
        assert!(result.token_count <= manager.budget_for("small-window").max_tokens);
    }

    #[test]
    fn test_degrades_to_no_recent_messages() {
        let manager = manager();
        let system = Message::system("sys");
        // every message alone exceeds gpt-4's 6553-token prompt budget
        let messages = conversation(12, 6_000);

        let result = manager.prepare(&system, &messages, "gpt-4");

        assert!(result.was_truncated);
        assert_eq!(result.kept_count, 0);
        assert_eq!(result.summarized_count, 12);
        assert_eq!(result.messages.len(), 2);
    }

    #[test]
    fn test_summary_cached_between_calls() {
        let summarizer = Arc::new(CountingSummarizer {
            calls: AtomicUsize::new(0),
        });
        let config = Config::default();
        let estimator = build_estimator(&config.estimator).unwrap();
        let manager = ContextWindowManager::new(&config, estimator, summarizer.clone()).unwrap();

        let system = Message::system("sys");
        let messages = conversation(15, 800);

        let first = manager.prepare(&system, &messages, "gpt-3.5-turbo");
        let second = manager.prepare(&system, &messages, "gpt-3.5-turbo");

        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.summary, second.summary);
        assert_eq!(manager.cache().stats().hits, 1);
    }

    #[test]
    fn test_unknown_model_uses_default_limit() {
        let manager = manager();
        assert_eq!(manager.context_limit("unknown-model-xyz"), 131_072);
        assert_eq!(manager.context_limit(""), 131_072);
        assert_eq!(manager.budget_for("").max_tokens, 104_857);
    }

    #[test]
    fn test_empty_conversation() {
        let manager = manager();
        let system = Message::system("sys");

        let result = manager.prepare(&system, &[], "grok-3");

        assert!(!result.was_truncated);
        assert_eq!(result.messages, vec![system]);
        assert_eq!(result.kept_count, 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.window.budget_ratio = 2.0;
        assert!(ContextWindowManager::from_config(&config).is_err());
    }
}
