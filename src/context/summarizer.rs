//! Rule-based summarization of older conversation turns
//!
//! No model is called: the digest is assembled from the user's opening
//! request, the topics of each user turn and the lead sentence of each
//! assistant turn.

use super::models::{Message, Role};
use super::token_estimator::{HeuristicEstimator, TokenEstimator};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::debug;

static FIRST_SENTENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^.!?]*[.!?]").unwrap());

const ELLIPSIS: &str = "...";
const ANCHOR_MIN_CHARS: usize = 20;
const ANCHOR_MAX_CHARS: usize = 200;
const TOPIC_SENTENCE_MAX_CHARS: usize = 100;
const TOPIC_LINE_MAX_CHARS: usize = 80;
const KEY_POINT_MIN_CHARS: usize = 15;
const KEY_POINT_MAX_CHARS: usize = 120;
const MAX_TOPICS: usize = 8;
const MAX_KEY_POINTS: usize = 6;

/// Summarizer trait for different summarization strategies
pub trait Summarizer: Send + Sync {
    /// Condense `messages` into a short digest; never empty for a non-empty slice
    fn summarize(&self, messages: &[Message]) -> String;
}

/// Deterministic, model-free summarizer
pub struct LocalSummarizer {
    estimator: Arc<dyn TokenEstimator>,
    max_tokens: usize,
    tokens_per_word: f64,
}

impl LocalSummarizer {
    pub fn new(estimator: Arc<dyn TokenEstimator>, max_tokens: usize, tokens_per_word: f64) -> Self {
        Self {
            estimator,
            max_tokens,
            tokens_per_word,
        }
    }

    fn cap(&self, summary: String) -> String {
        if self.estimator.estimate(&summary) <= self.max_tokens {
            return summary;
        }

        let max_words = (self.max_tokens as f64 / self.tokens_per_word).floor() as usize;
        let words: Vec<&str> = summary.split_whitespace().take(max_words).collect();
        debug!(
            "Summary over {} tokens, truncated to {} words",
            self.max_tokens,
            words.len()
        );
        format!("{}{}", words.join(" "), ELLIPSIS)
    }
}

impl Default for LocalSummarizer {
    fn default() -> Self {
        let estimator = HeuristicEstimator::default();
        let tokens_per_word = estimator.tokens_per_word();
        Self::new(Arc::new(estimator), 600, tokens_per_word)
    }
}

impl Summarizer for LocalSummarizer {
    fn summarize(&self, messages: &[Message]) -> String {
        let mut anchor: Option<String> = None;
        let mut topics: Vec<String> = Vec::new();
        let mut key_points: Vec<String> = Vec::new();

        for message in messages {
            match message.role {
                Role::User => {
                    let trimmed = message.content.trim();
                    if anchor.is_none() && trimmed.chars().count() > ANCHOR_MIN_CHARS {
                        anchor = Some(truncate_chars(trimmed, ANCHOR_MAX_CHARS));
                    }
                    if let Some(topic) = extract_topic(trimmed) {
                        if !topics.contains(&topic) {
                            topics.push(topic);
                        }
                    }
                }
                Role::Assistant => {
                    if let Some(point) = extract_key_point(&message.content) {
                        key_points.push(point);
                    }
                }
                Role::System => {}
            }
        }

        let mut sections = Vec::new();

        if let Some(anchor) = anchor {
            sections.push(format!("User's initial request: \"{}\"", anchor));
        }

        if !topics.is_empty() {
            let shown: Vec<&str> = topics.iter().take(MAX_TOPICS).map(String::as_str).collect();
            sections.push(format!("Topics discussed: {}", shown.join(", ")));
        }

        if !key_points.is_empty() {
            let bullets: Vec<String> = key_points
                .iter()
                .take(MAX_KEY_POINTS)
                .map(|p| format!("- {}", p))
                .collect();
            sections.push(format!("Key points covered:\n{}", bullets.join("\n")));
        }

        sections.push(format!("Total messages summarized: {}", messages.len()));

        self.cap(sections.join("\n\n"))
    }
}

/// First sentence if short, else first line, else a clipped first line
fn extract_topic(content: &str) -> Option<String> {
    if content.is_empty() {
        return None;
    }

    if let Some(sentence) = FIRST_SENTENCE.find(content) {
        let sentence = sentence.as_str().trim();
        if !sentence.is_empty() && sentence.chars().count() <= TOPIC_SENTENCE_MAX_CHARS {
            return Some(sentence.to_string());
        }
    }

    let first_line = content.lines().next().unwrap_or_default().trim();
    if first_line.is_empty() {
        return None;
    }
    Some(truncate_chars(first_line, TOPIC_LINE_MAX_CHARS))
}

/// Lead sentence of an assistant reply, skipping short fragments
fn extract_key_point(content: &str) -> Option<String> {
    content
        .split(['.', '!', '?'])
        .map(str::trim)
        .find(|fragment| fragment.chars().count() > KEY_POINT_MIN_CHARS)
        .map(|sentence| truncate_chars(sentence, KEY_POINT_MAX_CHARS))
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let clipped: String = text.chars().take(max_chars).collect();
    format!("{}{}", clipped, ELLIPSIS)
}

/// Summarize with default settings
pub fn generate_local_summary(messages: &[Message]) -> String {
    LocalSummarizer::default().summarize(messages)
}
