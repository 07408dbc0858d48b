//! Model id → context window size lookup

use crate::config::ModelsConfig;
use std::collections::HashMap;

/// Window size assumed for model ids missing from the catalog
pub const DEFAULT_CONTEXT_LIMIT: usize = 131_072;

/// Compiled-in context window sizes, in tokens
pub const MODEL_CONTEXT_WINDOWS: &[(&str, usize)] = &[
    // xAI
    ("grok-4", 256_000),
    ("grok-3", 131_072),
    ("grok-3-mini", 131_072),
    ("grok-3-fast", 131_072),
    ("grok-2", 131_072),
    ("grok-2-latest", 131_072),
    ("grok-beta", 131_072),
    // Google
    ("gemini-2.5-pro", 1_048_576),
    ("gemini-2.5-flash", 1_048_576),
    ("gemini-2.0-flash", 1_048_576),
    ("gemini-1.5-pro", 2_097_152),
    ("gemini-1.5-flash", 1_048_576),
    ("google/gemini-2.5-pro", 1_048_576),
    ("google/gemini-2.5-flash", 1_048_576),
    // OpenAI
    ("gpt-4", 8_192),
    ("gpt-4-turbo", 128_000),
    ("gpt-4o", 128_000),
    ("gpt-4o-mini", 128_000),
    ("gpt-3.5-turbo", 16_385),
    // Anthropic
    ("claude-3-opus", 200_000),
    ("claude-3-sonnet", 200_000),
    ("claude-3-haiku", 200_000),
    ("claude-3-5-sonnet", 200_000),
];

/// Static lookup table with optional configured overrides
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    context_windows: HashMap<String, usize>,
    default_limit: usize,
}

impl ModelCatalog {
    pub fn new(config: &ModelsConfig) -> Self {
        let mut context_windows: HashMap<String, usize> = MODEL_CONTEXT_WINDOWS
            .iter()
            .map(|(model, size)| (model.to_string(), *size))
            .collect();
        context_windows.extend(
            config
                .overrides
                .iter()
                .map(|(model, size)| (model.clone(), *size)),
        );

        Self {
            context_windows,
            default_limit: config.default_context_limit,
        }
    }

    /// Context window for `model_id`, or the default for unknown ids
    pub fn context_limit(&self, model_id: &str) -> usize {
        self.context_windows
            .get(model_id)
            .copied()
            .unwrap_or(self.default_limit)
    }

    pub fn is_known(&self, model_id: &str) -> bool {
        self.context_windows.contains_key(model_id)
    }

    pub fn default_limit(&self) -> usize {
        self.default_limit
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self::new(&ModelsConfig::default())
    }
}

/// Context window for `model_id` from the built-in table
pub fn get_model_context_limit(model_id: &str) -> usize {
    MODEL_CONTEXT_WINDOWS
        .iter()
        .find(|(model, _)| *model == model_id)
        .map(|(_, size)| *size)
        .unwrap_or(DEFAULT_CONTEXT_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_models() {
        assert_eq!(get_model_context_limit("grok-3"), 131_072);
        assert_eq!(get_model_context_limit("claude-3-opus"), 200_000);
        assert_eq!(get_model_context_limit("gpt-3.5-turbo"), 16_385);
    }

    #[test]
    fn test_unknown_and_empty_ids_use_default() {
        assert_eq!(get_model_context_limit("unknown-model-xyz"), 131_072);
        assert_eq!(get_model_context_limit(""), 131_072);
    }

    #[test]
    fn test_overrides_extend_and_replace() {
        let mut config = ModelsConfig::default();
        config.overrides.insert("local-llama".to_string(), 4_096);
        config.overrides.insert("gpt-4".to_string(), 32_768);
        config.default_context_limit = 8_000;

        let catalog = ModelCatalog::new(&config);
        assert_eq!(catalog.context_limit("local-llama"), 4_096);
        assert_eq!(catalog.context_limit("gpt-4"), 32_768);
        assert_eq!(catalog.context_limit("claude-3-opus"), 200_000);
        assert_eq!(catalog.context_limit("mystery"), 8_000);
        assert!(!catalog.is_known("mystery"));
    }
}
