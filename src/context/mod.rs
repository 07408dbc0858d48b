//! Context window management
//!
//! Sizes a conversation against a model's window and, when it does not fit,
//! replaces older messages with a locally generated summary while keeping
//! the most recent turns verbatim.

pub mod model_catalog;
pub mod models;
pub mod summarizer;
pub mod summary_cache;
pub mod token_budget;
pub mod token_estimator;
pub mod window_manager;

pub use model_catalog::{get_model_context_limit, ModelCatalog, DEFAULT_CONTEXT_LIMIT};
pub use models::{ContextPreparationResult, Message, Role};
pub use summarizer::{generate_local_summary, LocalSummarizer, Summarizer};
pub use summary_cache::{CacheKeyStrategy, CacheStats, EvictionPolicy, SummaryCache};
pub use token_budget::ContextBudget;
pub use token_estimator::{
    build_estimator, estimate_messages_tokens, estimate_tokens, EstimatorKind,
    HeuristicEstimator, TiktokenEstimator, TokenEstimator,
};
pub use window_manager::ContextWindowManager;
