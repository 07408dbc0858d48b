//! Conversation context-window management
//!
//! Estimates token usage of a chat history, summarizes older turns locally
//! when the history outgrows a model's window, and returns a message list
//! ready to forward to a chat-completion endpoint.

pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod metrics;

pub use config::Config;
pub use context::{ContextPreparationResult, ContextWindowManager, Message, Role};
pub use error::{ContextError, Result};
