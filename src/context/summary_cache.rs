//! Bounded memo of generated summaries
//!
//! Keys are derived from the slice of messages being summarized. The default
//! boundary fingerprint (count plus the first and last 50 characters) can
//! collide for different slices that share boundaries; `ContentHash` hashes
//! every role and content instead.

use super::models::Message;
use crate::config::SummaryCacheConfig;
use crate::metrics::METRICS;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::{Mutex, MutexGuard};
use tracing::trace;

const BOUNDARY_PREFIX_CHARS: usize = 50;

/// Which entry goes when the cache is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Oldest inserted entry, hits do not refresh
    #[default]
    Fifo,
    /// Least recently read or written entry
    Lru,
}

/// How a message slice is fingerprinted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKeyStrategy {
    #[default]
    Boundary,
    ContentHash,
}

impl CacheKeyStrategy {
    pub fn key_for(&self, messages: &[Message]) -> String {
        match self {
            CacheKeyStrategy::Boundary => boundary_key(messages),
            CacheKeyStrategy::ContentHash => content_hash_key(messages),
        }
    }
}

fn boundary_key(messages: &[Message]) -> String {
    let first: String = messages
        .first()
        .map(|m| m.content.chars().take(BOUNDARY_PREFIX_CHARS).collect())
        .unwrap_or_default();
    let last: String = messages
        .last()
        .map(|m| {
            let count = m.content.chars().count();
            m.content
                .chars()
                .skip(count.saturating_sub(BOUNDARY_PREFIX_CHARS))
                .collect()
        })
        .unwrap_or_default();

    format!("{}:{}:{}", messages.len(), first, last)
}

fn content_hash_key(messages: &[Message]) -> String {
    let mut hasher = Sha256::new();
    for message in messages {
        hasher.update(message.role.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(message.content.as_bytes());
        hasher.update([0u8]);
    }
    format!("{}:{}", messages.len(), hex::encode(hasher.finalize()))
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

struct CacheState {
    entries: IndexMap<String, String>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

/// Thread-safe summary cache with bounded capacity
pub struct SummaryCache {
    state: Mutex<CacheState>,
    capacity: usize,
    eviction: EvictionPolicy,
    key_strategy: CacheKeyStrategy,
}

impl SummaryCache {
    pub fn new(config: &SummaryCacheConfig) -> Self {
        Self {
            state: Mutex::new(CacheState {
                entries: IndexMap::with_capacity(config.capacity),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
            capacity: config.capacity.max(1),
            eviction: config.eviction,
            key_strategy: config.key,
        }
    }

    pub fn key_for(&self, messages: &[Message]) -> String {
        self.key_strategy.key_for(messages)
    }

    /// Return the cached summary for `messages`, or compute and store it
    pub fn get_or_insert_with<F>(&self, messages: &[Message], compute: F) -> String
    where
        F: FnOnce() -> String,
    {
        let key = self.key_for(messages);

        if let Some(summary) = self.get(&key) {
            return summary;
        }

        let summary = compute();
        self.insert(key, summary.clone());
        summary
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let mut state = self.lock();

        let found = match self.eviction {
            EvictionPolicy::Fifo => state.entries.get(key).cloned(),
            EvictionPolicy::Lru => match state.entries.shift_remove(key) {
                Some(summary) => {
                    state.entries.insert(key.to_string(), summary.clone());
                    Some(summary)
                }
                None => None,
            },
        };

        match found {
            Some(summary) => {
                state.hits += 1;
                METRICS.summary_cache_hits.inc();
                trace!("Summary cache hit");
                Some(summary)
            }
            None => {
                state.misses += 1;
                METRICS.summary_cache_misses.inc();
                None
            }
        }
    }

    pub fn insert(&self, key: String, summary: String) {
        let mut state = self.lock();

        if self.eviction == EvictionPolicy::Lru {
            state.entries.shift_remove(&key);
        }
        state.entries.insert(key, summary);

        while state.entries.len() > self.capacity {
            state.entries.shift_remove_index(0);
            state.evictions += 1;
            METRICS.summary_cache_evictions.inc();
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, messages: &[Message]) -> bool {
        let key = self.key_for(messages);
        self.lock().entries.contains_key(&key)
    }

    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.lock();
        CacheStats {
            entries: state.entries.len(),
            capacity: self.capacity,
            hits: state.hits,
            misses: state.misses,
            evictions: state.evictions,
        }
    }

    // The state holds no invariants a panicking writer could break halfway.
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SummaryCache {
    fn default() -> Self {
        Self::new(&SummaryCacheConfig::default())
    }
}
