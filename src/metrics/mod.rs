//! Metrics collection for observability

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec_with_registry, register_counter_with_registry,
    register_histogram_with_registry, Counter, CounterVec, Encoder, Histogram, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Global metrics registry
pub static METRICS: Lazy<Arc<ContextMetrics>> = Lazy::new(|| {
    Arc::new(ContextMetrics::new().expect("Failed to initialize metrics"))
});

/// Metrics collector
pub struct ContextMetrics {
    registry: Registry,

    // Preparation metrics
    pub preparations: CounterVec,
    pub prepared_tokens: Histogram,
    pub messages_summarized: Counter,
    pub messages_dropped: Counter,

    // Summary cache metrics
    pub summary_cache_hits: Counter,
    pub summary_cache_misses: Counter,
    pub summary_cache_evictions: Counter,
}

impl ContextMetrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let preparations = register_counter_vec_with_registry!(
            Opts::new(
                "context_preparations_total",
                "Context window preparations by outcome"
            ),
            &["outcome"],
            registry
        )?;

        let prepared_tokens = register_histogram_with_registry!(
            "context_prepared_tokens",
            "Estimated tokens of each prepared message list",
            vec![256.0, 1024.0, 4096.0, 16384.0, 65536.0, 131072.0, 262144.0, 1048576.0],
            registry
        )?;

        let messages_summarized = register_counter_with_registry!(
            Opts::new(
                "context_messages_summarized_total",
                "Conversation messages replaced by a summary"
            ),
            registry
        )?;

        let messages_dropped = register_counter_with_registry!(
            Opts::new(
                "context_messages_dropped_total",
                "Recent messages dropped because summary plus recent turns overflowed"
            ),
            registry
        )?;

        let summary_cache_hits = register_counter_with_registry!(
            Opts::new("summary_cache_hits_total", "Summary cache hits"),
            registry
        )?;

        let summary_cache_misses = register_counter_with_registry!(
            Opts::new("summary_cache_misses_total", "Summary cache misses"),
            registry
        )?;

        let summary_cache_evictions = register_counter_with_registry!(
            Opts::new("summary_cache_evictions_total", "Summary cache evictions"),
            registry
        )?;

        Ok(Self {
            registry,
            preparations,
            prepared_tokens,
            messages_summarized,
            messages_dropped,
            summary_cache_hits,
            summary_cache_misses,
            summary_cache_evictions,
        })
    }

    /// Record one preparation outcome
    pub fn record_preparation(&self, outcome: &str, tokens: usize) {
        self.preparations.with_label_values(&[outcome]).inc();
        self.prepared_tokens.observe(tokens as f64);
    }

    /// Get the registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text format
    pub fn gather_text(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        if encoder.encode(&metric_families, &mut buffer).is_err() {
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}
