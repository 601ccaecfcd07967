//! Running USD cost accounting across all model-call stages

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

/// Accumulates token usage and a running USD estimate across a matching run.
///
/// Shared via `Arc` between the profile extractor, embedding indexer and deep
/// evaluator so that one `match_job` pass reports a single combined total.
/// Cost is stored in micro-USD to keep accumulation lock-free.
#[derive(Debug, Default)]
pub struct CostTracker {
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    micro_usd: AtomicU64,
}

impl CostTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one model call's usage.
    ///
    /// Prices are USD per 1k tokens, matching provider pricing pages.
    pub fn record(
        &self,
        input_tokens: u64,
        output_tokens: u64,
        price_per_1k_input: f64,
        price_per_1k_output: f64,
    ) {
        self.input_tokens.fetch_add(input_tokens, Ordering::Relaxed);
        self.output_tokens.fetch_add(output_tokens, Ordering::Relaxed);

        let usd = (input_tokens as f64 / 1000.0) * price_per_1k_input
            + (output_tokens as f64 / 1000.0) * price_per_1k_output;
        let micro = (usd * 1_000_000.0).round() as u64;
        self.micro_usd.fetch_add(micro, Ordering::Relaxed);
    }

    /// Running USD total
    #[must_use]
    pub fn total_cost(&self) -> f64 {
        self.micro_usd.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }

    /// Total tokens seen so far as (input, output)
    #[must_use]
    pub fn total_tokens(&self) -> (u64, u64) {
        (
            self.input_tokens.load(Ordering::Relaxed),
            self.output_tokens.load(Ordering::Relaxed),
        )
    }
}
