//! Usage Metrics Collection
//!
//! Process-wide counters for model turns, token usage, cost and tool
//! activity. Passed explicitly as [`SharedMetrics`]; every counter is atomic,
//! so concurrent workers never contend on a lock.
//!
//! ```ignore
//! let metrics = create_shared_metrics(session_id);
//! metrics.record_response(&response);
//! println!("{}", metrics.summary().display());
//! ```

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use crate::ai::provider::{LlmResponse, TokenUsage};

pub struct MetricsCollector {
    session_id: String,
    start_time: Instant,
    api_calls: AtomicU32,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    total_latency_ms: AtomicU64,
    /// Stored as microdollars for atomic ops
    total_cost_micros: AtomicU64,
    file_reads: AtomicU32,
    failed_reads: AtomicU32,
    corrections: AtomicU32,
    unit_retries: AtomicU32,
}

/// Snapshot of the counters
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub session_id: String,
    pub total_duration_ms: u64,
    pub api_calls: u32,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub avg_latency_ms: f64,
    pub total_cost_usd: f64,
    pub file_reads: u32,
    pub failed_reads: u32,
    pub corrections: u32,
    pub unit_retries: u32,
}

impl MetricsCollector {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            start_time: Instant::now(),
            api_calls: AtomicU32::new(0),
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            total_cost_micros: AtomicU64::new(0),
            file_reads: AtomicU32::new(0),
            failed_reads: AtomicU32::new(0),
            corrections: AtomicU32::new(0),
            unit_retries: AtomicU32::new(0),
        }
    }

    /// Record one model turn
    pub fn record_response(&self, response: &LlmResponse) {
        self.record_tokens(&response.usage, response.cost_usd, response.timing.total_ms);
    }

    pub fn record_tokens(&self, usage: &TokenUsage, cost_usd: f64, latency_ms: u64) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
        self.input_tokens
            .fetch_add(usage.input_tokens as u64, Ordering::Relaxed);
        self.output_tokens
            .fetch_add(usage.output_tokens as u64, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(latency_ms, Ordering::Relaxed);

        let cost_micros = (cost_usd * 1_000_000.0) as u64;
        self.total_cost_micros
            .fetch_add(cost_micros, Ordering::Relaxed);
    }

    /// Record a serviced `read_file` call
    pub fn record_read(&self, found: bool) {
        if found {
            self.file_reads.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_reads.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_correction(&self) {
        self.corrections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unit_retry(&self) {
        self.unit_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary(&self) -> MetricsSummary {
        let api_calls = self.api_calls.load(Ordering::Relaxed);
        let input_tokens = self.input_tokens.load(Ordering::Relaxed);
        let output_tokens = self.output_tokens.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);
        let total_cost_micros = self.total_cost_micros.load(Ordering::Relaxed);

        let avg_latency = if api_calls > 0 {
            total_latency as f64 / api_calls as f64
        } else {
            0.0
        };

        MetricsSummary {
            session_id: self.session_id.clone(),
            total_duration_ms: self.start_time.elapsed().as_millis() as u64,
            api_calls,
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            avg_latency_ms: avg_latency,
            total_cost_usd: total_cost_micros as f64 / 1_000_000.0,
            file_reads: self.file_reads.load(Ordering::Relaxed),
            failed_reads: self.failed_reads.load(Ordering::Relaxed),
            corrections: self.corrections.load(Ordering::Relaxed),
            unit_retries: self.unit_retries.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSummary {
    /// Format summary for display
    pub fn display(&self) -> String {
        format!(
            "Session: {}\n\
             Duration: {:.1}s\n\
             Model turns: {} (avg latency {:.0}ms)\n\
             Tokens: {} (input: {}, output: {})\n\
             File reads: {} ({} failed)\n\
             Corrections: {}, unit retries: {}\n\
             Estimated Cost: ${:.4}",
            self.session_id,
            self.total_duration_ms as f64 / 1000.0,
            self.api_calls,
            self.avg_latency_ms,
            self.total_tokens,
            self.input_tokens,
            self.output_tokens,
            self.file_reads,
            self.failed_reads,
            self.corrections,
            self.unit_retries,
            self.total_cost_usd
        )
    }
}

/// Shared metrics collector for concurrent workers
pub type SharedMetrics = Arc<MetricsCollector>;

pub fn create_shared_metrics(session_id: impl Into<String>) -> SharedMetrics {
    Arc::new(MetricsCollector::new(session_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::{ResponseMetadata, ResponseTiming};

    #[test]
    fn test_record_response() {
        let metrics = MetricsCollector::new("test-session");

        let response = LlmResponse::with_metrics(
            "read_file(\"a.py\")".to_string(),
            TokenUsage {
                input_tokens: 100,
                output_tokens: 50,
            },
            0.0125,
            ResponseTiming {
                total_ms: 500,
                api_ms: None,
            },
            ResponseMetadata {
                model: "sonnet".to_string(),
                provider: "claude-code".to_string(),
            },
        );

        metrics.record_response(&response);
        metrics.record_read(true);
        metrics.record_read(false);
        metrics.record_correction();

        let summary = metrics.summary();
        assert_eq!(summary.api_calls, 1);
        assert_eq!(summary.total_tokens, 150);
        assert!((summary.total_cost_usd - 0.0125).abs() < 0.0001);
        assert_eq!(summary.file_reads, 1);
        assert_eq!(summary.failed_reads, 1);
        assert_eq!(summary.corrections, 1);
    }

    #[test]
    fn test_concurrent_recording() {
        use std::thread;

        let metrics = create_shared_metrics("concurrent-test");

        let handles: Vec<_> = (0..10)
            .map(|_| {
                let m = Arc::clone(&metrics);
                thread::spawn(move || {
                    for _ in 0..100 {
                        m.record_tokens(
                            &TokenUsage {
                                input_tokens: 10,
                                output_tokens: 5,
                            },
                            0.001,
                            50,
                        );
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let summary = metrics.summary();
        assert_eq!(summary.api_calls, 1000);
        assert_eq!(summary.input_tokens, 10000);
        assert!((summary.total_cost_usd - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_summary_display() {
        let metrics = MetricsCollector::new("display-test");
        metrics.record_unit_retry();
        let display = metrics.summary().display();
        assert!(display.contains("display-test"));
        assert!(display.contains("unit retries: 1"));
    }
}
