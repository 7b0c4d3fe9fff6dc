//! Prometheus-compatible metrics for the kalends recovery engine.
//!
//! This module provides observability metrics for monitoring parse
//! attempts, recovery strategies, and fallback synthesis using the
//! prometheus crate.

use prometheus::{self, Histogram, HistogramOpts, IntCounter, IntGauge, Registry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Global metrics instance.
static METRICS: std::sync::OnceLock<Arc<Metrics>> = std::sync::OnceLock::new();

/// Get or initialize the global metrics instance.
pub fn get_metrics() -> Arc<Metrics> {
    METRICS.get_or_init(|| Arc::new(Metrics::new())).clone()
}

/// Default histogram buckets for latency tracking (in seconds).
/// Covers from 1ms to 10s with reasonable granularity.
fn default_latency_buckets() -> Vec<f64> {
    vec![
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ]
}

/// All metrics for the recovery engine.
pub struct Metrics {
    /// Prometheus registry for all metrics.
    pub registry: Registry,

    // =========================================================================
    // Counters
    // =========================================================================
    /// Total number of event requests processed.
    pub requests_total: IntCounter,
    /// Total number of requests rejected before any remote call.
    pub requests_rejected_total: IntCounter,
    /// Total number of remote parse faults observed.
    pub parse_errors_total: IntCounter,
    /// Total number of retry attempts recommended.
    pub retries_total: IntCounter,
    /// Total number of fallback events synthesized.
    pub fallback_events_total: IntCounter,
    /// Total number of events created in offline mode.
    pub offline_events_total: IntCounter,
    /// Total number of requests parked for a later retry.
    pub cached_requests_total: IntCounter,
    /// Total number of recoveries that produced a usable result.
    pub recoveries_total: IntCounter,
    /// Total number of terminal recovery failures.
    pub recovery_failures_total: IntCounter,
    /// Total number of events that passed sanitization.
    pub events_created_total: IntCounter,

    // =========================================================================
    // Gauges
    // =========================================================================
    /// Current number of entries in the request cache.
    pub request_cache_size: IntGauge,
    /// Uptime in seconds.
    pub uptime_seconds: IntGauge,

    // =========================================================================
    // Histograms (durations in seconds)
    // =========================================================================
    /// End-to-end pipeline duration in seconds.
    pub pipeline_duration_seconds: Histogram,
    /// Remote parse attempt duration in seconds.
    pub parse_duration_seconds: Histogram,
    /// Recovery handling duration in seconds.
    pub recovery_duration_seconds: Histogram,

    /// Engine start time.
    start_time: RwLock<Instant>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create a new metrics instance with all metrics registered.
    pub fn new() -> Self {
        let registry = Registry::new();

        // Counters
        let requests_total = IntCounter::new(
            "kalends_requests_total",
            "Total number of event requests processed",
        )
        .expect("failed to create counter");

        let requests_rejected_total = IntCounter::new(
            "kalends_requests_rejected_total",
            "Total number of requests rejected before any remote call",
        )
        .expect("failed to create counter");

        let parse_errors_total = IntCounter::new(
            "kalends_parse_errors_total",
            "Total number of remote parse faults observed",
        )
        .expect("failed to create counter");

        let retries_total = IntCounter::new(
            "kalends_retries_total",
            "Total number of retry attempts recommended",
        )
        .expect("failed to create counter");

        let fallback_events_total = IntCounter::new(
            "kalends_fallback_events_total",
            "Total number of fallback events synthesized",
        )
        .expect("failed to create counter");

        let offline_events_total = IntCounter::new(
            "kalends_offline_events_total",
            "Total number of events created in offline mode",
        )
        .expect("failed to create counter");

        let cached_requests_total = IntCounter::new(
            "kalends_cached_requests_total",
            "Total number of requests parked for a later retry",
        )
        .expect("failed to create counter");

        let recoveries_total = IntCounter::new(
            "kalends_recoveries_total",
            "Total number of recoveries that produced a usable result",
        )
        .expect("failed to create counter");

        let recovery_failures_total = IntCounter::new(
            "kalends_recovery_failures_total",
            "Total number of terminal recovery failures",
        )
        .expect("failed to create counter");

        let events_created_total = IntCounter::new(
            "kalends_events_created_total",
            "Total number of events that passed sanitization",
        )
        .expect("failed to create counter");

        // Gauges
        let request_cache_size = IntGauge::new(
            "kalends_request_cache_size",
            "Current number of entries in the request cache",
        )
        .expect("failed to create gauge");

        let uptime_seconds = IntGauge::new("kalends_uptime_seconds", "Engine uptime in seconds")
            .expect("failed to create gauge");

        // Histograms with latency buckets (in seconds)
        let pipeline_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "kalends_pipeline_duration_seconds",
                "End-to-end pipeline duration in seconds",
            )
            .buckets(default_latency_buckets()),
        )
        .expect("failed to create histogram");

        let parse_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "kalends_parse_duration_seconds",
                "Remote parse attempt duration in seconds",
            )
            .buckets(default_latency_buckets()),
        )
        .expect("failed to create histogram");

        let recovery_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "kalends_recovery_duration_seconds",
                "Recovery handling duration in seconds",
            )
            .buckets(default_latency_buckets()),
        )
        .expect("failed to create histogram");

        // Register all metrics
        registry
            .register(Box::new(requests_total.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(requests_rejected_total.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(parse_errors_total.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(retries_total.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(fallback_events_total.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(offline_events_total.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(cached_requests_total.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(recoveries_total.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(recovery_failures_total.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(events_created_total.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(request_cache_size.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(uptime_seconds.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(pipeline_duration_seconds.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(parse_duration_seconds.clone()))
            .expect("failed to register metric");
        registry
            .register(Box::new(recovery_duration_seconds.clone()))
            .expect("failed to register metric");

        Self {
            registry,
            // Counters
            requests_total,
            requests_rejected_total,
            parse_errors_total,
            retries_total,
            fallback_events_total,
            offline_events_total,
            cached_requests_total,
            recoveries_total,
            recovery_failures_total,
            events_created_total,
            // Gauges
            request_cache_size,
            uptime_seconds,
            // Histograms
            pipeline_duration_seconds,
            parse_duration_seconds,
            recovery_duration_seconds,
            // Internal state
            start_time: RwLock::new(Instant::now()),
        }
    }

    /// Update the uptime gauge.
    pub fn update_uptime(&self) {
        let uptime = self.start_time.read().elapsed();
        self.uptime_seconds.set(uptime.as_secs() as i64);
    }

    /// Export metrics in Prometheus text format.
    pub fn export_prometheus(&self) -> String {
        use prometheus::Encoder;
        self.update_uptime();

        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or_default();
        String::from_utf8(buffer).unwrap_or_default()
    }

    /// Export metrics as JSON.
    pub fn export_json(&self) -> MetricsSnapshot {
        self.update_uptime();
        MetricsSnapshot {
            counters: MetricsCounters {
                requests_total: self.requests_total.get(),
                requests_rejected_total: self.requests_rejected_total.get(),
                parse_errors_total: self.parse_errors_total.get(),
                retries_total: self.retries_total.get(),
                fallback_events_total: self.fallback_events_total.get(),
                offline_events_total: self.offline_events_total.get(),
                cached_requests_total: self.cached_requests_total.get(),
                recoveries_total: self.recoveries_total.get(),
                recovery_failures_total: self.recovery_failures_total.get(),
                events_created_total: self.events_created_total.get(),
            },
            gauges: MetricsGauges {
                request_cache_size: self.request_cache_size.get(),
                uptime_seconds: self.uptime_seconds.get(),
            },
            histograms: MetricsHistograms {
                pipeline_duration_seconds: HistogramSnapshot::from_prometheus(
                    &self.pipeline_duration_seconds,
                ),
                parse_duration_seconds: HistogramSnapshot::from_prometheus(
                    &self.parse_duration_seconds,
                ),
                recovery_duration_seconds: HistogramSnapshot::from_prometheus(
                    &self.recovery_duration_seconds,
                ),
            },
        }
    }

    /// Start a timer that records duration to a histogram when dropped.
    /// Returns a guard that will observe the duration in seconds.
    pub fn start_timer(histogram: &Histogram) -> HistogramTimer {
        HistogramTimer {
            histogram: histogram.clone(),
            start: Instant::now(),
        }
    }
}

/// Timer that records duration to a histogram when dropped.
pub struct HistogramTimer {
    histogram: Histogram,
    start: Instant,
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        self.histogram.observe(duration.as_secs_f64());
    }
}

impl HistogramTimer {
    /// Get the elapsed time without stopping the timer.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the elapsed duration.
    /// The duration is recorded in the histogram on drop.
    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }
}

/// Snapshot of all metrics for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub counters: MetricsCounters,
    pub gauges: MetricsGauges,
    pub histograms: MetricsHistograms,
}

/// Counter metrics snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsCounters {
    pub requests_total: u64,
    pub requests_rejected_total: u64,
    pub parse_errors_total: u64,
    pub retries_total: u64,
    pub fallback_events_total: u64,
    pub offline_events_total: u64,
    pub cached_requests_total: u64,
    pub recoveries_total: u64,
    pub recovery_failures_total: u64,
    pub events_created_total: u64,
}

/// Gauge metrics snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsGauges {
    pub request_cache_size: i64,
    pub uptime_seconds: i64,
}

/// Histogram metrics snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsHistograms {
    pub pipeline_duration_seconds: HistogramSnapshot,
    pub parse_duration_seconds: HistogramSnapshot,
    pub recovery_duration_seconds: HistogramSnapshot,
}

/// Snapshot of a histogram for serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistogramSnapshot {
    pub count: u64,
    pub sum: f64,
    pub mean: Option<f64>,
}

impl HistogramSnapshot {
    /// Create a snapshot from a prometheus histogram.
    pub fn from_prometheus(h: &Histogram) -> Self {
        let sample_count = h.get_sample_count();
        let sample_sum = h.get_sample_sum();
        let mean = if sample_count > 0 {
            Some(sample_sum / sample_count as f64)
        } else {
            None
        };
        Self {
            count: sample_count,
            sum: sample_sum,
            mean,
        }
    }
}
