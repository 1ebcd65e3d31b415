//! Metrics collection for prefab serialization
//!
//! Prometheus counters and histograms registered in a crate-private registry
//! and served as text at `GET /metrics`.

use crate::core::error::Result;
use once_cell::sync::Lazy;
use prometheus::{
    register_histogram_with_registry, register_int_counter_with_registry, Histogram, IntCounter,
    Registry,
};
use std::time::Instant;

/// Global metrics registry
static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Counters for prefab operations
pub struct PrefabMetrics {
    /// Prefabs written successfully
    pub prefabs_created: IntCounter,
    /// Prefab creations that failed and were rolled back
    pub prefabs_failed: IntCounter,
    /// Document entries emitted, header included
    pub entries_emitted: IntCounter,
    /// References written as `null` because they pointed outside the prefab
    pub unresolved_references: IntCounter,
    /// Documents validated
    pub validations: IntCounter,
}

/// Durations of the serialization phases
pub struct PerformanceMetrics {
    /// Time spent reading the live scene, in seconds
    pub snapshot_duration: Histogram,
    /// Time spent flattening and assembling the document, in seconds
    pub serialization_duration: Histogram,
}

/// All metrics of the process
pub struct Metrics {
    /// Prefab operation counters
    pub prefab: PrefabMetrics,
    /// Phase durations
    pub performance: PerformanceMetrics,
}

impl Metrics {
    /// Create and register a metrics set
    fn new() -> Result<Self> {
        Ok(Self {
            prefab: PrefabMetrics::new()?,
            performance: PerformanceMetrics::new()?,
        })
    }

    /// Get the global metrics instance
    pub fn global() -> &'static Metrics {
        static INSTANCE: Lazy<Metrics> =
            Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
        &INSTANCE
    }
}

impl PrefabMetrics {
    fn new() -> Result<Self> {
        Ok(Self {
            prefabs_created: register_int_counter_with_registry!(
                "sp_prefabs_created_total",
                "Total number of prefabs written",
                REGISTRY
            )?,
            prefabs_failed: register_int_counter_with_registry!(
                "sp_prefabs_failed_total",
                "Total number of failed prefab creations",
                REGISTRY
            )?,
            entries_emitted: register_int_counter_with_registry!(
                "sp_entries_emitted_total",
                "Total number of document entries emitted",
                REGISTRY
            )?,
            unresolved_references: register_int_counter_with_registry!(
                "sp_unresolved_references_total",
                "Total number of references written as null",
                REGISTRY
            )?,
            validations: register_int_counter_with_registry!(
                "sp_validations_total",
                "Total number of documents validated",
                REGISTRY
            )?,
        })
    }
}

impl PerformanceMetrics {
    fn new() -> Result<Self> {
        Ok(Self {
            snapshot_duration: register_histogram_with_registry!(
                "sp_snapshot_duration_seconds",
                "Duration of live scene snapshots in seconds",
                vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0],
                REGISTRY
            )?,
            serialization_duration: register_histogram_with_registry!(
                "sp_serialization_duration_seconds",
                "Duration of document flattening and assembly in seconds",
                vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5],
                REGISTRY
            )?,
        })
    }
}

/// Timer for measuring operation duration with automatic histogram recording
pub struct Timer {
    start: Instant,
    histogram: Histogram,
}

impl Timer {
    /// Start a new timer
    pub fn start(histogram: &Histogram) -> Self {
        Self {
            start: Instant::now(),
            histogram: histogram.clone(),
        }
    }

    /// Record the elapsed time and consume the timer
    pub fn finish(self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

/// Time an expression and record its duration in a histogram
#[macro_export]
macro_rules! time_operation {
    ($metric:expr, $body:expr) => {{
        let timer = $crate::system::metrics::Timer::start(&$metric);
        let result = $body;
        timer.finish();
        result
    }};
}

/// Register all metrics. Call once during startup.
pub fn init_registry() {
    let _ = Metrics::global();
}

/// The registry holding every metric of the process
pub fn registry() -> &'static Registry {
    &REGISTRY
}

/// All metrics in Prometheus text format
pub fn collect_metrics() -> String {
    let encoder = prometheus::TextEncoder::new();
    let metric_families = registry().gather();
    encoder.encode_to_string(&metric_families).unwrap_or_default()
}
