//! Metrics and observability utilities
//!
//! Prometheus-style counters and histograms for index builds, index loads,
//! embedding calls, queries and gateway requests. Recording is a no-op until
//! a recorder is installed (the gateway installs the Prometheus exporter).

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use std::time::Instant;

/// Metrics prefix for all Swasya consultation metrics
pub const METRICS_PREFIX: &str = "swasya_consult";

/// Histogram buckets for query latency (in seconds)
pub const LATENCY_BUCKETS: &[f64] = &[
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s - generative answers
];

/// Buckets for embedding and index build latency
pub const EMBEDDING_BUCKETS: &[f64] = &[
    0.050,  // 50ms
    0.100,  // 100ms
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.000,  // 2s
    5.000,  // 5s
    10.00,  // 10s
    30.00,  // 30s
    120.0,  // 2m - full rebuilds
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Query metrics
    describe_counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total questions answered"
    );

    describe_histogram!(
        format!("{}_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Retrieval plus synthesis latency in seconds"
    );

    describe_gauge!(
        format!("{}_retrieved_chunks", METRICS_PREFIX),
        Unit::Count,
        "Chunks retrieved for the last question"
    );

    // Index metrics
    describe_counter!(
        format!("{}_index_builds_total", METRICS_PREFIX),
        Unit::Count,
        "Total index builds"
    );

    describe_histogram!(
        format!("{}_index_build_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Index build latency in seconds"
    );

    describe_gauge!(
        format!("{}_index_nodes", METRICS_PREFIX),
        Unit::Count,
        "Nodes in the most recently built index"
    );

    describe_counter!(
        format!("{}_index_loads_total", METRICS_PREFIX),
        Unit::Count,
        "Load-or-build outcomes by result"
    );

    // Embedding metrics
    describe_counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API requests"
    );

    describe_histogram!(
        format!("{}_embedding_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Embedding generation latency in seconds"
    );

    describe_counter!(
        format!("{}_embedding_errors_total", METRICS_PREFIX),
        Unit::Count,
        "Total embedding API errors"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record an answered question
pub fn record_query(duration_secs: f64, backend: &str, chunk_count: usize) {
    counter!(
        format!("{}_queries_total", METRICS_PREFIX),
        "backend" => backend.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_query_duration_seconds", METRICS_PREFIX),
        "backend" => backend.to_string()
    )
    .record(duration_secs);

    gauge!(format!("{}_retrieved_chunks", METRICS_PREFIX)).set(chunk_count as f64);
}

/// Helper to record embedding metrics
pub fn record_embedding(duration_secs: f64, model: &str, batch_size: usize, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_embedding_requests_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    if success {
        histogram!(
            format!("{}_embedding_duration_seconds", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .record(duration_secs);
    } else {
        counter!(
            format!("{}_embedding_errors_total", METRICS_PREFIX),
            "model" => model.to_string()
        )
        .increment(batch_size as u64);
    }
}

/// Helper to record a completed index build
pub fn record_index_build(duration_secs: f64, document_count: usize, node_count: usize) {
    counter!(format!("{}_index_builds_total", METRICS_PREFIX)).increment(1);

    histogram!(format!("{}_index_build_duration_seconds", METRICS_PREFIX)).record(duration_secs);

    gauge!(format!("{}_index_nodes", METRICS_PREFIX)).set(node_count as f64);

    tracing::debug!(document_count, node_count, duration_secs, "Index build recorded");
}

/// Helper to record whether load-or-build reused the persisted index
pub fn record_index_load(reused: bool) {
    let result = if reused { "loaded" } else { "rebuilt" };

    counter!(
        format!("{}_index_loads_total", METRICS_PREFIX),
        "result" => result.to_string()
    )
    .increment(1);
}
