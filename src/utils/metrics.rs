use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Process-wide metrics collector.
///
/// Tracks upload/query volume and AI gateway usage. Thread-safe; shared
/// across handlers behind an `Arc`.
pub struct Metrics {
    // Upload pipeline
    uploads_total: AtomicUsize,
    uploads_success: AtomicUsize,
    uploads_failed: AtomicUsize,
    upload_duration_ms: RwLock<Vec<u64>>,

    // Query operation
    queries_total: AtomicUsize,

    // AI gateway
    api_calls_total: AtomicUsize,
    api_calls_success: AtomicUsize,
    api_calls_failed: AtomicUsize,
    api_tokens_input: AtomicU64,
    api_tokens_output: AtomicU64,
    api_latency_ms: RwLock<Vec<u64>>,

    // Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            uploads_total: AtomicUsize::new(0),
            uploads_success: AtomicUsize::new(0),
            uploads_failed: AtomicUsize::new(0),
            upload_duration_ms: RwLock::new(Vec::new()),
            queries_total: AtomicUsize::new(0),
            api_calls_total: AtomicUsize::new(0),
            api_calls_success: AtomicUsize::new(0),
            api_calls_failed: AtomicUsize::new(0),
            api_tokens_input: AtomicU64::new(0),
            api_tokens_output: AtomicU64::new(0),
            api_latency_ms: RwLock::new(Vec::new()),
            start_time: Instant::now(),
        }
    }

    /// One completed upload operation, successful or not
    pub fn record_upload(&self, success: bool, duration: Duration) {
        self.uploads_total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.uploads_success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.uploads_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.upload_duration_ms
            .write()
            .push(duration.as_millis() as u64);
    }

    /// One answered query operation
    pub fn record_query(&self) {
        self.queries_total.fetch_add(1, Ordering::Relaxed);
    }

    /// One AI gateway round trip
    pub fn record_api_call(
        &self,
        success: bool,
        duration: Duration,
        input_tokens: u64,
        output_tokens: u64,
    ) {
        self.api_calls_total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.api_calls_success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.api_calls_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.api_tokens_input
            .fetch_add(input_tokens, Ordering::Relaxed);
        self.api_tokens_output
            .fetch_add(output_tokens, Ordering::Relaxed);
        self.api_latency_ms
            .write()
            .push(duration.as_millis() as u64);
    }

    // Get snapshot for reporting
    pub fn snapshot(&self) -> MetricsSnapshot {
        let api_latency = self.api_latency_ms.read();
        let api_latency_avg = avg(&api_latency);
        let api_latency_p50 = percentile(&api_latency, 0.5);
        let api_latency_p95 = percentile(&api_latency, 0.95);
        let api_latency_p99 = percentile(&api_latency, 0.99);
        drop(api_latency);

        let upload_durations = self.upload_duration_ms.read();
        let upload_duration_avg = avg(&upload_durations);
        drop(upload_durations);

        MetricsSnapshot {
            uploads_total: self.uploads_total.load(Ordering::Relaxed),
            uploads_success: self.uploads_success.load(Ordering::Relaxed),
            uploads_failed: self.uploads_failed.load(Ordering::Relaxed),
            upload_duration_avg_ms: upload_duration_avg,
            queries_total: self.queries_total.load(Ordering::Relaxed),
            api_calls_total: self.api_calls_total.load(Ordering::Relaxed),
            api_calls_success: self.api_calls_success.load(Ordering::Relaxed),
            api_calls_failed: self.api_calls_failed.load(Ordering::Relaxed),
            api_tokens_input: self.api_tokens_input.load(Ordering::Relaxed),
            api_tokens_output: self.api_tokens_output.load(Ordering::Relaxed),
            api_latency_avg_ms: api_latency_avg,
            api_latency_p50_ms: api_latency_p50,
            api_latency_p95_ms: api_latency_p95,
            api_latency_p99_ms: api_latency_p99,
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Generate Prometheus-format metrics
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        format!(
            r#"# HELP uploads_total Total number of upload operations
# TYPE uploads_total counter
uploads_total {{}} {}

# HELP uploads_success Number of successful upload operations
# TYPE uploads_success counter
uploads_success {{}} {}

# HELP uploads_failed Number of failed upload operations
# TYPE uploads_failed counter
uploads_failed {{}} {}

# HELP upload_duration_avg_ms Average upload processing time in milliseconds
# TYPE upload_duration_avg_ms gauge
upload_duration_avg_ms {{}} {}

# HELP queries_total Total number of query operations
# TYPE queries_total counter
queries_total {{}} {}

# HELP api_calls_total Total number of AI gateway calls
# TYPE api_calls_total counter
api_calls_total {{}} {}

# HELP api_calls_success Number of successful AI gateway calls
# TYPE api_calls_success counter
api_calls_success {{}} {}

# HELP api_calls_failed Number of failed AI gateway calls
# TYPE api_calls_failed counter
api_calls_failed {{}} {}

# HELP api_tokens_input_total Total input tokens consumed
# TYPE api_tokens_input_total counter
api_tokens_input_total {{}} {}

# HELP api_tokens_output_total Total output tokens generated
# TYPE api_tokens_output_total counter
api_tokens_output_total {{}} {}

# HELP api_latency_avg_ms Average AI gateway latency in milliseconds
# TYPE api_latency_avg_ms gauge
api_latency_avg_ms {{}} {}

# HELP uptime_seconds Application uptime in seconds
# TYPE uptime_seconds counter
uptime_seconds {{}} {}
"#,
            snapshot.uploads_total,
            snapshot.uploads_success,
            snapshot.uploads_failed,
            snapshot.upload_duration_avg_ms,
            snapshot.queries_total,
            snapshot.api_calls_total,
            snapshot.api_calls_success,
            snapshot.api_calls_failed,
            snapshot.api_tokens_input,
            snapshot.api_tokens_output,
            snapshot.api_latency_avg_ms,
            snapshot.uptime_seconds,
        )
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub uploads_total: usize,
    pub uploads_success: usize,
    pub uploads_failed: usize,
    pub upload_duration_avg_ms: u64,
    pub queries_total: usize,
    pub api_calls_total: usize,
    pub api_calls_success: usize,
    pub api_calls_failed: usize,
    pub api_tokens_input: u64,
    pub api_tokens_output: u64,
    pub api_latency_avg_ms: u64,
    pub api_latency_p50_ms: u64,
    pub api_latency_p95_ms: u64,
    pub api_latency_p99_ms: u64,
    pub uptime_seconds: u64,
}

fn percentile(values: &[u64], p: f64) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let idx = ((values.len() as f64 - 1.0) * p) as usize;
    sorted[idx]
}

fn avg(values: &[u64]) -> u64 {
    if values.is_empty() {
        return 0;
    }
    values.iter().sum::<u64>() / values.len() as u64
}
