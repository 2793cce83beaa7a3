//! Metrics collector shared by every VU of a run.

use hdrhistogram::Histogram;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Result;

/// Upper bound for recorded request durations (10 minutes, in microseconds).
const MAX_TRACKED_MICROS: u64 = 600_000_000;

/// Pass/fail tally for one named check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckCounts {
    pub passes: u64,
    pub fails: u64,
}

impl CheckCounts {
    pub fn total(&self) -> u64 {
        self.passes + self.fails
    }

    pub fn pass_rate(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        self.passes as f64 / self.total() as f64
    }
}

#[derive(Debug, Clone, Default)]
struct Counters {
    checks: BTreeMap<String, CheckCounts>,
    iterations_completed: u64,
    iterations_interrupted: u64,
    http_reqs: u64,
    http_reqs_failed: u64,
    vus_active: u64,
    vus_peak: u64,
}

/// Latency distribution of HTTP requests, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencyStats {
    pub min: f64,
    pub mean: f64,
    pub p50: f64,
    pub p90: f64,
    pub p95: f64,
    pub max: f64,
    pub count: u64,
}

/// Consistent copy of all counters at one point in time.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub checks: BTreeMap<String, CheckCounts>,
    pub iterations_completed: u64,
    pub iterations_interrupted: u64,
    pub http_reqs: u64,
    pub http_reqs_failed: u64,
    pub vus_active: u64,
    pub vus_peak: u64,
    pub http_req_duration: LatencyStats,
    pub elapsed: Duration,
}

#[derive(Clone)]
pub struct MetricsCollector {
    counters: Arc<RwLock<Counters>>,
    request_durations: Arc<Mutex<Histogram<u64>>>,
    start_time: Instant,
}

impl MetricsCollector {
    pub fn new() -> Result<Self> {
        // 3 significant digits keeps percentile error under 0.1%.
        let histogram = Histogram::new_with_bounds(1, MAX_TRACKED_MICROS, 3)?;

        Ok(Self {
            counters: Arc::new(RwLock::new(Counters::default())),
            request_durations: Arc::new(Mutex::new(histogram)),
            start_time: Instant::now(),
        })
    }

    pub fn record_check(&self, name: &str, passed: bool) {
        let mut counters = self.counters.write();
        let entry = counters.checks.entry(name.to_string()).or_default();
        if passed {
            entry.passes += 1;
        } else {
            entry.fails += 1;
        }
    }

    /// Record one HTTP request. Status 0 stands for a transport failure.
    pub fn record_request(&self, duration: Duration, status: u16) {
        {
            let mut counters = self.counters.write();
            counters.http_reqs += 1;
            if status == 0 || status >= 400 {
                counters.http_reqs_failed += 1;
            }
        }

        let micros = (duration.as_micros() as u64).clamp(1, MAX_TRACKED_MICROS);
        let _ = self.request_durations.lock().record(micros);
    }

    pub fn iteration_completed(&self) {
        self.counters.write().iterations_completed += 1;
    }

    pub fn iteration_interrupted(&self) {
        self.counters.write().iterations_interrupted += 1;
    }

    pub fn vu_started(&self) {
        let mut counters = self.counters.write();
        counters.vus_active += 1;
        counters.vus_peak = counters.vus_peak.max(counters.vus_active);
    }

    pub fn vu_stopped(&self) {
        let mut counters = self.counters.write();
        counters.vus_active = counters.vus_active.saturating_sub(1);
    }

    pub fn check_counts(&self, name: &str) -> CheckCounts {
        self.counters
            .read()
            .checks
            .get(name)
            .copied()
            .unwrap_or_default()
    }

    pub fn request_latency(&self) -> LatencyStats {
        let hist = self.request_durations.lock();
        if hist.is_empty() {
            return LatencyStats::default();
        }

        let to_ms = |micros: u64| micros as f64 / 1000.0;
        LatencyStats {
            min: to_ms(hist.min()),
            mean: hist.mean() / 1000.0,
            p50: to_ms(hist.value_at_quantile(0.50)),
            p90: to_ms(hist.value_at_quantile(0.90)),
            p95: to_ms(hist.value_at_quantile(0.95)),
            max: to_ms(hist.max()),
            count: hist.len(),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let counters = self.counters.read().clone();
        MetricsSnapshot {
            checks: counters.checks,
            iterations_completed: counters.iterations_completed,
            iterations_interrupted: counters.iterations_interrupted,
            http_reqs: counters.http_reqs,
            http_reqs_failed: counters.http_reqs_failed,
            vus_active: counters.vus_active,
            vus_peak: counters.vus_peak,
            http_req_duration: self.request_latency(),
            elapsed: self.start_time.elapsed(),
        }
    }
}
