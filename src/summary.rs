//! End-of-run report and periodic progress logging.

use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::Result;
use crate::metrics::{MetricsCollector, MetricsSnapshot};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckSummary {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
    pub pass_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationSummary {
    pub min_ms: f64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub max_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub scenario: String,
    pub duration_secs: f64,
    pub iterations: u64,
    pub iterations_interrupted: u64,
    pub iterations_per_sec: f64,
    pub vus_max: u64,
    pub checks: Vec<CheckSummary>,
    pub http_reqs: u64,
    pub http_reqs_failed: u64,
    pub http_req_failed_rate: f64,
    pub http_req_duration: DurationSummary,
}

impl RunSummary {
    pub fn from_snapshot(scenario: &str, snapshot: &MetricsSnapshot) -> Self {
        let secs = snapshot.elapsed.as_secs_f64();
        let latency = &snapshot.http_req_duration;

        Self {
            scenario: scenario.to_string(),
            duration_secs: secs,
            iterations: snapshot.iterations_completed,
            iterations_interrupted: snapshot.iterations_interrupted,
            iterations_per_sec: if secs > 0.0 {
                snapshot.iterations_completed as f64 / secs
            } else {
                0.0
            },
            vus_max: snapshot.vus_peak,
            checks: snapshot
                .checks
                .iter()
                .map(|(name, counts)| CheckSummary {
                    name: name.clone(),
                    passes: counts.passes,
                    fails: counts.fails,
                    pass_rate: counts.pass_rate(),
                })
                .collect(),
            http_reqs: snapshot.http_reqs,
            http_reqs_failed: snapshot.http_reqs_failed,
            http_req_failed_rate: if snapshot.http_reqs > 0 {
                snapshot.http_reqs_failed as f64 / snapshot.http_reqs as f64
            } else {
                0.0
            },
            http_req_duration: DurationSummary {
                min_ms: latency.min,
                mean_ms: latency.mean,
                p50_ms: latency.p50,
                p90_ms: latency.p90,
                p95_ms: latency.p95,
                max_ms: latency.max,
            },
        }
    }

    pub fn check(&self, name: &str) -> Option<&CheckSummary> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// Plain-text report for the terminal.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "scenario: {}", self.scenario);
        let _ = writeln!(out);

        for check in &self.checks {
            let mark = if check.fails == 0 { "✓" } else { "✗" };
            let _ = writeln!(out, "  {mark} {}", check.name);
            if check.fails > 0 {
                let _ = writeln!(
                    out,
                    "    ↳ {:.0}% ✓ {} / ✗ {}",
                    check.pass_rate * 100.0,
                    check.passes,
                    check.fails
                );
            }
        }
        if !self.checks.is_empty() {
            let _ = writeln!(out);
        }

        let d = &self.http_req_duration;
        let _ = writeln!(
            out,
            "  http_req_duration.......: avg={:.2}ms min={:.2}ms med={:.2}ms max={:.2}ms p(90)={:.2}ms p(95)={:.2}ms",
            d.mean_ms, d.min_ms, d.p50_ms, d.max_ms, d.p90_ms, d.p95_ms
        );
        let _ = writeln!(
            out,
            "  http_req_failed.........: {:.2}% ({} of {})",
            self.http_req_failed_rate * 100.0,
            self.http_reqs_failed,
            self.http_reqs
        );
        let _ = writeln!(out, "  http_reqs...............: {}", self.http_reqs);
        let _ = writeln!(
            out,
            "  iterations..............: {} ({:.2}/s), {} interrupted",
            self.iterations, self.iterations_per_sec, self.iterations_interrupted
        );
        let _ = writeln!(out, "  vus_max.................: {}", self.vus_max);
        let _ = writeln!(out, "  duration................: {:.1}s", self.duration_secs);
        out
    }

    pub async fn write_json(&self, path: &Path) -> Result<()> {
        let body = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, body).await?;
        info!(path = %path.display(), "summary exported");
        Ok(())
    }
}

/// Log a progress line every `every` until `stop` is cancelled.
pub async fn report_progress(metrics: MetricsCollector, every: Duration, stop: CancellationToken) {
    if every.is_zero() {
        return;
    }

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // First tick fires immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {
                let snapshot = metrics.snapshot();
                let (passes, fails) = snapshot
                    .checks
                    .values()
                    .fold((0, 0), |(p, f), c| (p + c.passes, f + c.fails));
                info!(
                    elapsed_secs = snapshot.elapsed.as_secs(),
                    vus = snapshot.vus_active,
                    iterations = snapshot.iterations_completed,
                    http_reqs = snapshot.http_reqs,
                    checks_passed = passes,
                    checks_failed = fails,
                    "progress"
                );
            }
        }
    }
}
