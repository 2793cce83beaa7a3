use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::executor::{log_join_failure, RampingVusExecutor};
use crate::metrics::MetricsCollector;
use crate::scenario::{Options, LOAD_TEST_SCENARIO};
use crate::summary::{report_progress, RunSummary};
use crate::workload::SigninWorkload;

/// Run the `loadTest` scenario of `options` to completion (or until
/// `shutdown` fires) and summarize it.
pub async fn run_load_test(
    cfg: &Config,
    options: &Options,
    shutdown: CancellationToken,
) -> Result<RunSummary> {
    let scenario = options.load_test_scenario();

    let workload = Arc::new(SigninWorkload::from_config(
        cfg,
        options.discard_response_bodies,
    )?);
    info!(
        url = %workload.url(),
        executor = %scenario.executor,
        stages = ?scenario.targets(),
        total_secs = scenario.total_duration().as_secs_f64(),
        "running scenario {LOAD_TEST_SCENARIO}"
    );

    let metrics = MetricsCollector::new()?;
    let executor = RampingVusExecutor::new(workload, scenario, metrics.clone())
        .with_tick(Duration::from_millis(cfg.executor.tick_millis));

    let reporter_stop = CancellationToken::new();
    let reporter = tokio::spawn(report_progress(
        metrics,
        Duration::from_secs(cfg.executor.report_interval_seconds),
        reporter_stop.clone(),
    ));

    let snapshot = executor.run(shutdown).await;

    reporter_stop.cancel();
    log_join_failure("progress reporter", reporter.await);

    Ok(RunSummary::from_snapshot(LOAD_TEST_SCENARIO, &snapshot))
}
