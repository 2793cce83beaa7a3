use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio::time::{interval, sleep, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::RampPlan;
use crate::metrics::{MetricsCollector, MetricsSnapshot};
use crate::scenario::ScenarioConfig;
use crate::workload::Workload;

/// Default controller tick.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Handle to one running VU.
struct VuHandle {
    id: u64,
    stop: CancellationToken,
}

pub struct RampingVusExecutor<W: Workload + 'static> {
    workload: Arc<W>,
    plan: RampPlan,
    graceful_ramp_down: Duration,
    tick: Duration,
    metrics: MetricsCollector,
}

impl<W: Workload + 'static> RampingVusExecutor<W> {
    pub fn new(workload: Arc<W>, scenario: &ScenarioConfig, metrics: MetricsCollector) -> Self {
        Self {
            workload,
            plan: scenario.plan(),
            graceful_ramp_down: scenario.graceful_ramp_down.as_duration(),
            tick: DEFAULT_TICK,
            metrics,
        }
    }

    pub fn from_plan(workload: Arc<W>, plan: RampPlan, metrics: MetricsCollector) -> Self {
        Self {
            workload,
            plan,
            graceful_ramp_down: Duration::ZERO,
            tick: DEFAULT_TICK,
            metrics,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick.max(Duration::from_millis(1));
        self
    }

    pub fn with_graceful_ramp_down(mut self, grace: Duration) -> Self {
        self.graceful_ramp_down = grace;
        self
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Run the whole plan. Returns early, aborting every VU, once `shutdown`
    /// is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) -> MetricsSnapshot {
        let total = self.plan.total_duration();
        info!(
            total_secs = total.as_secs_f64(),
            peak_vus = self.plan.peak(),
            grace_ms = self.graceful_ramp_down.as_millis() as u64,
            "starting ramping-vus executor"
        );

        let start = Instant::now();
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut running: Vec<VuHandle> = Vec::new();
        let mut tasks = JoinSet::new();
        let mut next_id = 1u64;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(active = running.len(), "shutdown requested, aborting VUs");
                    break;
                }
                _ = ticker.tick() => {}
            }

            let elapsed = start.elapsed();
            if elapsed >= total {
                break;
            }

            let target = self.plan.target_at(elapsed) as usize;
            if target != running.len() {
                debug!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    from = running.len(),
                    to = target,
                    "scaling VUs"
                );
            }

            while running.len() < target {
                let handle = VuHandle {
                    id: next_id,
                    stop: CancellationToken::new(),
                };
                next_id += 1;
                tasks.spawn(run_vu(
                    handle.id,
                    Arc::clone(&self.workload),
                    self.metrics.clone(),
                    handle.stop.clone(),
                    shutdown.child_token(),
                    self.graceful_ramp_down,
                ));
                running.push(handle);
            }

            // Most recently started VUs go first.
            while running.len() > target {
                if let Some(handle) = running.pop() {
                    debug!(vu = handle.id, "stopping VU");
                    handle.stop.cancel();
                }
            }

            while let Some(result) = tasks.try_join_next() {
                log_join_failure("vu", result);
            }
        }

        for handle in running.drain(..).rev() {
            handle.stop.cancel();
        }
        while let Some(result) = tasks.join_next().await {
            log_join_failure("vu", result);
        }

        let snapshot = self.metrics.snapshot();
        info!(
            iterations = snapshot.iterations_completed,
            interrupted = snapshot.iterations_interrupted,
            peak_vus = snapshot.vus_peak,
            "executor finished"
        );
        snapshot
    }
}

/// Log a task that panicked. Cancelled tasks are expected and ignored.
pub(crate) fn log_join_failure(task: &str, result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        if e.is_panic() {
            error!(task, "task panicked: {}", e);
        }
    }
}

async fn run_vu<W: Workload>(
    id: u64,
    workload: Arc<W>,
    metrics: MetricsCollector,
    stop: CancellationToken,
    abort: CancellationToken,
    grace: Duration,
) {
    metrics.vu_started();
    debug!(vu = id, "VU started");

    while !stop.is_cancelled() && !abort.is_cancelled() {
        let finished = tokio::select! {
            biased;
            _ = abort.cancelled() => false,
            _ = workload.iterate(id, &metrics) => true,
            _ = grace_expired(&stop, grace) => false,
        };

        if finished {
            metrics.iteration_completed();
        } else {
            metrics.iteration_interrupted();
            debug!(vu = id, "iteration interrupted");
            break;
        }
    }

    metrics.vu_stopped();
    debug!(vu = id, "VU stopped");
}

/// Resolves once the VU was told to stop and its grace period ran out.
async fn grace_expired(stop: &CancellationToken, grace: Duration) {
    stop.cancelled().await;
    if !grace.is_zero() {
        sleep(grace).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::IterationOutcome;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct SleepyWorkload {
        delay: Duration,
        calls: AtomicU64,
    }

    impl SleepyWorkload {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay,
                calls: AtomicU64::new(0),
            })
        }
    }

    #[async_trait]
    impl Workload for SleepyWorkload {
        async fn iterate(&self, _vu: u64, metrics: &MetricsCollector) -> IterationOutcome {
            self.calls.fetch_add(1, Ordering::Relaxed);
            sleep(self.delay).await;
            metrics.record_check("done", true);
            IterationOutcome {
                status: 200,
                check_passed: true,
                request_duration: self.delay,
                body_size: 0,
            }
        }
    }

    fn plan(stages: &[(u64, u64)]) -> RampPlan {
        RampPlan::new(
            0,
            stages
                .iter()
                .map(|&(ms, target)| (Duration::from_millis(ms), target))
                .collect(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_ramps_up_and_down_to_zero() {
        let workload = SleepyWorkload::new(Duration::from_millis(100));
        let executor = RampingVusExecutor::from_plan(
            workload.clone(),
            plan(&[(1000, 4), (1000, 4), (1000, 0)]),
            MetricsCollector::new().unwrap(),
        );

        let snapshot = executor.run(CancellationToken::new()).await;

        assert_eq!(snapshot.vus_peak, 4);
        assert_eq!(snapshot.vus_active, 0);
        assert!(snapshot.iterations_completed > 0);
        assert_eq!(
            workload.calls.load(Ordering::Relaxed),
            snapshot.iterations_completed + snapshot.iterations_interrupted
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_grace_interrupts_in_flight_iteration() {
        let workload = SleepyWorkload::new(Duration::from_secs(10));
        let executor = RampingVusExecutor::from_plan(
            workload,
            plan(&[(0, 1), (1000, 1), (1000, 0)]),
            MetricsCollector::new().unwrap(),
        );

        let started = Instant::now();
        let snapshot = executor.run(CancellationToken::new()).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(snapshot.iterations_completed, 0);
        assert_eq!(snapshot.iterations_interrupted, 1);
        assert_eq!(snapshot.vus_active, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_grace_period_lets_iteration_finish() {
        let workload = SleepyWorkload::new(Duration::from_millis(1000));
        let executor = RampingVusExecutor::from_plan(
            workload,
            plan(&[(0, 1), (1000, 1), (1000, 0)]),
            MetricsCollector::new().unwrap(),
        )
        .with_graceful_ramp_down(Duration::from_secs(5));

        let snapshot = executor.run(CancellationToken::new()).await;

        assert_eq!(snapshot.iterations_interrupted, 0);
        assert!(snapshot.iterations_completed >= 2);
        assert_eq!(snapshot.vus_active, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_target() {
        let workload = SleepyWorkload::new(Duration::from_millis(50));
        let metrics = MetricsCollector::new().unwrap();
        let executor = RampingVusExecutor::from_plan(
            workload,
            plan(&[(500, 3), (500, 3), (500, 0)]),
            metrics,
        )
        .with_tick(Duration::from_millis(10));

        let snapshot = executor.run(CancellationToken::new()).await;
        assert_eq!(snapshot.vus_peak, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_aborts_run() {
        let workload = SleepyWorkload::new(Duration::from_secs(1));
        let executor = RampingVusExecutor::from_plan(
            workload,
            plan(&[(0, 2), (3_600_000, 2)]),
            MetricsCollector::new().unwrap(),
        );

        let shutdown = CancellationToken::new();
        let trigger = shutdown.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(2500)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let snapshot = executor.run(shutdown).await;

        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(snapshot.vus_active, 0);
        assert_eq!(snapshot.iterations_interrupted, 2);
        assert_eq!(snapshot.iterations_completed, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_config_uses_zero_grace() {
        let params = crate::env::EnvParams::from_env(&[
            (crate::env::TARGET_VUS, "2"),
            (crate::env::RAMPUP_DURATION, "1s"),
            (crate::env::SUSTAINED_DURATION, "1s"),
            (crate::env::RAMPDOWN_DURATION, "1s"),
        ]);
        let scenario = ScenarioConfig::ramping(&params);
        let executor = RampingVusExecutor::new(
            SleepyWorkload::new(Duration::from_millis(200)),
            &scenario,
            MetricsCollector::new().unwrap(),
        );

        assert_eq!(executor.graceful_ramp_down, Duration::ZERO);
        let snapshot = executor.run(CancellationToken::new()).await;
        assert_eq!(snapshot.vus_peak, 2);
        assert_eq!(snapshot.vus_active, 0);
        assert_eq!(executor.metrics().check_counts("done").fails, 0);
    }

    #[tokio::test]
    async fn test_join_failures_are_logged_not_propagated() {
        let panicked = tokio::spawn(async { panic!("reporter blew up") }).await;
        assert!(panicked.as_ref().is_err_and(|e| e.is_panic()));
        log_join_failure("progress reporter", panicked);

        let handle = tokio::spawn(std::future::pending::<()>());
        handle.abort();
        let cancelled = handle.await;
        assert!(cancelled.as_ref().is_err_and(|e| e.is_cancelled()));
        log_join_failure("vu", cancelled);
    }
}
