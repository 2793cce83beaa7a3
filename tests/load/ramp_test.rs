#![cfg(test)]
//! Full ramp profile against a local mock of the sign-in page.
//!
//! Verifies that the runner:
//! - reaches the configured VU target during the sustain stage
//! - keeps the 0.5s pause per iteration, which bounds throughput
//! - records slow or failing responses as failed checks without stopping

use std::time::{Duration, Instant};

use signin_loadtest::config::Config;
use signin_loadtest::env::{
    EnvParams, RAMPDOWN_DURATION, RAMPUP_DURATION, SUSTAINED_DURATION, TARGET_VUS,
};
use signin_loadtest::runner::run_load_test;
use signin_loadtest::scenario::Options;
use signin_loadtest::workload::STATUS_CHECK;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> Config {
    let mut cfg = Config::default();
    cfg.target.url = format!("{}/signin", server.uri());
    cfg.executor.report_interval_seconds = 1;
    cfg
}

/// Test: 50 VUs over a 2s/5s/2s profile
///
/// With a 0.5s pause per iteration each VU can do at most two iterations
/// per second, so the iteration count is bounded by the VU-seconds of the
/// profile.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // Ignore by default as this is a slow test
async fn test_ramp_profile_reaches_target() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/signin"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let params = EnvParams::from_env(&[
        (TARGET_VUS, "50"),
        (RAMPUP_DURATION, "2s"),
        (SUSTAINED_DURATION, "5s"),
        (RAMPDOWN_DURATION, "2s"),
    ]);
    let options = Options::load_test(&params);

    let started = Instant::now();
    let summary = run_load_test(&config_for(&server), &options, CancellationToken::new())
        .await
        .unwrap();
    let elapsed = started.elapsed();

    println!("{}", summary.render());

    assert_eq!(summary.vus_max, 50);
    assert!(elapsed >= Duration::from_secs(9));
    assert!(elapsed < Duration::from_secs(15), "run took {:?}", elapsed);

    // 50 VUs * (1 + 5 + 1) effective seconds * 2 iterations/s
    assert!(summary.iterations <= 760, "too many iterations: {}", summary.iterations);
    assert!(summary.iterations >= 200, "too few iterations: {}", summary.iterations);

    let check = summary.check(STATUS_CHECK).unwrap();
    assert_eq!(check.fails, 0);
}

/// Test: Failing endpoint under load
///
/// Every response is a 500; the run must still complete normally with every
/// check recorded as failed.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // Ignore by default as this is a slow test
async fn test_failing_endpoint_does_not_abort_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/signin"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let params = EnvParams::from_env(&[
        (TARGET_VUS, "20"),
        (RAMPUP_DURATION, "1s"),
        (SUSTAINED_DURATION, "2s"),
        (RAMPDOWN_DURATION, "1s"),
    ]);
    let options = Options::load_test(&params);

    let summary = run_load_test(&config_for(&server), &options, CancellationToken::new())
        .await
        .unwrap();

    let check = summary.check(STATUS_CHECK).unwrap();
    assert_eq!(check.passes, 0);
    assert!(check.fails > 0);
    assert_eq!(summary.http_reqs, summary.http_reqs_failed);
}

/// Test: Slow responses and ramp-down
///
/// Responses take 3s; with no graceful ramp-down the in-flight iterations
/// are cut at the end of the profile instead of delaying it.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // Ignore by default as this is a slow test
async fn test_slow_responses_are_cut_at_ramp_down() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/signin"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let params = EnvParams::from_env(&[
        (TARGET_VUS, "10"),
        (RAMPUP_DURATION, "1s"),
        (SUSTAINED_DURATION, "1s"),
        (RAMPDOWN_DURATION, "1s"),
    ]);
    let options = Options::load_test(&params);

    let started = Instant::now();
    let summary = run_load_test(&config_for(&server), &options, CancellationToken::new())
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(summary.iterations_interrupted > 0);
}
