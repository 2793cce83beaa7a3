//! Per-iteration work of a VU.

use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::config::Config;
use crate::error::{LoadTestError, Result};
use crate::metrics::MetricsCollector;

pub const SIGNIN_URL: &str = "http://localhost:8080/signin";
pub const STATUS_CHECK: &str = "is status 200";
pub const THINK_TIME: Duration = Duration::from_millis(500);

/// What a single iteration observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationOutcome {
    /// HTTP status, 0 when the request never got a response.
    pub status: u16,
    pub check_passed: bool,
    pub request_duration: Duration,
    pub body_size: u64,
}

/// One repeatable unit of work executed by a VU.
///
/// Implementations record what they observe into `metrics` and never fail:
/// problems show up as failed checks.
#[async_trait]
pub trait Workload: Send + Sync {
    async fn iterate(&self, vu: u64, metrics: &MetricsCollector) -> IterationOutcome;
}

/// `GET /signin`, pause, then check the status is 200.
#[derive(Debug, Clone)]
pub struct SigninWorkload {
    client: Client,
    url: Url,
    think_time: Duration,
    discard_response_bodies: bool,
}

impl SigninWorkload {
    pub fn new(client: Client, url: Url) -> Self {
        Self {
            client,
            url,
            think_time: THINK_TIME,
            discard_response_bodies: true,
        }
    }

    /// Build the workload and its HTTP client from runtime configuration.
    pub fn from_config(cfg: &Config, discard_response_bodies: bool) -> Result<Self> {
        let url = parse_url(&cfg.target.url)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.http.timeout_seconds))
            .user_agent(cfg.http.user_agent.as_str())
            .build()?;

        Ok(Self::new(client, url)
            .with_think_time(Duration::from_millis(cfg.workload.think_time_ms))
            .with_discard_response_bodies(discard_response_bodies))
    }

    pub fn with_think_time(mut self, think_time: Duration) -> Self {
        self.think_time = think_time;
        self
    }

    pub fn with_discard_response_bodies(mut self, discard: bool) -> Self {
        self.discard_response_bodies = discard;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Send the request, returning the status (0 on transport failure) and
    /// the number of body bytes read.
    async fn fetch(&self, vu: u64) -> (u16, u64) {
        let mut response = match self.client.get(self.url.clone()).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(vu, error = %e, "request failed");
                return (0, 0);
            }
        };

        let status = response.status().as_u16();
        let mut body_size = 0u64;

        if self.discard_response_bodies {
            // Drain the body so the connection can go back to the pool.
            loop {
                match response.chunk().await {
                    Ok(Some(chunk)) => body_size += chunk.len() as u64,
                    Ok(None) => break,
                    Err(e) => {
                        debug!(vu, error = %e, "failed reading response body");
                        break;
                    }
                }
            }
        } else {
            match response.bytes().await {
                Ok(body) => body_size = body.len() as u64,
                Err(e) => debug!(vu, error = %e, "failed reading response body"),
            }
        }

        (status, body_size)
    }
}

#[async_trait]
impl Workload for SigninWorkload {
    async fn iterate(&self, vu: u64, metrics: &MetricsCollector) -> IterationOutcome {
        let started = Instant::now();
        let (status, body_size) = self.fetch(vu).await;
        let request_duration = started.elapsed();
        metrics.record_request(request_duration, status);

        sleep(self.think_time).await;

        let check_passed = status == 200;
        metrics.record_check(STATUS_CHECK, check_passed);
        if !check_passed {
            debug!(vu, status, "status check failed");
        }

        IterationOutcome {
            status,
            check_passed,
            request_duration,
            body_size,
        }
    }
}

fn parse_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| LoadTestError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(LoadTestError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}
