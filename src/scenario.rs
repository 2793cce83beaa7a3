//! # Scenario options
//!
//! The engine-facing description of the sign-in load test: one
//! `ramping-vus` scenario named `loadTest` that ramps up to the target VU
//! count, holds it, then ramps back down to zero with no graceful ramp-down.
//!
//! The options are built once from [`EnvParams`] and never mutated. They
//! serialize to the same JSON shape a k6-style runner expects:
//!
//! ```json
//! {
//!   "discardResponseBodies": true,
//!   "scenarios": {
//!     "loadTest": {
//!       "executor": "ramping-vus",
//!       "startVUs": 0,
//!       "stages": [
//!         { "duration": "10s", "target": 2000 },
//!         { "duration": "40s", "target": 2000 },
//!         { "duration": "10s", "target": 0 }
//!       ],
//!       "gracefulRampDown": "0s"
//!     }
//!   }
//! }
//! ```

use serde::Serialize;
use std::time::Duration;
use strum::{Display, EnumString};

use crate::env::{EnvParams, StageDuration};
use crate::error::Result;
use crate::executor::RampPlan;

pub const LOAD_TEST_SCENARIO: &str = "loadTest";
pub const GRACEFUL_RAMP_DOWN: &str = "0s";

/// Executor kinds understood by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, EnumString, Display)]
pub enum ExecutorKind {
    #[serde(rename = "ramping-vus")]
    #[strum(serialize = "ramping-vus")]
    RampingVus,
}

/// One `(duration, target)` step of the VU profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stage {
    pub duration: StageDuration,
    pub target: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioConfig {
    pub executor: ExecutorKind,
    #[serde(rename = "startVUs")]
    pub start_vus: u64,
    pub stages: Vec<Stage>,
    pub graceful_ramp_down: StageDuration,
}

impl ScenarioConfig {
    /// Ramp-up to the target, hold it, ramp down to zero.
    pub fn ramping(params: &EnvParams) -> Self {
        let target = params.target_vus;
        Self {
            executor: ExecutorKind::RampingVus,
            start_vus: 0,
            stages: vec![
                Stage {
                    duration: params.rampup.clone(),
                    target,
                },
                Stage {
                    duration: params.sustained.clone(),
                    target,
                },
                Stage {
                    duration: params.rampdown.clone(),
                    target: 0,
                },
            ],
            graceful_ramp_down: StageDuration::from_literal(GRACEFUL_RAMP_DOWN),
        }
    }

    /// Stage targets in order.
    pub fn targets(&self) -> Vec<u64> {
        self.stages.iter().map(|s| s.target).collect()
    }

    pub fn total_duration(&self) -> Duration {
        self.plan().total_duration()
    }

    /// Parsed schedule the executor follows.
    pub fn plan(&self) -> RampPlan {
        RampPlan::new(
            self.start_vus,
            self.stages
                .iter()
                .map(|s| (s.duration.as_duration(), s.target))
                .collect(),
        )
    }
}

/// Scenarios of the options object. Only `loadTest` exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scenarios {
    #[serde(rename = "loadTest")]
    pub load_test: ScenarioConfig,
}

/// The whole options object handed to the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Options {
    pub discard_response_bodies: bool,
    pub scenarios: Scenarios,
}

impl Options {
    pub fn load_test(params: &EnvParams) -> Self {
        Self {
            discard_response_bodies: true,
            scenarios: Scenarios {
                load_test: ScenarioConfig::ramping(params),
            },
        }
    }

    pub fn load_test_scenario(&self) -> &ScenarioConfig {
        &self.scenarios.load_test
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
