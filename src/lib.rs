//! # signin-loadtest
//!
//! Load scenario for the `/signin` page: VUs ramp up to `TARGET_VUS`, hold,
//! and ramp back down to zero while each one repeatedly requests the page,
//! pauses half a second and checks for a 200.
//!
//! - [`env`]: scenario parameters from the environment, with fallbacks
//! - [`scenario`]: the immutable options object (stages, executor, grace)
//! - [`workload`]: the per-iteration request and status check
//! - [`executor`]: ramping-VU scheduling
//! - [`metrics`] and [`summary`]: check and request aggregation, reporting

pub mod cli;
pub mod config;
pub mod env;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod runner;
pub mod scenario;
pub mod summary;
pub mod telemetry;
pub mod workload;

pub use error::{LoadTestError, Result};
