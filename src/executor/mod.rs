//! # Ramping-VU executor
//!
//! Drives a [`Workload`](crate::workload::Workload) according to a
//! [`RampPlan`]: a controller loop ticks at a fixed interval, computes how
//! many VUs should be running and starts or stops VU tasks to match.
//!
//! Stopped VUs never start another iteration. Their in-flight iteration gets
//! the graceful ramp-down period to finish and is aborted afterwards; with a
//! zero period it is aborted right away.

mod plan;
mod ramping;

pub use plan::RampPlan;
pub(crate) use ramping::log_join_failure;
pub use ramping::RampingVusExecutor;
