use std::time::Duration;

/// VU schedule of a ramping scenario.
///
/// Each stage moves linearly from the previous target to its own target over
/// its duration. A zero-length stage jumps straight to its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RampPlan {
    start_vus: u64,
    stages: Vec<(Duration, u64)>,
}

impl RampPlan {
    pub fn new(start_vus: u64, stages: Vec<(Duration, u64)>) -> Self {
        Self { start_vus, stages }
    }

    pub fn total_duration(&self) -> Duration {
        self.stages
            .iter()
            .fold(Duration::ZERO, |total, (duration, _)| total.saturating_add(*duration))
    }

    pub fn peak(&self) -> u64 {
        self.stages
            .iter()
            .map(|(_, target)| *target)
            .fold(self.start_vus, u64::max)
    }

    /// Number of VUs that should be running `elapsed` into the run.
    pub fn target_at(&self, elapsed: Duration) -> u64 {
        let mut from = self.start_vus;
        let mut stage_start = Duration::ZERO;

        for &(duration, to) in &self.stages {
            let stage_end = stage_start.saturating_add(duration);
            if elapsed < stage_end {
                let progress = (elapsed - stage_start).as_secs_f64() / duration.as_secs_f64();
                let value = from as f64 + (to as f64 - from as f64) * progress;
                return value.round().max(0.0) as u64;
            }
            from = to;
            stage_start = stage_end;
        }

        from
    }
}
