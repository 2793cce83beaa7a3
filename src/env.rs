//! Scenario parameters read from the process environment.
//!
//! Every parameter has its own typed accessor. Accessors never fail: a
//! missing or unusable value is replaced by the parameter's default and the
//! run carries on.

use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::warn;

pub const TARGET_VUS: &str = "TARGET_VUS";
pub const RAMPUP_DURATION: &str = "RAMPUP_DURATION";
pub const SUSTAINED_DURATION: &str = "SUSTAINED_DURATION";
pub const RAMPDOWN_DURATION: &str = "RAMPDOWN_DURATION";

pub const DEFAULT_TARGET_VUS: u64 = 2000;
pub const DEFAULT_RAMPUP_DURATION: &str = "10s";
pub const DEFAULT_SUSTAINED_DURATION: &str = "40s";
pub const DEFAULT_RAMPDOWN_DURATION: &str = "10s";

/// Longest accepted stage. Longer values are treated as invalid.
pub const MAX_STAGE_DURATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Source of environment variables.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl<'a> EnvSource for [(&'a str, &'a str)] {
    fn var(&self, key: &str) -> Option<String> {
        self.iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| (*v).to_string())
    }
}

impl<'a, const N: usize> EnvSource for [(&'a str, &'a str); N] {
    fn var(&self, key: &str) -> Option<String> {
        self.as_slice().var(key)
    }
}

/// A stage duration as written in the scenario options, with its parsed value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageDuration {
    raw: String,
    value: Duration,
}

impl StageDuration {
    /// Parse a duration such as `10s`, `1m`, `1m 30s` or `500ms`.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let value = humantime::parse_duration(trimmed).ok()?;
        Some(Self {
            raw: trimmed.to_string(),
            value,
        })
    }

    /// Build from one of the built-in default literals.
    pub(crate) fn from_literal(raw: &'static str) -> Self {
        // Defaults are fixed literals that always parse.
        let value = humantime::parse_duration(raw).unwrap_or_default();
        Self {
            raw: raw.to_string(),
            value,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn as_duration(&self) -> Duration {
        self.value
    }
}

impl fmt::Display for StageDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for StageDuration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

/// All scenario parameters, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvParams {
    pub target_vus: u64,
    pub rampup: StageDuration,
    pub sustained: StageDuration,
    pub rampdown: StageDuration,
}

impl EnvParams {
    pub fn from_env<E: EnvSource + ?Sized>(env: &E) -> Self {
        Self {
            target_vus: target_vus(env),
            rampup: rampup_duration(env),
            sustained: sustained_duration(env),
            rampdown: rampdown_duration(env),
        }
    }

    pub fn from_process_env() -> Self {
        Self::from_env(&ProcessEnv)
    }
}

impl Default for EnvParams {
    fn default() -> Self {
        Self {
            target_vus: DEFAULT_TARGET_VUS,
            rampup: StageDuration::from_literal(DEFAULT_RAMPUP_DURATION),
            sustained: StageDuration::from_literal(DEFAULT_SUSTAINED_DURATION),
            rampdown: StageDuration::from_literal(DEFAULT_RAMPDOWN_DURATION),
        }
    }
}

/// Target VU count from `TARGET_VUS`.
///
/// The value is read the way a base-10 `parseInt` reads it: leading
/// whitespace is skipped and the leading run of digits is used, so `"42abc"`
/// yields 42. Zero, negative and unparseable values fall back to 2000.
pub fn target_vus<E: EnvSource + ?Sized>(env: &E) -> u64 {
    let Some(raw) = env.var(TARGET_VUS) else {
        return DEFAULT_TARGET_VUS;
    };

    match parse_leading_int(&raw) {
        Some(value) if value > 0 => value as u64,
        _ => {
            if !raw.is_empty() {
                warn!(
                    value = %raw,
                    fallback = DEFAULT_TARGET_VUS,
                    "{TARGET_VUS} is not a positive integer, using default"
                );
            }
            DEFAULT_TARGET_VUS
        }
    }
}

/// Ramp-up stage duration from `RAMPUP_DURATION`, default `10s`.
pub fn rampup_duration<E: EnvSource + ?Sized>(env: &E) -> StageDuration {
    duration_param(env, RAMPUP_DURATION, DEFAULT_RAMPUP_DURATION)
}

/// Sustain stage duration from `SUSTAINED_DURATION`, default `40s`.
pub fn sustained_duration<E: EnvSource + ?Sized>(env: &E) -> StageDuration {
    duration_param(env, SUSTAINED_DURATION, DEFAULT_SUSTAINED_DURATION)
}

/// Ramp-down stage duration from `RAMPDOWN_DURATION`, default `10s`.
pub fn rampdown_duration<E: EnvSource + ?Sized>(env: &E) -> StageDuration {
    duration_param(env, RAMPDOWN_DURATION, DEFAULT_RAMPDOWN_DURATION)
}

fn duration_param<E: EnvSource + ?Sized>(
    env: &E,
    key: &str,
    fallback: &'static str,
) -> StageDuration {
    let raw = match env.var(key) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return StageDuration::from_literal(fallback),
    };

    match StageDuration::parse(&raw) {
        Some(parsed) if parsed.as_duration() <= MAX_STAGE_DURATION => parsed,
        Some(_) => {
            warn!(
                value = %raw,
                fallback,
                max_secs = MAX_STAGE_DURATION.as_secs(),
                "{key} is longer than the maximum stage duration, using default"
            );
            StageDuration::from_literal(fallback)
        }
        None => {
            warn!(value = %raw, fallback, "{key} is not a valid duration, using default");
            StageDuration::from_literal(fallback)
        }
    }
}

fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}
