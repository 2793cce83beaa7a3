use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

use crate::error::{LoadTestError, Result};
use crate::workload::SIGNIN_URL;

pub const DEFAULT_CONFIG_FILE: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "LOADTEST__";

/// Runtime settings of the load generator.
///
/// Scenario shape (VUs and stage durations) is not part of this; it comes
/// from the bare `TARGET_VUS`/`*_DURATION` variables, see [`crate::env`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub target: TargetConfig,
    #[validate(nested)]
    pub http: HttpConfig,
    #[validate(nested)]
    pub workload: WorkloadConfig,
    #[validate(nested)]
    pub executor: ExecutorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TargetConfig {
    #[validate(url)]
    pub url: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            url: SIGNIN_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct HttpConfig {
    #[validate(range(min = 1, max = 600))]
    pub timeout_seconds: u64,
    #[validate(length(min = 1))]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 60,
            user_agent: concat!("signin-loadtest/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct WorkloadConfig {
    /// Pause after each request.
    #[validate(range(max = 60_000))]
    pub think_time_ms: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self { think_time_ms: 500 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ExecutorConfig {
    #[validate(range(min = 1, max = 1000))]
    pub tick_millis: u64,
    /// Progress log interval, 0 disables it.
    pub report_interval_seconds: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            tick_millis: 100,
            report_interval_seconds: 5,
        }
    }
}

impl Config {
    /// Defaults, then `config/default.toml`, then `extra_file`, then
    /// `LOADTEST__*` environment variables.
    pub fn load(extra_file: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(DEFAULT_CONFIG_FILE));

        if let Some(path) = extra_file {
            if !path.is_file() {
                return Err(LoadTestError::ConfigFileNotFound(path.to_path_buf()));
            }
            figment = figment.merge(Toml::file(path));
        }

        let cfg: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        cfg.validate()?;
        Ok(cfg)
    }
}
