use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_MIN_REGISTERED_RATIO: f64 = 0.8;

/// Options the core recognizes (spec §6). Assembled once from the process environment at
/// startup and never re-read afterward — this core does not support hot configuration
/// reload.
#[derive(Debug, Clone)]
pub struct Config {
    pub allocation_batch_delay: Duration,
    pub allocation_batch_size: i64,
    pub driver_pod_name: String,
    pub namespace: String,
    pub min_registered_ratio: f64,
    pub initial_executors: i64,
    pub dynamic_allocation_enabled: bool,
    pub dynamic_allocation_min: i64,
    pub dynamic_allocation_max: i64,
}

impl Config {
    /// Reads the recognized options from environment variables and validates them. Returns
    /// `Err` on the first invalid or missing required field; per the error handling design,
    /// this is the sole fatal-at-startup path in the crate.
    pub fn from_env() -> Result<Config, ConfigError> {
        let cfg = Config {
            allocation_batch_delay: Duration::from_millis(parse_env_u64(
                "SCHED_ALLOCATION_BATCH_DELAY_MS",
                1000,
            )?),
            allocation_batch_size: parse_env_i64("SCHED_ALLOCATION_BATCH_SIZE", 5)?,
            driver_pod_name: std::env::var("SCHED_DRIVER_POD_NAME").unwrap_or_default(),
            namespace: std::env::var("SCHED_NAMESPACE").unwrap_or_default(),
            min_registered_ratio: match std::env::var("SCHED_MIN_REGISTERED_RATIO") {
                Ok(v) => v
                    .parse()
                    .map_err(|source| ConfigError::InvalidFloatEnvVar {
                        name: "SCHED_MIN_REGISTERED_RATIO",
                        source,
                    })?,
                Err(_) => DEFAULT_MIN_REGISTERED_RATIO,
            },
            initial_executors: parse_env_i64("SCHED_INITIAL_EXECUTORS", 0)?,
            dynamic_allocation_enabled: std::env::var("SCHED_DYNAMIC_ALLOCATION_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            dynamic_allocation_min: parse_env_i64("SCHED_DYNAMIC_ALLOCATION_MIN", 0)?,
            dynamic_allocation_max: parse_env_i64("SCHED_DYNAMIC_ALLOCATION_MAX", i64::MAX)?,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.driver_pod_name.is_empty() {
            return Err(ConfigError::MissingDriverPodName);
        }
        if self.namespace.is_empty() {
            return Err(ConfigError::MissingNamespace);
        }
        if self.allocation_batch_delay.is_zero() {
            return Err(ConfigError::NonPositiveBatchDelay(self.allocation_batch_delay));
        }
        if self.allocation_batch_size <= 0 {
            return Err(ConfigError::NonPositiveBatchSize(self.allocation_batch_size));
        }
        if self.min_registered_ratio <= 0.0 || self.min_registered_ratio > 1.0 {
            return Err(ConfigError::InvalidMinRegisteredRatio(self.min_registered_ratio));
        }
        Ok(())
    }

    /// Effective initial target passed to the first `requestTotal` call at startup when
    /// dynamic allocation is disabled (spec §4.7).
    pub fn initial_total_expected(&self) -> i64 {
        if self.dynamic_allocation_enabled {
            self.dynamic_allocation_min.max(0)
        } else {
            self.initial_executors
        }
    }
}

fn parse_env_i64(name: &'static str, default: i64) -> Result<i64, ConfigError> {
    match std::env::var(name) {
        Ok(v) => v
            .parse()
            .map_err(|source| ConfigError::InvalidEnvVar { name, source }),
        Err(_) => Ok(default),
    }
}

fn parse_env_u64(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(v) => v
            .parse()
            .map_err(|source| ConfigError::InvalidEnvVar { name, source }),
        Err(_) => Ok(default),
    }
}
