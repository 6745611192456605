use thiserror::Error;

/// Raised only from [`crate::config::Config::validate`]. Any of these is fatal at startup;
/// the core refuses to start rather than run with a guessed default for a required field.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("driverPodName is required but was not set")]
    MissingDriverPodName,

    #[error("namespace is required but was not set")]
    MissingNamespace,

    #[error("allocationBatchDelay must be positive, got {0:?}")]
    NonPositiveBatchDelay(std::time::Duration),

    #[error("allocationBatchSize must be positive, got {0}")]
    NonPositiveBatchSize(i64),

    #[error("minRegisteredRatio must be in (0.0, 1.0], got {0}")]
    InvalidMinRegisteredRatio(f64),

    #[error("failed to parse environment variable {name}: {source}")]
    InvalidEnvVar {
        name: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("failed to parse environment variable {name}: {source}")]
    InvalidFloatEnvVar {
        name: &'static str,
        #[source]
        source: std::num::ParseFloatError,
    },
}

/// Logged-and-discarded errors raised by [`crate::state::State`]. These never propagate past
/// the component that raises them; they exist so the call sites can log a structured message
/// instead of matching on `Option` by hand everywhere.
#[derive(Error, Debug)]
pub enum StateError {
    #[error("unknown executor id {0}")]
    UnknownExecutor(crate::types::ExecutorId),
}

/// Facade error for the one fatal path this crate has: startup misconfiguration. All other
/// failure modes described in the error handling design are logged and swallowed at the
/// component that observes them and never reach this type.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("core refused to start due to invalid configuration: {0}")]
    Config(#[from] ConfigError),
}
