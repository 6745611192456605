use std::collections::HashMap;
use std::fmt;

/// Opaque, process-local executor identifier. Assigned from a monotonic counter and never
/// reused within a process lifetime (spec invariant I5).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExecutorId(pub u64);

impl fmt::Display for ExecutorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The reason an executor's pod went away, attributed as either application-caused (exit
/// code came from the user's own container) or framework-caused (explicit kill, deletion,
/// or unknown).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitReason {
    pub exit_code: i32,
    pub caused_by_app: bool,
    pub message: String,
}

impl ExitReason {
    pub fn framework(exit_code: i32, message: impl Into<String>) -> Self {
        ExitReason {
            exit_code,
            caused_by_app: false,
            message: message.into(),
        }
    }

    pub fn application(exit_code: i32, message: impl Into<String>) -> Self {
        ExitReason {
            exit_code,
            caused_by_app: true,
            message: message.into(),
        }
    }

    /// The fallback used when `MAX_REASON_CHECKS` ticks elapse without ever observing a
    /// terminal pod event for an executor pending removal.
    pub fn lost_for_unknown_reasons() -> Self {
        ExitReason::framework(crate::UNKNOWN_EXIT_CODE, "Executor lost for unknown reasons.")
    }
}

/// Per-node count of tasks that would prefer to run on that node for data-locality reasons,
/// after subtracting nodes already occupied by a live executor pod (spec §4.4).
pub type NodeLocality = HashMap<String, i64>;

/// `(key, value)` environment variable overrides passed through to `PodFactory::create`.
pub type EnvOverrides = Vec<(String, String)>;
