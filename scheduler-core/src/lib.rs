//! Cluster-facing core of a coarse-grained scheduler backend: owns executor bookkeeping,
//! pod allocation, and pod lifecycle attribution against a Kubernetes-shaped cluster API.
//! The concrete cluster wire client, pod template construction, and the parent scheduler's
//! own RPC/scheduling policy are all injected through the traits in [`collaborators`].

pub mod allocator;
pub mod collaborators;
pub mod color;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod lifecycle;
pub mod locality;
pub mod logging;
pub mod pod_ext;
pub mod state;
pub mod types;
pub mod watcher;

/// Label key used to scope the pod watch to a single application's executors (spec §4.3).
pub const APP_ID_LABEL: &str = "scheduler-app-id";

/// Placeholder exit code recorded when a pod's primary container has no terminated status
/// yet, or when an executor is declared lost without ever observing a terminal pod event
/// (spec §4.3, §6).
pub const UNKNOWN_EXIT_CODE: i32 = -1;

/// Exit code attributed to a pod whose primary container never reported a terminated state
/// but whose pod nonetheless left the cluster (spec §6).
pub const DEFAULT_CONTAINER_FAILURE_EXIT_STATUS: i32 = -1;

/// Number of consecutive Allocator ticks a pending-removal executor is allowed to go without
/// a resolved exit reason before it is declared lost for unknown reasons (spec §4.2, §8 P4).
pub const MAX_REASON_CHECKS: u32 = 10;

pub use allocator::Allocator;
pub use collaborators::{ClusterClient, Parent, PodFactory, WatchHandle};
pub use config::Config;
pub use endpoint::DriverEndpoint;
pub use error::{ConfigError, CoreError, StateError};
pub use lifecycle::SchedulerBackend;
pub use state::State;
pub use types::{EnvOverrides, ExecutorId, ExitReason, NodeLocality};
pub use watcher::{PodEvent, Watcher};
