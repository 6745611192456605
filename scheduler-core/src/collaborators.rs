use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;

use crate::error::StateError;
use crate::types::{EnvOverrides, ExecutorId, ExitReason, NodeLocality};

/// Produces a ready-to-submit pod spec given an executor id and the context needed to wire
/// it up to the driver. Pure: no side effects on the cluster. Pod template construction
/// (secrets, volumes, kerberos, hadoop config, java-options, affinity annotations) is
/// entirely this collaborator's business and out of scope for the core (spec §1).
pub trait PodFactory: Send + Sync {
    fn create(
        &self,
        executor_id: &ExecutorId,
        app_id: &str,
        driver_url: &str,
        env_overrides: &EnvOverrides,
        owner_pod: &Pod,
        node_locality: &NodeLocality,
    ) -> Pod;
}

/// A handle to an open watch; dropping it without calling `close` is permitted but
/// `close()` gives the caller a point to await cleanup instead of relying on `Drop`.
#[async_trait]
pub trait WatchHandle: Send {
    async fn close(self: Box<Self>);
}

/// The cluster API surface the core depends on (spec §6). The core never constructs a
/// `ClusterClient` itself; one is handed to it at `start()`. A `kube`-backed implementation
/// lives in the `cluster` crate, but the core is written only against this trait so the
/// concrete cluster wire client stays out of scope here.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn create_pod(&self, pod: Pod) -> Result<Pod, Self::Error>;
    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), Self::Error>;
    async fn delete_pods(&self, namespace: &str, names: &[String]) -> Result<(), Self::Error> {
        for name in names {
            self.delete_pod(namespace, name).await?;
        }
        Ok(())
    }
    async fn pod_by_name(&self, namespace: &str, name: &str) -> Result<Pod, Self::Error>;

    /// Opens a watch over pods in `namespace` labelled `{label_key}={label_value}`, feeding
    /// every event into `sink`. Returns a handle that can be used to stop the watch.
    async fn watch_pods_with_label(
        &self,
        namespace: &str,
        label_key: &str,
        label_value: &str,
        sink: tokio::sync::mpsc::UnboundedSender<crate::watcher::PodEvent>,
    ) -> Result<Box<dyn WatchHandle>, Self::Error>;

    async fn close(&self);
}

/// The coarse-grained scheduler this core serves. Referenced only through this interface;
/// its own scheduling policy, RPC transport, and leader election are out of scope (spec §1).
#[async_trait]
pub trait Parent: Send + Sync {
    async fn registered_count(&self) -> i64;
    async fn remove_executor(&self, id: ExecutorId, reason: ExitReason);
    async fn disable_executor(&self, id: &ExecutorId) -> bool;
    async fn address_to_executor(&self, addr: &str) -> Option<ExecutorId>;
    async fn host_to_local_task_count(&self) -> std::collections::HashMap<String, i64>;
    fn application_id(&self) -> String;
}

/// Convenience used by components that only need to log an unknown-executor warning
/// rather than matching on `Option` at every call site (spec §7: "logged warning; no-op").
pub(crate) fn log_unknown_executor(id: &ExecutorId) {
    let err = StateError::UnknownExecutor(id.clone());
    log::warn!("{}", err);
}
