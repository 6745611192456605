use std::sync::Arc;

use k8s_openapi::api::core::v1::Pod;

use crate::collaborators::{ClusterClient, Parent, PodFactory};
use crate::color;
use crate::config::Config;
use crate::locality::{compute_node_locality, HostnameResolver, IdentityResolver};
use crate::pod_ext::PodExt;
use crate::state::State;
use crate::types::ExitReason;
use crate::MAX_REASON_CHECKS;

/// The periodic reconcile loop (spec §4.2). Holds the shared `State` plus handles to the
/// three external collaborators; it is the sole component that calls back into the parent
/// (spec §9: "make the Allocator the sole component that calls back into the parent").
pub struct Allocator<C, F, P> {
    state: Arc<State>,
    cluster: Arc<C>,
    factory: Arc<F>,
    parent: Arc<P>,
    config: Config,
    driver_pod: Pod,
    resolver: Box<dyn HostnameResolver>,
}

impl<C, F, P> Allocator<C, F, P>
where
    C: ClusterClient,
    F: PodFactory,
    P: Parent,
{
    pub fn new(
        state: Arc<State>,
        cluster: Arc<C>,
        factory: Arc<F>,
        parent: Arc<P>,
        config: Config,
        driver_pod: Pod,
    ) -> Self {
        Allocator {
            state,
            cluster,
            factory,
            parent,
            config,
            driver_pod,
            resolver: Box::new(IdentityResolver),
        }
    }

    /// Runs one tick: reconcile disconnections, then grow toward `totalExpected` if
    /// warranted. Never skipped because a previous tick failed (spec §4.2: "the tick is
    /// never skipped on account of a prior tick's error").
    pub async fn tick(&self) {
        self.reconcile_disconnections().await;
        self.scale_up().await;
    }

    async fn reconcile_disconnections(&self) {
        let pending = self.state.drain_pending_removals().await;
        for (id, pod) in pending {
            let name = pod.name();
            if let Some(reason) = self.state.take_known_exit_reason(&name).await {
                self.parent.remove_executor(id.clone(), reason.clone()).await;
                if !reason.caused_by_app {
                    self.delete_pod_logged(&pod).await;
                }
                self.state.erase_executor(&id, &name).await;
                continue;
            }

            let checks = self.state.increment_reason_check_count(&id).await;
            if checks >= MAX_REASON_CHECKS {
                self.parent
                    .remove_executor(id.clone(), ExitReason::lost_for_unknown_reasons())
                    .await;
                self.delete_pod_logged(&pod).await;
                self.state.erase_executor(&id, &name).await;
            } else {
                // Re-enqueue: this tick didn't resolve the pod, try again next tick. `pod` may
                // already be gone from `executorsToPods` (the kill path removes it up front),
                // so this must not be gated on that map the way `mark_pending_removal` is.
                self.state.requeue_pending_removal(id, pod).await;
            }
        }
    }

    async fn scale_up(&self) {
        let registered = self.parent.registered_count().await;
        let running = self.state.executors_count().await as i64;
        let expected = self.state.total_expected();

        if registered < running {
            log::debug!(
                "registered ({}) < running ({}); waiting for pending registrations",
                registered,
                running
            );
            return;
        }
        if expected <= running {
            return;
        }

        let batch = std::cmp::min(expected - running, self.config.allocation_batch_size);
        if batch <= 0 {
            return;
        }

        let host_to_local_task_count = self.parent.host_to_local_task_count().await;
        let live_pods: Vec<Pod> = self
            .state
            .executors_pods_snapshot()
            .await
            .into_iter()
            .map(|(_, pod)| pod)
            .collect();
        let node_locality =
            compute_node_locality(&host_to_local_task_count, &live_pods, self.resolver.as_ref());

        let app_id = self.parent.application_id();
        for _ in 0..batch {
            let id = self.state.next_executor_id();
            let pod = self.factory.create(
                &id,
                &app_id,
                "", // driver RPC URL: owned by the parent/RPC layer, out of scope here.
                &Vec::new(),
                &self.driver_pod,
                &node_locality,
            );
            match self.cluster.create_pod(pod).await {
                Ok(accepted) => {
                    self.state.insert_allocated(id.clone(), accepted).await;
                    log::info!("allocated executor {}", color::cyan(id.to_string()));
                }
                Err(err) => {
                    log::warn!("failed to create pod for executor {}: {}", color::red(id.to_string()), err);
                }
            }
        }
    }

    async fn delete_pod_logged(&self, pod: &Pod) {
        let namespace = pod.metadata.namespace.as_deref().unwrap_or(&self.config.namespace);
        if let Err(err) = self.cluster.delete_pod(namespace, &pod.name()).await {
            log::warn!("failed to delete pod {}: {}", color::red(pod.name()), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::WatchHandle;
    use crate::types::{EnvOverrides, ExecutorId, NodeLocality};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("fake cluster error")]
    struct FakeClusterError;

    struct FakeCluster {
        next_pod_name: StdMutex<u64>,
        create_calls: StdMutex<Vec<String>>,
        delete_calls: StdMutex<Vec<String>>,
    }

    impl FakeCluster {
        fn new() -> Self {
            FakeCluster {
                next_pod_name: StdMutex::new(0),
                create_calls: StdMutex::new(Vec::new()),
                delete_calls: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ClusterClient for FakeCluster {
        type Error = FakeClusterError;

        async fn create_pod(&self, mut pod: Pod) -> Result<Pod, Self::Error> {
            let mut counter = self.next_pod_name.lock().unwrap();
            *counter += 1;
            let name = format!("executor-{}", counter);
            pod.metadata.name = Some(name.clone());
            self.create_calls.lock().unwrap().push(name);
            Ok(pod)
        }

        async fn delete_pod(&self, _namespace: &str, name: &str) -> Result<(), Self::Error> {
            self.delete_calls.lock().unwrap().push(name.to_string());
            Ok(())
        }

        async fn pod_by_name(&self, _namespace: &str, name: &str) -> Result<Pod, Self::Error> {
            let mut pod = Pod::default();
            pod.metadata.name = Some(name.to_string());
            Ok(pod)
        }

        async fn watch_pods_with_label(
            &self,
            _namespace: &str,
            _label_key: &str,
            _label_value: &str,
            _sink: tokio::sync::mpsc::UnboundedSender<crate::watcher::PodEvent>,
        ) -> Result<Box<dyn WatchHandle>, Self::Error> {
            unimplemented!("not exercised by allocator tests")
        }

        async fn close(&self) {}
    }

    struct FakeFactory;

    impl PodFactory for FakeFactory {
        fn create(
            &self,
            executor_id: &ExecutorId,
            _app_id: &str,
            _driver_url: &str,
            _env_overrides: &EnvOverrides,
            _owner_pod: &Pod,
            _node_locality: &NodeLocality,
        ) -> Pod {
            let mut pod = Pod::default();
            pod.metadata.name = Some(format!("pending-{}", executor_id));
            pod
        }
    }

    struct FakeParent {
        registered: StdMutex<i64>,
        removed: StdMutex<Vec<(ExecutorId, ExitReason)>>,
    }

    impl FakeParent {
        fn new(registered: i64) -> Self {
            FakeParent {
                registered: StdMutex::new(registered),
                removed: StdMutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Parent for FakeParent {
        async fn registered_count(&self) -> i64 {
            *self.registered.lock().unwrap()
        }

        async fn remove_executor(&self, id: ExecutorId, reason: ExitReason) {
            self.removed.lock().unwrap().push((id, reason));
        }

        async fn disable_executor(&self, _id: &ExecutorId) -> bool {
            true
        }

        async fn address_to_executor(&self, _addr: &str) -> Option<ExecutorId> {
            None
        }

        async fn host_to_local_task_count(&self) -> HashMap<String, i64> {
            HashMap::new()
        }

        fn application_id(&self) -> String {
            "app-1".to_string()
        }
    }

    fn test_config(batch_size: i64) -> Config {
        Config {
            allocation_batch_delay: std::time::Duration::from_secs(1),
            allocation_batch_size: batch_size,
            driver_pod_name: "driver".to_string(),
            namespace: "default".to_string(),
            min_registered_ratio: 0.8,
            initial_executors: 0,
            dynamic_allocation_enabled: false,
            dynamic_allocation_min: 0,
            dynamic_allocation_max: 10,
        }
    }

    #[tokio::test]
    async fn scenario_5_batch_is_clamped_across_ticks() {
        let state = Arc::new(State::new());
        let cluster = Arc::new(FakeCluster::new());
        let factory = Arc::new(FakeFactory);
        let parent = Arc::new(FakeParent::new(0));
        let allocator = Allocator::new(
            state.clone(),
            cluster.clone(),
            factory,
            parent.clone(),
            test_config(2),
            Pod::default(),
        );
        state.set_total_expected(10);

        for _ in 0..5 {
            *parent.registered.lock().unwrap() = state.executors_count().await as i64;
            allocator.tick().await;
        }

        assert_eq!(state.executors_count().await, 10);
    }

    #[tokio::test]
    async fn registered_lagging_running_blocks_growth() {
        let state = Arc::new(State::new());
        let cluster = Arc::new(FakeCluster::new());
        let factory = Arc::new(FakeFactory);
        let parent = Arc::new(FakeParent::new(0));
        let allocator = Allocator::new(
            state.clone(),
            cluster,
            factory,
            parent,
            test_config(5),
            Pod::default(),
        );
        state.set_total_expected(5);
        let id = state.next_executor_id();
        state.insert_allocated(id, Pod::default()).await;

        allocator.tick().await;

        assert_eq!(state.executors_count().await, 1);
    }

    #[tokio::test]
    async fn scenario_4_unknown_reason_times_out_after_max_checks() {
        let state = Arc::new(State::new());
        let cluster = Arc::new(FakeCluster::new());
        let factory = Arc::new(FakeFactory);
        let parent = Arc::new(FakeParent::new(1));
        let allocator = Allocator::new(
            state.clone(),
            cluster,
            factory,
            parent.clone(),
            test_config(5),
            Pod::default(),
        );

        let id = state.next_executor_id();
        let mut pod = Pod::default();
        pod.metadata.name = Some("executor-1".to_string());
        state.insert_allocated(id.clone(), pod).await;
        state.mark_pending_removal(&id).await;

        for _ in 0..(MAX_REASON_CHECKS - 1) {
            allocator.tick().await;
            assert_eq!(state.executors_count().await, 1);
            assert!(parent.removed.lock().unwrap().is_empty());
        }

        allocator.tick().await;

        assert_eq!(state.executors_count().await, 0);
        let removed = parent.removed.lock().unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].0, id);
        assert!(!removed[0].1.caused_by_app);
    }

    #[tokio::test]
    async fn killed_executor_survives_ticks_before_its_exit_reason_lands() {
        // Mirrors `State::kill`: the executor is gone from `executorsToPods`/pendingRemoval
        // holds it directly, before the watcher has observed a terminal pod event for it.
        let state = Arc::new(State::new());
        let cluster = Arc::new(FakeCluster::new());
        let factory = Arc::new(FakeFactory);
        let parent = Arc::new(FakeParent::new(0));
        let allocator = Allocator::new(
            state.clone(),
            cluster,
            factory,
            parent.clone(),
            test_config(5),
            Pod::default(),
        );

        let id = state.next_executor_id();
        let mut pod = Pod::default();
        pod.metadata.name = Some("executor-1".to_string());
        state.insert_allocated(id.clone(), pod).await;
        let (killed, unknown) = state.kill(&[id.clone()]).await;
        assert_eq!(killed.len(), 1);
        assert!(unknown.is_empty());
        assert_eq!(state.executors_count().await, 0);

        // First few ticks: no known exit reason yet. The entry must keep being re-enqueued
        // instead of silently vanishing (it's already absent from `executorsToPods`).
        for _ in 0..(MAX_REASON_CHECKS - 1) {
            allocator.tick().await;
            assert!(parent.removed.lock().unwrap().is_empty());
        }

        allocator.tick().await;

        let removed = parent.removed.lock().unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].0, id);
    }
}
