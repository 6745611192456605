use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use k8s_openapi::api::core::v1::Pod;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::allocator::Allocator;
use crate::collaborators::{ClusterClient, Parent, PodFactory, WatchHandle};
use crate::config::Config;
use crate::endpoint::DriverEndpoint;
use crate::error::CoreError;
use crate::state::State;
use crate::watcher::Watcher;
use crate::APP_ID_LABEL;

/// Wires the Allocator timer, the pod Watcher, and the public API together, and owns their
/// ordered teardown (spec §4.7). This is the type a parent scheduler holds onto.
///
/// `Parent::start`/`Parent::stop` have no counterpart in this crate's `Parent` trait (spec
/// §6 does not list them among the operations the core consumes) — sending shutdown to
/// executors over RPC is the parent's own responsibility, invoked by the parent itself
/// around its calls into this backend, not by the backend calling back into it.
pub struct SchedulerBackend<C, F, P> {
    state: Arc<State>,
    cluster: Arc<C>,
    factory: Arc<F>,
    parent: Arc<P>,
    config: Config,
    cancel: CancellationToken,
    allocator_task: Mutex<Option<JoinHandle<()>>>,
    watcher_task: Mutex<Option<JoinHandle<()>>>,
    watch_handle: Mutex<Option<Box<dyn WatchHandle>>>,
    stopped: AtomicBool,
}

impl<C, F, P> SchedulerBackend<C, F, P>
where
    C: ClusterClient + 'static,
    F: PodFactory + 'static,
    P: Parent + 'static,
{
    pub fn new(cluster: Arc<C>, factory: Arc<F>, parent: Arc<P>, config: Config) -> Arc<Self> {
        Arc::new(SchedulerBackend {
            state: Arc::new(State::new()),
            cluster,
            factory,
            parent,
            config,
            cancel: CancellationToken::new(),
            allocator_task: Mutex::new(None),
            watcher_task: Mutex::new(None),
            watch_handle: Mutex::new(None),
            stopped: AtomicBool::new(false),
        })
    }

    /// Opens the labelled pod watch, schedules the Allocator at `[0, batchDelay,
    /// 2*batchDelay, ...]`, and performs the initial `requestTotal` when dynamic allocation
    /// is disabled (spec §4.7). `Config::validate` having already run (spec §7) is this
    /// function's only precondition; any failure past that point is logged and swallowed
    /// per the error handling design, never fatal.
    pub async fn start(self: &Arc<Self>) -> Result<(), CoreError> {
        self.config.validate()?;

        let driver_pod = match self
            .cluster
            .pod_by_name(&self.config.namespace, &self.config.driver_pod_name)
            .await
        {
            Ok(pod) => pod,
            Err(err) => {
                log::warn!(
                    "failed to fetch driver pod {}: {}; owner references on created pods will be empty",
                    self.config.driver_pod_name,
                    err
                );
                Pod::default()
            }
        };

        self.spawn_watcher().await;
        self.spawn_allocator(driver_pod).await;

        if !self.config.dynamic_allocation_enabled {
            self.request_total(self.config.initial_total_expected()).await;
        }
        Ok(())
    }

    async fn spawn_watcher(self: &Arc<Self>) {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let app_id = self.parent.application_id();
        match self
            .cluster
            .watch_pods_with_label(&self.config.namespace, APP_ID_LABEL, &app_id, tx)
            .await
        {
            Ok(handle) => {
                *self.watch_handle.lock().await = Some(handle);
            }
            Err(err) => {
                log::error!("failed to open pod watch: {}", err);
            }
        }

        let watcher = Watcher::new(self.state.clone());
        let task = tokio::spawn(async move {
            watcher.run(rx).await;
        });
        *self.watcher_task.lock().await = Some(task);
    }

    async fn spawn_allocator(self: &Arc<Self>, driver_pod: Pod) {
        let allocator = Allocator::new(
            self.state.clone(),
            self.cluster.clone(),
            self.factory.clone(),
            self.parent.clone(),
            self.config.clone(),
            driver_pod,
        );
        let cancel = self.cancel.clone();
        let period = self.config.allocation_batch_delay;
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => allocator.tick().await,
                }
            }
        });
        *self.allocator_task.lock().await = Some(task);
    }

    /// Ordered, idempotent teardown (spec §4.7). Each step is best-effort: a failure in one
    /// never prevents the rest from running.
    pub async fn stop(self: &Arc<Self>) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }

        self.cancel.cancel();
        if let Some(task) = self.allocator_task.lock().await.take() {
            let _ = task.await;
        }

        let executors = self.state.drain_all_executors().await;
        let names: Vec<String> = executors.iter().map(|(_, pod)| pod_name(pod)).collect();
        if let Err(err) = self.cluster.delete_pods(&self.config.namespace, &names).await {
            log::warn!("failed to delete one or more executor pods during shutdown: {}", err);
        }

        if let Some(handle) = self.watch_handle.lock().await.take() {
            handle.close().await;
        }
        if let Some(task) = self.watcher_task.lock().await.take() {
            let _ = task.await;
        }

        self.cluster.close().await;
    }

    // -- public API (spec §4.6) --

    pub async fn request_total(&self, n: i64) -> bool {
        self.state.set_total_expected(n);
        true
    }

    pub async fn kill_executors(&self, ids: &[crate::types::ExecutorId]) -> bool {
        let (killed, unknown) = self.state.kill(ids).await;
        for id in &unknown {
            crate::collaborators::log_unknown_executor(id);
        }
        let names: Vec<String> = killed.iter().map(|(_, pod)| pod_name(pod)).collect();
        if let Err(err) = self.cluster.delete_pods(&self.config.namespace, &names).await {
            log::warn!("failed to delete one or more killed executor pods: {}", err);
        }
        true
    }

    pub fn pod_by_ip(&self, ip: &str) -> Option<Pod> {
        self.state.pod_by_ip(ip)
    }

    /// A bridge the parent's RPC layer dispatches disconnect notifications through (spec
    /// §4.5). Owned by the caller; `SchedulerBackend` does not hold or drive one itself
    /// since the RPC transport that would invoke it is out of scope here.
    pub fn driver_endpoint(&self) -> DriverEndpoint<P> {
        DriverEndpoint::new(self.state.clone(), self.parent.clone())
    }

    pub async fn sufficient_resources_registered(&self) -> bool {
        let registered = self.parent.registered_count().await as f64;
        let threshold = self.config.initial_executors as f64 * self.config.min_registered_ratio;
        registered >= threshold
    }
}

fn pod_name(pod: &Pod) -> String {
    pod.metadata.name.clone().unwrap_or_default()
}
