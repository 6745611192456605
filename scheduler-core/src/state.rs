use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::RwLock;

use k8s_openapi::api::core::v1::Pod;
use tokio::sync::Mutex;

use crate::types::{ExecutorId, ExitReason};

fn pod_name(pod: &Pod) -> String {
    pod.metadata.name.clone().unwrap_or_default()
}

/// The five maps that require cross-map atomicity, guarded together by one mutex (spec
/// §4.1: "the cost of a two-lock inconsistency ... is correctness"). `podsByIP` is kept
/// separately below since spec §5 declares it concurrent-safe for reads independent of the
/// allocator/watcher critical sections.
#[derive(Default)]
struct Inner {
    executors_to_pods: HashMap<ExecutorId, Pod>,
    pod_names_to_executors: HashMap<String, ExecutorId>,
    known_exit_reasons: HashMap<String, ExitReason>,
    pending_removal: HashMap<ExecutorId, Pod>,
    reason_check_counts: HashMap<ExecutorId, u32>,
}

/// The authoritative indexes described in spec §3, plus the atomic counters that don't need
/// `M`. This is the sole owner of cross-component mutable state; `Allocator`, `Watcher`,
/// and `DriverEndpoint` hold a shared handle to it and otherwise carry no mutable state of
/// their own (spec §9: "single lock + single resolver").
pub struct State {
    inner: Mutex<Inner>,
    pods_by_ip: RwLock<HashMap<String, Pod>>,
    total_expected: AtomicI64,
    executor_id_counter: AtomicU64,
}

impl Default for State {
    fn default() -> Self {
        State {
            inner: Mutex::new(Inner::default()),
            pods_by_ip: RwLock::new(HashMap::new()),
            total_expected: AtomicI64::new(0),
            executor_id_counter: AtomicU64::new(0),
        }
    }
}

impl State {
    pub fn new() -> Self {
        State::default()
    }

    // -- atomics, no lock required --

    pub fn total_expected(&self) -> i64 {
        self.total_expected.load(Ordering::SeqCst)
    }

    pub fn set_total_expected(&self, n: i64) {
        self.total_expected.store(n, Ordering::SeqCst);
    }

    /// Assigns the next strictly increasing executor id (spec I5).
    pub fn next_executor_id(&self) -> ExecutorId {
        ExecutorId(self.executor_id_counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    // -- podsByIP, its own lock (spec §5: concurrent-safe reads, written only by Watcher) --

    pub fn pod_by_ip(&self, ip: &str) -> Option<Pod> {
        self.pods_by_ip.read().expect("podsByIP lock poisoned").get(ip).cloned()
    }

    pub fn upsert_pod_by_ip(&self, ip: String, pod: Pod) {
        self.pods_by_ip.write().expect("podsByIP lock poisoned").insert(ip, pod);
    }

    pub fn remove_pod_by_ip(&self, ip: &str) {
        self.pods_by_ip.write().expect("podsByIP lock poisoned").remove(ip);
    }

    // -- the six-map aggregate, all guarded by `inner`'s mutex --

    pub async fn executors_count(&self) -> usize {
        self.inner.lock().await.executors_to_pods.len()
    }

    pub async fn executors_pods_snapshot(&self) -> Vec<(ExecutorId, Pod)> {
        self.inner
            .lock()
            .await
            .executors_to_pods
            .iter()
            .map(|(id, pod)| (id.clone(), pod.clone()))
            .collect()
    }

    /// Requires `id` not already present in `executorsToPods` (spec I6). Returns `false`
    /// (and leaves state untouched) if that precondition is violated, which should never
    /// happen given ids are assigned from a monotonic counter immediately before this call.
    pub async fn insert_allocated(&self, id: ExecutorId, pod: Pod) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.executors_to_pods.contains_key(&id) {
            log::error!("refusing to double-allocate executor {}", id);
            return false;
        }
        let name = pod_name(&pod);
        inner.pod_names_to_executors.insert(name, id.clone());
        inner.executors_to_pods.insert(id, pod);
        true
    }

    pub async fn remove_by_executor(&self, id: &ExecutorId) -> Option<Pod> {
        let mut inner = self.inner.lock().await;
        let pod = inner.executors_to_pods.remove(id)?;
        inner.pod_names_to_executors.remove(&pod_name(&pod));
        Some(pod)
    }

    /// Inserts `(id, pod)` into `pendingRemoval` if `id` is currently allocated. The
    /// executor stays in `executorsToPods` until the Allocator resolves and erases it;
    /// see [`State::erase_executor`].
    pub async fn mark_pending_removal(&self, id: &ExecutorId) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.executors_to_pods.get(id).cloned() {
            Some(pod) => {
                inner.pending_removal.insert(id.clone(), pod);
                true
            }
            None => false,
        }
    }

    /// Directly enqueues a pod into `pendingRemoval` without requiring it still be present
    /// in `executorsToPods` — used by the kill path, which removes the main indexes and
    /// the pending-removal entry in the same critical section (spec I2's "within the same
    /// tick" clause).
    pub async fn kill(&self, ids: &[ExecutorId]) -> (Vec<(ExecutorId, Pod)>, Vec<ExecutorId>) {
        let mut inner = self.inner.lock().await;
        let mut killed = Vec::with_capacity(ids.len());
        let mut unknown = Vec::new();
        for id in ids {
            match inner.executors_to_pods.remove(id) {
                Some(pod) => {
                    inner.pod_names_to_executors.remove(&pod_name(&pod));
                    inner.pending_removal.insert(id.clone(), pod.clone());
                    killed.push((id.clone(), pod));
                }
                None => unknown.push(id.clone()),
            }
        }
        (killed, unknown)
    }

    /// Snapshot-and-clear of `pendingRemoval`, for the allocator's disconnect-reconciliation
    /// phase (spec §4.2 step 1).
    pub async fn drain_pending_removals(&self) -> Vec<(ExecutorId, Pod)> {
        let mut inner = self.inner.lock().await;
        inner.pending_removal.drain().collect()
    }

    /// Re-inserts `(id, pod)` into `pendingRemoval` unconditionally, without requiring `id`
    /// still be present in `executorsToPods`. Used to re-enqueue a drained pending-removal
    /// entry whose exit reason hasn't resolved yet: the kill path already removed `id` from
    /// `executorsToPods` up front, so gating on that map (as `mark_pending_removal` does)
    /// would silently drop it instead of giving it another tick to resolve.
    pub async fn requeue_pending_removal(&self, id: ExecutorId, pod: Pod) {
        let mut inner = self.inner.lock().await;
        inner.pending_removal.insert(id, pod);
    }

    pub async fn increment_reason_check_count(&self, id: &ExecutorId) -> u32 {
        let mut inner = self.inner.lock().await;
        let counter = inner.reason_check_counts.entry(id.clone()).or_insert(0);
        *counter += 1;
        *counter
    }

    pub async fn take_known_exit_reason(&self, pod_name: &str) -> Option<ExitReason> {
        let mut inner = self.inner.lock().await;
        inner.known_exit_reasons.remove(pod_name)
    }

    pub async fn put_known_exit_reason(&self, pod_name: String, reason: ExitReason) {
        let mut inner = self.inner.lock().await;
        inner.known_exit_reasons.insert(pod_name, reason);
    }

    pub async fn pod_name_is_released(&self, pod_name: &str) -> bool {
        let inner = self.inner.lock().await;
        !inner.pod_names_to_executors.contains_key(pod_name)
    }

    /// Atomically removes `id` from every map it can appear in: `executorsToPods` (and its
    /// inverse), `pendingRemoval`, `reasonCheckCounts`, and the stale `knownExitReasons`
    /// entry for `pod_name` (spec §4.2: "removed atomically"). Safe to call even if `id`
    /// was already removed from `executorsToPods` by the kill path earlier in the same
    /// tick.
    pub async fn erase_executor(&self, id: &ExecutorId, pod_name: &str) {
        let mut inner = self.inner.lock().await;
        inner.executors_to_pods.remove(id);
        inner.pod_names_to_executors.remove(pod_name);
        inner.pending_removal.remove(id);
        inner.reason_check_counts.remove(id);
        inner.known_exit_reasons.remove(pod_name);
    }

    /// Snapshot-and-clear of `executorsToPods`/`podNamesToExecutors`, for ordered shutdown
    /// (spec §4.7 stop step 3).
    pub async fn drain_all_executors(&self) -> Vec<(ExecutorId, Pod)> {
        let mut inner = self.inner.lock().await;
        inner.pod_names_to_executors.clear();
        inner.executors_to_pods.drain().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod_named(name: &str) -> Pod {
        let mut pod = Pod::default();
        pod.metadata.name = Some(name.to_string());
        pod
    }

    #[tokio::test]
    async fn insert_and_inverse_index_agree() {
        let state = State::new();
        let id = state.next_executor_id();
        assert!(state.insert_allocated(id.clone(), pod_named("p-1")).await);
        let snapshot = state.executors_pods_snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].0, id);
    }

    #[tokio::test]
    async fn duplicate_allocation_is_refused() {
        let state = State::new();
        let id = state.next_executor_id();
        assert!(state.insert_allocated(id.clone(), pod_named("p-1")).await);
        assert!(!state.insert_allocated(id, pod_named("p-2")).await);
    }

    #[tokio::test]
    async fn mark_pending_removal_keeps_executor_allocated() {
        let state = State::new();
        let id = state.next_executor_id();
        state.insert_allocated(id.clone(), pod_named("p-1")).await;
        assert!(state.mark_pending_removal(&id).await);
        assert_eq!(state.executors_count().await, 1);
        let drained = state.drain_pending_removals().await;
        assert_eq!(drained.len(), 1);
    }

    #[tokio::test]
    async fn mark_pending_removal_on_unknown_id_is_noop() {
        let state = State::new();
        let ghost = ExecutorId(999);
        assert!(!state.mark_pending_removal(&ghost).await);
    }

    #[tokio::test]
    async fn erase_executor_cleans_every_map() {
        let state = State::new();
        let id = state.next_executor_id();
        state.insert_allocated(id.clone(), pod_named("p-1")).await;
        state.mark_pending_removal(&id).await;
        state.increment_reason_check_count(&id).await;
        state.put_known_exit_reason("p-1".to_string(), ExitReason::framework(0, "x")).await;

        state.erase_executor(&id, "p-1").await;

        assert_eq!(state.executors_count().await, 0);
        assert!(state.drain_pending_removals().await.is_empty());
        assert!(state.take_known_exit_reason("p-1").await.is_none());
    }

    #[tokio::test]
    async fn kill_removes_from_executors_but_keeps_pending_entry() {
        let state = State::new();
        let id = state.next_executor_id();
        state.insert_allocated(id.clone(), pod_named("p-1")).await;

        let (killed, unknown) = state.kill(&[id.clone()]).await;
        assert_eq!(killed.len(), 1);
        assert!(unknown.is_empty());
        assert_eq!(state.executors_count().await, 0);

        let drained = state.drain_pending_removals().await;
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].0, id);
    }

    #[tokio::test]
    async fn kill_unknown_id_is_reported_separately() {
        let state = State::new();
        let ghost = ExecutorId(42);
        let (killed, unknown) = state.kill(&[ghost.clone()]).await;
        assert!(killed.is_empty());
        assert_eq!(unknown, vec![ghost]);
    }

    #[tokio::test]
    async fn pods_by_ip_is_independent_of_main_lock() {
        let state = State::new();
        state.upsert_pod_by_ip("10.0.0.1".to_string(), pod_named("p-1"));
        assert!(state.pod_by_ip("10.0.0.1").is_some());
        state.remove_pod_by_ip("10.0.0.1");
        assert!(state.pod_by_ip("10.0.0.1").is_none());
    }

    #[tokio::test]
    async fn executor_ids_are_strictly_increasing() {
        let state = State::new();
        let a = state.next_executor_id();
        let b = state.next_executor_id();
        let c = state.next_executor_id();
        assert!(a.0 < b.0);
        assert!(b.0 < c.0);
    }
}
