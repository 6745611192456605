use k8s_openapi::api::core::v1::Pod;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::color;
use crate::pod_ext::PodExt;
use crate::state::State;
use crate::types::ExitReason;

/// A pod-lifecycle event labelled to this application id, as delivered by `ClusterClient`.
/// Mirrors `kube_runtime::watcher::Event` (`Applied` folds together the underlying watch
/// API's ADDED/MODIFIED verbs; `Restarted` carries a relist snapshot after a reconnect).
#[derive(Debug, Clone)]
pub enum PodEvent {
    Applied(Pod),
    Deleted(Pod),
    Restarted(Vec<Pod>),
}

/// Consumes the labelled pod watch stream and classifies transitions into `podsByIP`
/// updates or `knownExitReasons` records (spec §4.3). Holds only a shared handle to
/// `State`; it never calls back into the parent scheduler directly — that is the
/// Allocator's job (spec §9: "single resolver").
pub struct Watcher {
    state: std::sync::Arc<State>,
}

impl Watcher {
    pub fn new(state: std::sync::Arc<State>) -> Self {
        Watcher { state }
    }

    /// Runs until the event channel closes. `ClusterClient::watch_pods_with_label` is
    /// expected to wrap its own stream in a reconnect/backoff loop (spec §4.3.1); this
    /// function simply classifies whatever it is handed, in order.
    pub async fn run(&self, mut events: UnboundedReceiver<PodEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        log::debug!("pod watch event stream closed");
    }

    pub async fn handle_event(&self, event: PodEvent) {
        match event {
            PodEvent::Applied(pod) => self.handle_applied(pod).await,
            PodEvent::Deleted(pod) => self.handle_terminal(pod, TerminalKind::Deleted).await,
            PodEvent::Restarted(pods) => {
                for pod in pods {
                    self.handle_applied(pod).await;
                }
            }
        }
    }

    async fn handle_applied(&self, pod: Pod) {
        if pod.is_running() && !pod.has_deletion_timestamp() {
            if let Some(ip) = pod.pod_ip() {
                self.state.upsert_pod_by_ip(ip.to_string(), pod);
            }
            return;
        }
        if !pod.is_terminal() {
            // Pending/Unknown/other non-terminal phases: not yet running, not yet resolved
            // either way. Nothing to record until a genuine terminal transition arrives.
            return;
        }
        self.handle_terminal(pod, TerminalKind::ModifiedTerminal).await;
    }

    async fn handle_terminal(&self, pod: Pod, kind: TerminalKind) {
        if let Some(ip) = pod.pod_ip() {
            self.state.remove_pod_by_ip(ip);
        }

        let name = pod.name();
        let exit_code = pod.primary_exit_code();
        let reason = match kind {
            TerminalKind::ModifiedTerminal => {
                // "Error branch": a pod transitioning to a terminal phase in place.
                if self.state.pod_name_is_released(&name).await {
                    ExitReason::framework(exit_code, "Pod was explicitly terminated by a prior termination request.")
                } else {
                    ExitReason::application(
                        exit_code,
                        format!("Pod's primary container exited with exit status code {}.", exit_code),
                    )
                }
            }
            TerminalKind::Deleted => {
                // "Delete branch": always framework-caused, message distinguishes intent.
                if self.state.pod_name_is_released(&name).await {
                    ExitReason::framework(exit_code, "Pod was explicitly terminated by a prior termination request.")
                } else {
                    ExitReason::framework(exit_code, "Pod was deleted or lost from the cluster.")
                }
            }
        };
        log::info!("recorded exit reason for pod {}: {:?}", color::cyan(name.clone()), reason);
        self.state.put_known_exit_reason(name, reason).await;
    }
}

enum TerminalKind {
    ModifiedTerminal,
    Deleted,
}
