use k8s_openapi::api::core::v1::Pod;

use crate::UNKNOWN_EXIT_CODE;

/// Read-only accessors over a pod's status, mirroring the questions the Watcher and
/// Node-Locality snapshot need answered. Every accessor that talks about "the" container
/// assumes a single primary container per pod (spec §9's preserved open question) and
/// reads `container_statuses[0]` exclusively; attribution for sidecar-bearing pods is
/// undefined, as in the source this was distilled from.
pub trait PodExt {
    fn phase(&self) -> Option<&str>;
    fn is_running(&self) -> bool;
    /// `true` for phases that will never transition again (`Failed`/`Succeeded`) or a pod
    /// already marked for deletion. `Pending`/`Unknown`/absent-status pods are not terminal.
    fn is_terminal(&self) -> bool;
    fn has_deletion_timestamp(&self) -> bool;
    fn pod_ip(&self) -> Option<&str>;
    /// Exit code of the primary container, defaulting to `UNKNOWN_EXIT_CODE` when the pod
    /// has no terminated container status yet (spec §4.3).
    fn primary_exit_code(&self) -> i32;
    fn name(&self) -> String;
}

impl PodExt for Pod {
    fn phase(&self) -> Option<&str> {
        self.status.as_ref()?.phase.as_deref()
    }

    fn is_running(&self) -> bool {
        self.phase() == Some("Running")
    }

    fn is_terminal(&self) -> bool {
        matches!(self.phase(), Some("Failed") | Some("Succeeded")) || self.has_deletion_timestamp()
    }

    fn has_deletion_timestamp(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    fn pod_ip(&self) -> Option<&str> {
        self.status.as_ref()?.pod_ip.as_deref()
    }

    fn primary_exit_code(&self) -> i32 {
        self.status
            .as_ref()
            .and_then(|s| s.container_statuses.as_ref())
            .and_then(|statuses| statuses.first())
            .and_then(|status| status.state.as_ref())
            .and_then(|state| state.terminated.as_ref())
            .map(|terminated| terminated.exit_code)
            .unwrap_or(UNKNOWN_EXIT_CODE as i32)
    }

    fn name(&self) -> String {
        self.metadata.name.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{
        ContainerState, ContainerStateTerminated, ContainerStatus, PodStatus,
    };

    fn terminated_pod(exit_code: i32) -> Pod {
        Pod {
            status: Some(PodStatus {
                container_statuses: Some(vec![ContainerStatus {
                    state: Some(ContainerState {
                        terminated: Some(ContainerStateTerminated {
                            exit_code,
                            ..Default::default()
                        }),
                        ..Default::default()
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn exit_code_defaults_to_unknown() {
        assert_eq!(Pod::default().primary_exit_code(), UNKNOWN_EXIT_CODE as i32);
    }

    #[test]
    fn exit_code_reads_first_container() {
        assert_eq!(terminated_pod(137).primary_exit_code(), 137);
    }

    #[test]
    fn running_requires_exact_phase() {
        let mut pod = Pod::default();
        pod.status = Some(PodStatus {
            phase: Some("Running".to_string()),
            ..Default::default()
        });
        assert!(pod.is_running());
        pod.status.as_mut().unwrap().phase = Some("Pending".to_string());
        assert!(!pod.is_running());
    }

    #[test]
    fn pending_pod_is_not_terminal() {
        let mut pod = Pod::default();
        pod.status = Some(PodStatus {
            phase: Some("Pending".to_string()),
            ..Default::default()
        });
        assert!(!pod.is_terminal());
    }

    #[test]
    fn failed_and_succeeded_phases_are_terminal() {
        let mut pod = Pod::default();
        pod.status = Some(PodStatus {
            phase: Some("Failed".to_string()),
            ..Default::default()
        });
        assert!(pod.is_terminal());
        pod.status.as_mut().unwrap().phase = Some("Succeeded".to_string());
        assert!(pod.is_terminal());
    }

}
