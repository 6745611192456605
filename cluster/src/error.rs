use thiserror::Error;

/// Coarse classification of a failure surfaced by the Kubernetes API client, mirroring the
/// taxonomy this codebase's Kubernetes client libraries have historically used: API-level
/// rejections are distinguished from transport-level connection failures, with everything
/// else folded into a catch-all.
#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("the Kubernetes API server rejected the request: {0}")]
    Api(#[source] kube::Error),

    #[error("failed to connect to the Kubernetes API server: {0}")]
    Connection(#[source] kube::Error),

    #[error("unexpected Kubernetes client error: {0}")]
    Other(#[source] kube::Error),
}

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(_) => ClusterError::Api(err),
            kube::Error::Connection(_) => ClusterError::Connection(err),
            _ => ClusterError::Other(err),
        }
    }
}
