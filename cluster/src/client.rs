use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, DeleteParams, PostParams};
use kube::error::ErrorResponse;
use kube::Client;
use scheduler_core::collaborators::{ClusterClient, WatchHandle};
use scheduler_core::watcher::PodEvent;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::ClusterError;
use crate::watch;

/// A `ClusterClient` backed by a real Kubernetes API server, built once at startup and
/// reused for the life of the process. Scoped to a single namespace, matching spec §6's
/// `namespace` configuration option — this core never operates across namespaces.
pub struct KubeClusterClient {
    client: Client,
    namespace: String,
}

impl KubeClusterClient {
    /// Builds the client from the ambient environment (in-cluster service account or the
    /// local kubeconfig), per `kube`'s own `Client::try_default` resolution order.
    pub async fn try_default(namespace: impl Into<String>) -> Result<Self, ClusterError> {
        let client = Client::try_default().await?;
        Ok(KubeClusterClient { client, namespace: namespace.into() })
    }

    pub fn from_client(client: Client, namespace: impl Into<String>) -> Self {
        KubeClusterClient { client, namespace: namespace.into() }
    }

    fn api(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    type Error = ClusterError;

    async fn create_pod(&self, pod: Pod) -> Result<Pod, Self::Error> {
        Ok(self.api(&self.namespace).create(&PostParams::default(), &pod).await?)
    }

    async fn delete_pod(&self, namespace: &str, name: &str) -> Result<(), Self::Error> {
        match self.api(namespace).delete(name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ErrorResponse { code: 404, .. })) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    async fn pod_by_name(&self, namespace: &str, name: &str) -> Result<Pod, Self::Error> {
        Ok(self.api(namespace).get(name).await?)
    }

    async fn watch_pods_with_label(
        &self,
        namespace: &str,
        label_key: &str,
        label_value: &str,
        sink: UnboundedSender<PodEvent>,
    ) -> Result<Box<dyn WatchHandle>, Self::Error> {
        let handle = watch::spawn(self.api(namespace), label_key, label_value, sink);
        Ok(Box::new(handle))
    }

    async fn close(&self) {}
}
