use backoff::{backoff::Backoff, ExponentialBackoff};
use futures_util::{StreamExt, TryStreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams};
use kube_runtime::watcher::{watcher as watch_stream, Event as KubeEvent};
use scheduler_core::collaborators::WatchHandle;
use scheduler_core::watcher::PodEvent;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use async_trait::async_trait;

/// Reconnect policy around the raw watch stream (spec §4.3.1): on a transient API error,
/// back off exponentially and retry the same list/watch; only a caller-initiated
/// cancellation or a closed sink ends the loop for good.
pub fn spawn<K: AsRef<str>, V: AsRef<str>>(
    api: Api<Pod>,
    label_key: K,
    label_value: V,
    sink: UnboundedSender<PodEvent>,
) -> KubeWatchHandle {
    let selector = format!("{}={}", label_key.as_ref(), label_value.as_ref());
    let cancel = CancellationToken::new();
    let task_cancel = cancel.clone();
    let task = tokio::spawn(async move {
        run(api, selector, sink, task_cancel).await;
    });
    KubeWatchHandle { task, cancel }
}

async fn run(
    api: Api<Pod>,
    selector: String,
    sink: UnboundedSender<PodEvent>,
    cancel: CancellationToken,
) {
    let mut backoff = ExponentialBackoff::default();
    let mut stream = watch_stream(api.clone(), ListParams::default().labels(&selector)).boxed();

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => return,
            next = stream.try_next() => next,
        };

        let event = match next {
            Ok(Some(event)) => event,
            Ok(None) => {
                log::warn!("pod watch stream for selector {} closed; restarting", selector);
                stream = watch_stream(api.clone(), ListParams::default().labels(&selector)).boxed();
                continue;
            }
            Err(err) => match backoff.next_backoff() {
                Some(duration) => {
                    log::warn!("pod watch error for selector {}: {}; retrying in {:?}", selector, err, duration);
                    tokio::time::sleep(duration).await;
                    continue;
                }
                None => {
                    log::error!("pod watch for selector {} gave up after {:?}", selector, backoff.get_elapsed_time());
                    return;
                }
            },
        };
        backoff.reset();

        let mapped = match event {
            KubeEvent::Applied(pod) => PodEvent::Applied(pod),
            KubeEvent::Deleted(pod) => PodEvent::Deleted(pod),
            KubeEvent::Restarted(pods) => PodEvent::Restarted(pods),
        };
        if sink.send(mapped).is_err() {
            log::debug!("pod watch sink for selector {} closed; stopping", selector);
            return;
        }
    }
}

pub struct KubeWatchHandle {
    task: JoinHandle<()>,
    cancel: CancellationToken,
}

#[async_trait]
impl WatchHandle for KubeWatchHandle {
    async fn close(self: Box<Self>) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}
