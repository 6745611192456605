use std::collections::{HashMap, HashSet};

use k8s_openapi::api::core::v1::Pod;

use crate::types::NodeLocality;

/// Resolves a node's canonical hostname from its host IP, so that `nodeLocality` can match
/// keys given as hostnames against pods that only carry the raw IP (spec §4.4). Kept
/// injectable so the allocator's tick doesn't need to perform a real DNS lookup in tests.
pub trait HostnameResolver: Send + Sync {
    fn resolve(&self, host_ip: &str) -> Option<String>;
}

/// The resolver used outside of tests: no reverse lookup, just the identity function. A
/// cluster normally exposes `status.hostIP` directly as a usable key already; callers that
/// need real reverse-DNS can inject a resolver backed by `tokio::net::lookup_host` instead.
pub struct IdentityResolver;

impl HostnameResolver for IdentityResolver {
    fn resolve(&self, host_ip: &str) -> Option<String> {
        Some(host_ip.to_string())
    }
}

fn occupied_keys(pod: &Pod, resolver: &dyn HostnameResolver) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(spec) = &pod.spec {
        if let Some(node_name) = &spec.node_name {
            keys.push(node_name.clone());
        }
    }
    if let Some(status) = &pod.status {
        if let Some(host_ip) = &status.host_ip {
            keys.push(host_ip.clone());
            if let Some(hostname) = resolver.resolve(host_ip) {
                keys.push(hostname);
            }
        }
    }
    keys
}

/// Computes the `nodeLocality` map passed to `PodFactory` on each allocation tick: the
/// parent's `hostToLocalTaskCount` snapshot with any node already occupied by a live
/// executor pod removed entirely (spec §4.4). This is a preference signal, not a
/// constraint — `PodFactory` is free to ignore it.
pub fn compute_node_locality(
    host_to_local_task_count: &HashMap<String, i64>,
    live_pods: &[Pod],
    resolver: &dyn HostnameResolver,
) -> NodeLocality {
    let occupied: HashSet<String> = live_pods
        .iter()
        .flat_map(|pod| occupied_keys(pod, resolver))
        .collect();

    host_to_local_task_count
        .iter()
        .filter(|(host, _)| !occupied.contains(*host))
        .map(|(host, count)| (host.clone(), *count))
        .collect()
}
