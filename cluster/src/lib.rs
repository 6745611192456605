//! A `kube`-backed implementation of `scheduler_core`'s `ClusterClient` trait. This is the
//! only crate in the workspace that talks to the Kubernetes API server directly; everything
//! upstream of it is written against the trait, not this client.

pub mod client;
pub mod error;
mod watch;

pub use client::KubeClusterClient;
pub use error::ClusterError;
