use std::fmt::Debug;

use async_trait::async_trait;
use k8s_openapi::{
    serde::{de::DeserializeOwned, Serialize},
    NamespaceResourceScope,
};
use kube::Resource;
use thiserror::Error;

#[cfg(test)]
pub mod memory;
pub mod operations;

/// Any namespaced object the synthesizer reads from or writes to the cluster.
pub trait NamespacedResource:
    Resource<Scope = NamespaceResourceScope, DynamicType = ()>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<T> NamespacedResource for T where
    T: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Kubernetes API request failed! Reason: {}", .0)]
    KubeApi(kube::Error),
    #[error("Object is missing a name or a namespace!")]
    MissingMetadata,
    #[error("Couldn't (de)serialize the object! Reason: {}", .0)]
    Serialization(serde_json::Error),
}

/// Cluster API operations used during synthesis.
///
/// A missing object is reported as `Ok(None)`, every other failure
/// (transport, authorization) as an error.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn get<K: NamespacedResource>(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<K>, ClusterError>;

    /// Creates the object or replaces the fields we manage on an existing one.
    async fn upsert<K: NamespacedResource>(&self, resource: &K) -> Result<(), ClusterError>;
}
