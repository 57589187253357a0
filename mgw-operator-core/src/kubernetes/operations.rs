use async_trait::async_trait;
use kube::{
    api::{Patch, PatchParams},
    Api, Client,
};
use log::debug;

use crate::{helpers::{pretty_type_name, RequireMetadata}, FIELD_MANAGER};

use super::{ClusterClient, ClusterError, NamespacedResource};

pub struct KubeClusterClient {
    client: Client,
    patch_params: PatchParams,
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            patch_params: PatchParams::apply(FIELD_MANAGER).force(),
        }
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get<K: NamespacedResource>(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<K>, ClusterError> {
        debug!(
            "Fetching '{namespace}/{name}' {} resource...",
            pretty_type_name::<K>()
        );

        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);

        api.get_opt(name).await.map_err(ClusterError::KubeApi)
    }

    async fn upsert<K: NamespacedResource>(&self, resource: &K) -> Result<(), ClusterError> {
        let name = resource.require_name_or(ClusterError::MissingMetadata)?;
        let namespace = resource.require_namespace_or(ClusterError::MissingMetadata)?;

        debug!(
            "Applying '{namespace}/{name}' {} resource...",
            pretty_type_name::<K>()
        );

        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.patch(name, &self.patch_params, &Patch::Apply(resource))
            .await
            .map_err(ClusterError::KubeApi)?;

        Ok(())
    }
}
