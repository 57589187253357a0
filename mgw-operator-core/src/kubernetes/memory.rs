use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Mutex,
};

use async_trait::async_trait;
use kube::core::ErrorResponse;
use serde_json::Value;

use crate::helpers::RequireMetadata;

use super::{ClusterClient, ClusterError, NamespacedResource};

type ObjectKey = (String, String, String);

/// Cluster stand-in keeping objects as JSON, keyed by kind, namespace and name.
#[derive(Default)]
pub struct MemoryClusterClient {
    objects: Mutex<BTreeMap<ObjectKey, Value>>,
    failing_gets: Mutex<BTreeSet<ObjectKey>>,
    failing_upserts: Mutex<BTreeSet<ObjectKey>>,
    upserts: Mutex<Vec<ObjectKey>>,
}

fn key_of<K: NamespacedResource>(name: &str, namespace: &str) -> ObjectKey {
    (
        K::kind(&()).into_owned(),
        namespace.to_owned(),
        name.to_owned(),
    )
}

fn forbidden(name: &str) -> ClusterError {
    ClusterError::KubeApi(kube::Error::Api(ErrorResponse {
        status: "Failure".to_owned(),
        message: format!("access to '{name}' is forbidden"),
        reason: "Forbidden".to_owned(),
        code: 403,
    }))
}

impl MemoryClusterClient {
    pub fn with<K: NamespacedResource>(self, resource: K) -> Self {
        self.insert(&resource);

        self
    }

    pub fn insert<K: NamespacedResource>(&self, resource: &K) {
        let name = resource.require_name_or(()).expect("test object needs a name");
        let namespace = resource
            .require_namespace_or(())
            .expect("test object needs a namespace");
        let value = serde_json::to_value(resource).expect("test object must serialize");

        self.objects
            .lock()
            .unwrap()
            .insert(key_of::<K>(name, namespace), value);
    }

    pub fn fail_get<K: NamespacedResource>(self, name: &str, namespace: &str) -> Self {
        self.failing_gets
            .lock()
            .unwrap()
            .insert(key_of::<K>(name, namespace));

        self
    }

    pub fn fail_upsert<K: NamespacedResource>(self, name: &str, namespace: &str) -> Self {
        self.failing_upserts
            .lock()
            .unwrap()
            .insert(key_of::<K>(name, namespace));

        self
    }

    pub fn stored<K: NamespacedResource>(&self, name: &str, namespace: &str) -> Option<K> {
        self.objects
            .lock()
            .unwrap()
            .get(&key_of::<K>(name, namespace))
            .map(|value| serde_json::from_value(value.clone()).expect("stored object must parse"))
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.lock().unwrap().len()
    }
}

#[async_trait]
impl ClusterClient for MemoryClusterClient {
    async fn get<K: NamespacedResource>(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<K>, ClusterError> {
        let key = key_of::<K>(name, namespace);

        if self.failing_gets.lock().unwrap().contains(&key) {
            return Err(forbidden(name));
        }

        let value = self.objects.lock().unwrap().get(&key).cloned();

        value
            .map(serde_json::from_value)
            .transpose()
            .map_err(ClusterError::Serialization)
    }

    async fn upsert<K: NamespacedResource>(&self, resource: &K) -> Result<(), ClusterError> {
        let name = resource.require_name_or(ClusterError::MissingMetadata)?;
        let namespace = resource.require_namespace_or(ClusterError::MissingMetadata)?;
        let key = key_of::<K>(name, namespace);

        if self.failing_upserts.lock().unwrap().contains(&key) {
            return Err(forbidden(name));
        }

        let value = serde_json::to_value(resource).map_err(ClusterError::Serialization)?;

        self.objects.lock().unwrap().insert(key.clone(), value);
        self.upserts.lock().unwrap().push(key);

        Ok(())
    }
}
