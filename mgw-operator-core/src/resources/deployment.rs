use k8s_openapi::{
    api::{
        apps::v1::{Deployment, DeploymentSpec},
        core::v1::{Container, LocalObjectReference, PodSpec, PodTemplateSpec, Volume},
    },
    apimachinery::pkg::apis::meta::v1::{LabelSelector, OwnerReference},
};
use kube::core::ObjectMeta;

use super::{labels::get_api_labels, workload::WorkloadDefinition};

impl WorkloadDefinition {
    pub fn generate_metadata(&self, owner_references: Vec<OwnerReference>) -> ObjectMeta {
        ObjectMeta {
            labels: Some(get_api_labels(&self.name)),
            namespace: Some(self.namespace.to_owned()),
            name: Some(self.name.to_owned()),
            owner_references: Some(owner_references),
            ..Default::default()
        }
    }

    /// Wraps the assembled containers into the workload's deployment.
    pub fn generate_deployment(
        &self,
        containers: Vec<Container>,
        volumes: Vec<Volume>,
        image_pull_secrets: Vec<LocalObjectReference>,
        owner_references: Vec<OwnerReference>,
    ) -> Deployment {
        let labels = get_api_labels(&self.name);

        Deployment {
            metadata: self.generate_metadata(owner_references),
            spec: Some(DeploymentSpec {
                replicas: Some(self.replicas),
                selector: LabelSelector {
                    match_expressions: None,
                    match_labels: Some(labels.to_owned()),
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(labels),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers,
                        volumes: Some(volumes),
                        image_pull_secrets: Some(image_pull_secrets),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}
