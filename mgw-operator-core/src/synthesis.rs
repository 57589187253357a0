use derive_builder::Builder;
use k8s_openapi::{
    api::{
        apps::v1::Deployment,
        core::v1::{ConfigMap, Container, Secret},
    },
    apimachinery::pkg::apis::meta::v1::OwnerReference,
};
use kube::Resource;
use log::info;

use crate::{
    kubernetes::ClusterClient,
    resources::{
        config::{MgwSettings, RegistryConfig},
        container::plan,
        crd::v1alpha1::api::ApiDefinition,
        layer::{resolve_layer, BundleRef},
        propagation::{check_bundle_namespaces, ensure_bundle, Bundle},
        volumes::{analytics_binding, bind, split_bindings, VolumeBinding},
        workload::WorkloadDefinition,
        SynthesisError, SynthesisWarning, Synthesized,
    },
};

/// Operator-wide inputs shared by every synthesis run.
#[derive(Debug, Clone, Default)]
pub struct SynthesisContext {
    pub settings: MgwSettings,
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, Builder)]
pub struct SynthesisRequest {
    pub workload: WorkloadDefinition,
    #[builder(default)]
    pub owner_references: Vec<OwnerReference>,
    /// containers placed next to the microgateway in the same pod
    #[builder(default)]
    pub additional_containers: Vec<Container>,
}

impl SynthesisRequest {
    /// Request for an API object, owned by that object.
    pub fn for_api(api: &ApiDefinition) -> Result<Self, SynthesisError> {
        let owner = api
            .controller_owner_ref(&())
            .ok_or_else(|| SynthesisError::MissingData("API name or uid".into()))?;

        Ok(Self {
            workload: WorkloadDefinition::from_api(api)?,
            owner_references: vec![owner],
            additional_containers: Vec::new(),
        })
    }
}

/// Resolves the complete microgateway deployment for a workload.
///
/// Shared bundles referenced by the effective configuration layer are copied into
/// the workload's namespace on the way. The returned deployment isn't persisted.
pub async fn synthesize<C: ClusterClient>(
    client: &C,
    context: &SynthesisContext,
    request: SynthesisRequest,
) -> Result<Synthesized<Deployment>, SynthesisError> {
    let SynthesisRequest {
        workload,
        owner_references,
        additional_containers,
    } = request;
    workload.validate()?;
    let tenant_namespace = workload.namespace.as_str();
    let control_namespace = context.settings.control_namespace.as_str();
    let mut result = Synthesized::new(());

    info!(
        "Synthesizing microgateway deployment for '{tenant_namespace}/{}'...",
        workload.name
    );

    let (layer, found) = resolve_layer(client, tenant_namespace, control_namespace).await?;
    if !found {
        result.warn(SynthesisWarning::LayerNotFound);
    }

    // Everything fatal is settled before the first copy lands in the tenant namespace.
    let lists = result.absorb(layer.bundle_lists());
    check_bundle_namespaces(&lists, tenant_namespace)?;
    let container_plan = result.absorb(plan(&workload, &layer, &context.registry)?);

    let mut bindings = Vec::new();
    if context.settings.analytics_enabled {
        bindings.push(analytics_binding());
    }

    let config_map_bindings =
        bind_bundles::<ConfigMap, C>(client, &lists.config_maps, tenant_namespace, control_namespace)
            .await?;
    bindings.extend(result.absorb(config_map_bindings));
    let secret_bindings =
        bind_bundles::<Secret, C>(client, &lists.secrets, tenant_namespace, control_namespace)
            .await?;
    bindings.extend(result.absorb(secret_bindings));

    let (volumes, volume_mounts) = split_bindings(bindings);
    let api_container = container_plan.into_container(&context.settings, volume_mounts);

    let mut containers = vec![api_container];
    containers.extend(additional_containers);

    let deployment = workload.generate_deployment(
        containers,
        volumes,
        context.registry.image_pull_secrets.to_owned(),
        owner_references,
    );

    info!(
        "Synthesized '{tenant_namespace}/{}' deployment with {} warning(s)",
        workload.name,
        result.warnings.len()
    );

    Ok(result.map(|_| deployment))
}

async fn bind_bundles<K: Bundle, C: ClusterClient>(
    client: &C,
    bundles: &[BundleRef],
    tenant_namespace: &str,
    control_namespace: &str,
) -> Result<Synthesized<Vec<VolumeBinding>>, SynthesisError> {
    let mut result = Synthesized::new(Vec::new());

    for bundle in bundles {
        let volume = ensure_bundle::<K, C>(client, bundle, tenant_namespace, control_namespace).await?;

        if let Some(volume) = result.absorb(volume) {
            result.value.push(bind(bundle, volume));
        }
    }

    Ok(result)
}
