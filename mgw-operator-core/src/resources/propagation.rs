use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Secret, SecretVolumeSource, Volume,
};
use kube::core::ObjectMeta;
use log::{debug, info};

use crate::kubernetes::{ClusterClient, NamespacedResource};

use super::{
    layer::{BundleLists, BundleRef},
    volumes::volume_name,
    BundleKind, SynthesisError, SynthesisWarning, Synthesized,
};

/// A mountable object that can be copied between namespaces.
pub trait Bundle: NamespacedResource {
    const KIND: BundleKind;

    /// Pod volume exposing the bundle called `name`.
    fn volume(name: &str) -> Volume;
}

impl Bundle for ConfigMap {
    const KIND: BundleKind = BundleKind::ConfigMap;

    fn volume(name: &str) -> Volume {
        Volume {
            name: volume_name(Self::KIND, name),
            config_map: Some(ConfigMapVolumeSource {
                name: Some(name.to_owned()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

impl Bundle for Secret {
    const KIND: BundleKind = BundleKind::Secret;

    fn volume(name: &str) -> Volume {
        Volume {
            name: volume_name(Self::KIND, name),
            secret: Some(SecretVolumeSource {
                secret_name: Some(name.to_owned()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// Where a bundle reference says its object lives, relative to the tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleNamespace<'a> {
    /// copy it over from the control namespace
    Unset,
    /// already present in the tenant namespace
    SameAsTenant,
    Other(&'a str),
}

impl<'a> BundleNamespace<'a> {
    pub fn classify(declared: &'a str, tenant_namespace: &str) -> Self {
        if declared.is_empty() {
            BundleNamespace::Unset
        } else if declared.eq_ignore_ascii_case(tenant_namespace) {
            BundleNamespace::SameAsTenant
        } else {
            BundleNamespace::Other(declared)
        }
    }
}

/// Rejects every reference pointing at a namespace other than the tenant's.
pub fn check_bundle_namespaces(
    lists: &BundleLists,
    tenant_namespace: &str,
) -> Result<(), SynthesisError> {
    let refs = lists
        .config_maps
        .iter()
        .map(|bundle| (BundleKind::ConfigMap, bundle))
        .chain(lists.secrets.iter().map(|bundle| (BundleKind::Secret, bundle)));

    for (kind, bundle) in refs {
        if let BundleNamespace::Other(namespace) =
            BundleNamespace::classify(&bundle.namespace, tenant_namespace)
        {
            return Err(SynthesisError::UnsupportedBundleNamespace {
                kind,
                name: bundle.name.to_owned(),
                namespace: namespace.to_owned(),
            });
        }
    }

    Ok(())
}

/// Copies the payload of `source` under a new identity, dropping every other piece of metadata.
pub fn replicate<K: Bundle>(mut source: K, name: &str, namespace: &str) -> K {
    *source.meta_mut() = ObjectMeta {
        name: Some(name.to_owned()),
        namespace: Some(namespace.to_owned()),
        ..Default::default()
    };

    source
}

/// Makes sure the referenced bundle is available in the tenant namespace.
///
/// Resolves to `None` when the source couldn't be read, the reference is then left out
/// of the deployment. A failed copy is only reported, as the tenant namespace may still
/// hold the bundle from an earlier run.
pub async fn ensure_bundle<K: Bundle, C: ClusterClient>(
    client: &C,
    bundle: &BundleRef,
    tenant_namespace: &str,
    control_namespace: &str,
) -> Result<Synthesized<Option<Volume>>, SynthesisError> {
    match BundleNamespace::classify(&bundle.namespace, tenant_namespace) {
        BundleNamespace::SameAsTenant => Ok(Synthesized::new(Some(K::volume(&bundle.name)))),
        BundleNamespace::Other(namespace) => Err(SynthesisError::UnsupportedBundleNamespace {
            kind: K::KIND,
            name: bundle.name.to_owned(),
            namespace: namespace.to_owned(),
        }),
        BundleNamespace::Unset if control_namespace == tenant_namespace => {
            debug!(
                "{} '{}' already lives in the control namespace, nothing to copy",
                K::KIND,
                bundle.name
            );

            Ok(Synthesized::new(Some(K::volume(&bundle.name))))
        }
        BundleNamespace::Unset => {
            replicate_from_control::<K, C>(client, bundle, tenant_namespace, control_namespace)
                .await
        }
    }
}

async fn replicate_from_control<K: Bundle, C: ClusterClient>(
    client: &C,
    bundle: &BundleRef,
    tenant_namespace: &str,
    control_namespace: &str,
) -> Result<Synthesized<Option<Volume>>, SynthesisError> {
    let mut result = Synthesized::new(None);

    let source = match client.get::<K>(&bundle.name, control_namespace).await {
        Ok(Some(source)) => source,
        Ok(None) => {
            result.warn(SynthesisWarning::BundleFetchFailed {
                kind: K::KIND,
                name: bundle.name.to_owned(),
                reason: format!("not found in '{control_namespace}' namespace"),
            });

            return Ok(result);
        }
        Err(error) => {
            result.warn(SynthesisWarning::BundleFetchFailed {
                kind: K::KIND,
                name: bundle.name.to_owned(),
                reason: error.to_string(),
            });

            return Ok(result);
        }
    };

    info!(
        "Copying {} '{}' from '{control_namespace}' to '{tenant_namespace}'...",
        K::KIND,
        bundle.name
    );

    let copy = replicate(source, &bundle.name, tenant_namespace);
    if let Err(error) = client.upsert(&copy).await {
        result.warn(SynthesisWarning::BundleUpsertFailed {
            kind: K::KIND,
            name: bundle.name.to_owned(),
            reason: error.to_string(),
        });
    }

    result.value = Some(K::volume(&bundle.name));

    Ok(result)
}
