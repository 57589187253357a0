use std::collections::HashSet;

use k8s_openapi::api::core::v1::{EmptyDirVolumeSource, Volume, VolumeMount};

use super::{layer::BundleRef, BundleKind};

pub const ANALYTICS_VOLUME_NAME: &str = "analytics";
pub const ANALYTICS_MOUNT_PATH: &str = "/home/ballerina/wso2/api-usage-data/";

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeBinding {
    pub volume: Volume,
    pub mount: VolumeMount,
}

/// Pod volume name for a bundle, suffixed with its kind so a ConfigMap and a Secret
/// sharing a name don't collide.
pub fn volume_name(kind: BundleKind, bundle_name: &str) -> String {
    match kind {
        BundleKind::ConfigMap => format!("{bundle_name}-configmap"),
        BundleKind::Secret => format!("{bundle_name}-secret"),
    }
}

/// Pairs a bundle's volume with the mount described by the reference.
pub fn bind(bundle: &BundleRef, volume: Volume) -> VolumeBinding {
    let mount = VolumeMount {
        name: volume.name.to_owned(),
        mount_path: bundle.mount_location.to_owned(),
        sub_path: (!bundle.sub_path.is_empty()).then(|| bundle.sub_path.to_owned()),
        ..Default::default()
    };

    VolumeBinding { volume, mount }
}

pub fn analytics_binding() -> VolumeBinding {
    VolumeBinding {
        volume: Volume {
            name: ANALYTICS_VOLUME_NAME.to_owned(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        },
        mount: VolumeMount {
            name: ANALYTICS_VOLUME_NAME.to_owned(),
            mount_path: ANALYTICS_MOUNT_PATH.to_owned(),
            ..Default::default()
        },
    }
}

/// Splits bindings into the pod's volumes and the container's mounts, keeping their order.
///
/// A volume referenced more than once is declared only once, every mount is kept.
pub fn split_bindings(bindings: Vec<VolumeBinding>) -> (Vec<Volume>, Vec<VolumeMount>) {
    let mut seen = HashSet::new();
    let mut volumes = Vec::with_capacity(bindings.len());
    let mut mounts = Vec::with_capacity(bindings.len());

    for VolumeBinding { volume, mount } in bindings {
        if seen.insert(volume.name.to_owned()) {
            volumes.push(volume);
        }
        mounts.push(mount);
    }

    (volumes, mounts)
}
