use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::ConfigMap;
use log::info;
use serde::{Deserialize, Serialize};

use crate::{
    kubernetes::ClusterClient, DEPLOYMENT_CONFIGS_CONFIGMAPS_KEY, DEPLOYMENT_CONFIGS_NAME,
    DEPLOYMENT_CONFIGS_SECRETS_KEY,
};

use super::{SynthesisError, SynthesisWarning, Synthesized};

pub const READINESS_PROBE_INITIAL_DELAY_SECONDS: &str = "readinessProbeInitialDelaySeconds";
pub const READINESS_PROBE_PERIOD_SECONDS: &str = "readinessProbePeriodSeconds";
pub const LIVENESS_PROBE_INITIAL_DELAY_SECONDS: &str = "livenessProbeInitialDelaySeconds";
pub const LIVENESS_PROBE_PERIOD_SECONDS: &str = "livenessProbePeriodSeconds";

pub const RESOURCE_REQUEST_CPU: &str = "resourceRequestCPU";
pub const RESOURCE_REQUEST_MEMORY: &str = "resourceRequestMemory";
pub const RESOURCE_LIMIT_CPU: &str = "resourceLimitCPU";
pub const RESOURCE_LIMIT_MEMORY: &str = "resourceLimitMemory";

/// A configuration or secret bundle to be mounted into the microgateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleRef {
    pub name: String,
    #[serde(default)]
    pub mount_location: String,
    #[serde(default)]
    pub sub_path: String,
    #[serde(default)]
    pub namespace: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleLists {
    pub config_maps: Vec<BundleRef>,
    pub secrets: Vec<BundleRef>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeTuning {
    pub readiness_initial_delay: i32,
    pub readiness_period: i32,
    pub liveness_initial_delay: i32,
    pub liveness_period: i32,
}

/// The single effective set of deployment tuning values for a tenant namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationLayer {
    /// namespace the layer was read from, `None` when no layer exists
    pub namespace: Option<String>,
    pub data: BTreeMap<String, String>,
}

impl ConfigurationLayer {
    pub fn from_configmap(configmap: ConfigMap) -> Self {
        Self {
            namespace: configmap.metadata.namespace,
            data: configmap.data.unwrap_or_default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(|value| value.as_str())
    }

    pub fn bundle_lists(&self) -> Synthesized<BundleLists> {
        let mut result = Synthesized::new(());
        let config_maps = self.decode_bundle_list(DEPLOYMENT_CONFIGS_CONFIGMAPS_KEY, &mut result);
        let secrets = self.decode_bundle_list(DEPLOYMENT_CONFIGS_SECRETS_KEY, &mut result);

        result.map(|_| BundleLists {
            config_maps,
            secrets,
        })
    }

    fn decode_bundle_list<T>(
        &self,
        key: &'static str,
        result: &mut Synthesized<T>,
    ) -> Vec<BundleRef> {
        let raw = match self.get(key) {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return Vec::new(),
        };

        match serde_yaml::from_str::<Option<Vec<BundleRef>>>(raw) {
            Ok(refs) => refs.unwrap_or_default(),
            Err(error) => {
                result.warn(SynthesisWarning::BundleListUndecodable {
                    key,
                    reason: error.to_string(),
                });

                Vec::new()
            }
        }
    }

    pub fn probe_tuning(&self) -> Synthesized<ProbeTuning> {
        let mut result = Synthesized::new(());
        let tuning = ProbeTuning {
            readiness_initial_delay: self
                .tuning_int(READINESS_PROBE_INITIAL_DELAY_SECONDS, &mut result),
            readiness_period: self.tuning_int(READINESS_PROBE_PERIOD_SECONDS, &mut result),
            liveness_initial_delay: self
                .tuning_int(LIVENESS_PROBE_INITIAL_DELAY_SECONDS, &mut result),
            liveness_period: self.tuning_int(LIVENESS_PROBE_PERIOD_SECONDS, &mut result),
        };

        result.map(|_| tuning)
    }

    fn tuning_int<T>(&self, key: &'static str, result: &mut Synthesized<T>) -> i32 {
        match self.get(key) {
            None => 0,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                result.warn(SynthesisWarning::InvalidTuningValue {
                    key,
                    value: raw.to_owned(),
                });

                0
            }),
        }
    }
}

/// Finds the effective layer: the tenant namespace wins, the control namespace is the fallback.
///
/// The flag is `false` when neither namespace holds one, the returned layer is then empty.
pub async fn resolve_layer<C: ClusterClient>(
    client: &C,
    tenant_namespace: &str,
    control_namespace: &str,
) -> Result<(ConfigurationLayer, bool), SynthesisError> {
    if let Some(configmap) = lookup_layer(client, tenant_namespace).await? {
        return Ok((ConfigurationLayer::from_configmap(configmap), true));
    }

    info!(
        "No '{DEPLOYMENT_CONFIGS_NAME}' in '{tenant_namespace}' namespace, \
        falling back to '{control_namespace}'..."
    );

    match lookup_layer(client, control_namespace).await? {
        Some(configmap) => Ok((ConfigurationLayer::from_configmap(configmap), true)),
        None => Ok((ConfigurationLayer::default(), false)),
    }
}

async fn lookup_layer<C: ClusterClient>(
    client: &C,
    namespace: &str,
) -> Result<Option<ConfigMap>, SynthesisError> {
    client
        .get::<ConfigMap>(DEPLOYMENT_CONFIGS_NAME, namespace)
        .await
        .map_err(|source| SynthesisError::LayerLookup {
            namespace: namespace.to_owned(),
            source,
        })
}
