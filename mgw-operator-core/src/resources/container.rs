use std::collections::BTreeMap;

use k8s_openapi::{
    api::core::v1::{
        Container, ContainerPort, EnvVar, HTTPGetAction, Probe, ResourceRequirements, VolumeMount,
    },
    apimachinery::pkg::{api::resource::Quantity, util::intstr::IntOrString},
};

use super::{
    config::{MgwSettings, RegistryConfig, OBSERVABILITY_PROMETHEUS_PORT},
    layer::{
        ConfigurationLayer, ProbeTuning, RESOURCE_LIMIT_CPU, RESOURCE_LIMIT_MEMORY,
        RESOURCE_REQUEST_CPU, RESOURCE_REQUEST_MEMORY,
    },
    quantity::parse_quantity,
    workload::WorkloadDefinition,
    SynthesisError, SynthesisWarning, Synthesized,
};

pub const HEALTH_CHECK_PATH: &str = "/health";
pub const HEALTH_CHECK_SCHEME: &str = "HTTPS";
pub const PROBE_TIMEOUT_SECONDS: i32 = 1;
pub const IMAGE_PULL_POLICY: &str = "Always";

const ENV_KEY_VALUE_SEPARATOR: char = '=';

/// Everything about the microgateway container that can fail, settled before any
/// cluster object is touched.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerPlan {
    pub name: String,
    pub image: String,
    pub resources: ResourceRequirements,
    pub tuning: ProbeTuning,
    pub env: Vec<EnvVar>,
}

/// Validates the layer's budget and the workload's env entries and picks the image.
pub fn plan(
    workload: &WorkloadDefinition,
    layer: &ConfigurationLayer,
    registry: &RegistryConfig,
) -> Result<Synthesized<ContainerPlan>, SynthesisError> {
    let mut result = Synthesized::new(());

    let resources = result.absorb(resource_budget(layer)?);
    let tuning = result.absorb(layer.probe_tuning());
    let env = merge_env(&registry.env, &workload.environment_variables)?;
    let image = workload
        .image_override()
        .unwrap_or(registry.image_path.as_str())
        .to_owned();

    Ok(result.map(|_| ContainerPlan {
        name: workload.container_name(),
        image,
        resources,
        tuning,
        env,
    }))
}

impl ContainerPlan {
    pub fn into_container(
        self,
        settings: &MgwSettings,
        volume_mounts: Vec<VolumeMount>,
    ) -> Container {
        Container {
            name: self.name,
            image: Some(self.image),
            image_pull_policy: Some(IMAGE_PULL_POLICY.to_owned()),
            resources: Some(self.resources),
            volume_mounts: Some(volume_mounts),
            env: Some(self.env),
            ports: Some(container_ports(settings)),
            readiness_probe: Some(https_health_probe(
                settings.https_port,
                self.tuning.readiness_initial_delay,
                self.tuning.readiness_period,
            )),
            liveness_probe: Some(https_health_probe(
                settings.https_port,
                self.tuning.liveness_initial_delay,
                self.tuning.liveness_period,
            )),
            ..Default::default()
        }
    }
}

/// Builds the microgateway container serving the workload's API.
pub fn assemble(
    workload: &WorkloadDefinition,
    layer: &ConfigurationLayer,
    registry: &RegistryConfig,
    settings: &MgwSettings,
    volume_mounts: Vec<VolumeMount>,
) -> Result<Synthesized<Container>, SynthesisError> {
    Ok(plan(workload, layer, registry)?.map(|plan| plan.into_container(settings, volume_mounts)))
}

/// Requests and limits from the layer. Unset quantities are left out, malformed ones are fatal.
pub fn resource_budget(
    layer: &ConfigurationLayer,
) -> Result<Synthesized<ResourceRequirements>, SynthesisError> {
    let mut result = Synthesized::new(());

    let requests = quantities(
        layer,
        [("cpu", RESOURCE_REQUEST_CPU), ("memory", RESOURCE_REQUEST_MEMORY)],
        &mut result,
    )?;
    let limits = quantities(
        layer,
        [("cpu", RESOURCE_LIMIT_CPU), ("memory", RESOURCE_LIMIT_MEMORY)],
        &mut result,
    )?;

    Ok(result.map(|_| ResourceRequirements {
        requests: (!requests.is_empty()).then_some(requests),
        limits: (!limits.is_empty()).then_some(limits),
        ..Default::default()
    }))
}

fn quantities(
    layer: &ConfigurationLayer,
    keys: [(&str, &'static str); 2],
    result: &mut Synthesized<()>,
) -> Result<BTreeMap<String, Quantity>, SynthesisError> {
    let mut list = BTreeMap::new();

    for (resource, key) in keys {
        match layer.get(key) {
            None => result.warn(SynthesisWarning::MissingQuantity { key }),
            Some(raw) => {
                let quantity = parse_quantity(raw).ok_or_else(|| SynthesisError::InvalidQuantity {
                    key,
                    value: raw.to_owned(),
                })?;

                list.insert(resource.to_owned(), quantity);
            }
        }
    }

    Ok(list)
}

/// Splits a `KEY=VALUE` entry on the first separator only.
pub fn parse_env_var(raw: &str) -> Result<EnvVar, SynthesisError> {
    let (name, value) = raw
        .split_once(ENV_KEY_VALUE_SEPARATOR)
        .ok_or_else(|| SynthesisError::MalformedEnvVar(raw.to_owned()))?;

    Ok(EnvVar {
        name: name.to_owned(),
        value: Some(value.to_owned()),
        ..Default::default()
    })
}

/// Registry defaults first, workload entries appended after them as given.
pub fn merge_env(defaults: &[EnvVar], overrides: &[String]) -> Result<Vec<EnvVar>, SynthesisError> {
    let mut env = defaults.to_vec();

    for raw in overrides {
        env.push(parse_env_var(raw)?);
    }

    Ok(env)
}

pub fn container_ports(settings: &MgwSettings) -> Vec<ContainerPort> {
    let mut ports = vec![
        container_port("http", settings.http_port),
        container_port("https", settings.https_port),
    ];

    if settings.observability_enabled {
        ports.push(container_port("metrics", OBSERVABILITY_PROMETHEUS_PORT));
    }

    ports
}

fn container_port(name: &str, port: i32) -> ContainerPort {
    ContainerPort {
        name: Some(name.to_owned()),
        container_port: port,
        ..Default::default()
    }
}

pub fn https_health_probe(https_port: i32, initial_delay: i32, period: i32) -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some(HEALTH_CHECK_PATH.to_owned()),
            port: IntOrString::Int(https_port),
            scheme: Some(HEALTH_CHECK_SCHEME.to_owned()),
            ..Default::default()
        }),
        initial_delay_seconds: Some(initial_delay),
        period_seconds: Some(period),
        timeout_seconds: Some(PROBE_TIMEOUT_SECONDS),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::{
        api::core::v1::{EnvVar, VolumeMount},
        apimachinery::pkg::{api::resource::Quantity, util::intstr::IntOrString},
    };

    use crate::resources::{
        config::{MgwSettings, RegistryConfigBuilder},
        layer::ConfigurationLayer,
        workload::WorkloadDefinitionBuilder,
        SynthesisError, SynthesisWarning,
    };

    use super::{assemble, container_ports, merge_env, parse_env_var, plan, resource_budget};

    fn layer(entries: &[(&str, &str)]) -> ConfigurationLayer {
        ConfigurationLayer {
            namespace: Some("wso2-system".to_owned()),
            data: entries
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
        }
    }

    fn full_budget() -> ConfigurationLayer {
        layer(&[
            ("resourceRequestCPU", "100m"),
            ("resourceRequestMemory", "256Mi"),
            ("resourceLimitCPU", "500m"),
            ("resourceLimitMemory", "512Mi"),
            ("readinessProbeInitialDelaySeconds", "8"),
            ("readinessProbePeriodSeconds", "5"),
            ("livenessProbeInitialDelaySeconds", "10"),
            ("livenessProbePeriodSeconds", "30"),
        ])
    }

    fn env(name: &str, value: &str) -> EnvVar {
        EnvVar {
            name: name.to_owned(),
            value: Some(value.to_owned()),
            ..Default::default()
        }
    }

    #[test]
    fn env_splits_on_first_separator() {
        assert_eq!(parse_env_var("A=B=C").unwrap(), env("A", "B=C"));
        assert_eq!(parse_env_var("EMPTY=").unwrap(), env("EMPTY", ""));
    }

    #[test]
    fn env_without_separator_is_rejected() {
        assert!(matches!(
            parse_env_var("A"),
            Err(SynthesisError::MalformedEnvVar(raw)) if raw == "A"
        ));
    }

    #[test]
    fn merge_appends_without_deduplicating() {
        let merged = merge_env(
            &[env("LOG_LEVEL", "info")],
            &["LOG_LEVEL=debug".to_owned(), "JAVA_OPTS=-Xmx=1g".to_owned()],
        )
        .unwrap();

        assert_eq!(
            merged,
            vec![
                env("LOG_LEVEL", "info"),
                env("LOG_LEVEL", "debug"),
                env("JAVA_OPTS", "-Xmx=1g"),
            ]
        );
    }

    #[test]
    fn ports_without_observability() {
        let ports = container_ports(&MgwSettings::default());

        assert_eq!(
            ports.iter().map(|p| p.container_port).collect::<Vec<_>>(),
            vec![9090, 9095]
        );
    }

    #[test]
    fn observability_port_comes_last() {
        let settings = MgwSettings {
            observability_enabled: true,
            ..Default::default()
        };
        let ports = container_ports(&settings);

        assert_eq!(
            ports.iter().map(|p| p.container_port).collect::<Vec<_>>(),
            vec![9090, 9095, 9797]
        );
    }

    #[test]
    fn budget_reads_all_quantities() {
        let budget = resource_budget(&full_budget()).unwrap();

        assert!(!budget.is_degraded());
        assert_eq!(
            budget.value.requests,
            Some(BTreeMap::from([
                ("cpu".to_owned(), Quantity("100m".to_owned())),
                ("memory".to_owned(), Quantity("256Mi".to_owned())),
            ]))
        );
        assert_eq!(
            budget.value.limits.unwrap().get("cpu"),
            Some(&Quantity("500m".to_owned()))
        );
    }

    #[test]
    fn unparseable_cpu_limit_is_fatal() {
        let mut broken = full_budget();
        broken
            .data
            .insert("resourceLimitCPU".to_owned(), "half a core".to_owned());

        let workload = WorkloadDefinitionBuilder::default()
            .name("orders")
            .namespace("team-a")
            .build()
            .unwrap();
        let result = assemble(
            &workload,
            &broken,
            &Default::default(),
            &MgwSettings::default(),
            Vec::new(),
        );

        assert!(matches!(
            result,
            Err(SynthesisError::InvalidQuantity { key: "resourceLimitCPU", .. })
        ));
    }

    #[test]
    fn unset_quantities_are_left_out() {
        let budget = resource_budget(&layer(&[("resourceLimitMemory", "1Gi")])).unwrap();

        assert!(budget.value.requests.is_none());
        assert_eq!(budget.value.limits.as_ref().map(|l| l.len()), Some(1));
        assert_eq!(
            budget.warnings,
            vec![
                SynthesisWarning::MissingQuantity { key: "resourceRequestCPU" },
                SynthesisWarning::MissingQuantity { key: "resourceRequestMemory" },
                SynthesisWarning::MissingQuantity { key: "resourceLimitCPU" },
            ]
        );
    }

    #[test]
    fn assembles_container_from_layer_and_registry() {
        let workload = WorkloadDefinitionBuilder::default()
            .name("orders")
            .namespace("team-a")
            .replicas(2)
            .environment_variables(vec!["LOG_LEVEL=debug".to_owned()])
            .build()
            .unwrap();
        let registry = RegistryConfigBuilder::default()
            .image_path("registry/mgw:1.0")
            .env(vec![env("JAVA_OPTS", "-Xms256m")])
            .build()
            .unwrap();

        let container = assemble(
            &workload,
            &full_budget(),
            &registry,
            &MgwSettings::default(),
            Vec::new(),
        )
        .unwrap()
        .value;

        assert_eq!(container.name, "mgworders");
        assert_eq!(container.image.as_deref(), Some("registry/mgw:1.0"));
        assert_eq!(container.image_pull_policy.as_deref(), Some("Always"));
        assert_eq!(
            container.env.unwrap(),
            vec![env("JAVA_OPTS", "-Xms256m"), env("LOG_LEVEL", "debug")]
        );

        let readiness = container.readiness_probe.unwrap();
        assert_eq!(readiness.initial_delay_seconds, Some(8));
        assert_eq!(readiness.period_seconds, Some(5));
        assert_eq!(readiness.timeout_seconds, Some(1));
        let http_get = readiness.http_get.unwrap();
        assert_eq!(http_get.path.as_deref(), Some("/health"));
        assert_eq!(http_get.port, IntOrString::Int(9095));
        assert_eq!(http_get.scheme.as_deref(), Some("HTTPS"));

        let liveness = container.liveness_probe.unwrap();
        assert_eq!(liveness.initial_delay_seconds, Some(10));
        assert_eq!(liveness.period_seconds, Some(30));
    }

    #[test]
    fn workload_image_overrides_registry_default() {
        let workload = WorkloadDefinitionBuilder::default()
            .name("orders")
            .namespace("team-a")
            .image("registry/orders-gw:3.1")
            .build()
            .unwrap();
        let registry = RegistryConfigBuilder::default()
            .image_path("registry/mgw:1.0")
            .build()
            .unwrap();

        let container = assemble(
            &workload,
            &full_budget(),
            &registry,
            &MgwSettings::default(),
            Vec::new(),
        )
        .unwrap()
        .value;

        assert_eq!(container.image.as_deref(), Some("registry/orders-gw:3.1"));
    }

    #[test]
    fn missing_images_leave_an_empty_reference() {
        let workload = WorkloadDefinitionBuilder::default()
            .name("orders")
            .namespace("team-a")
            .build()
            .unwrap();

        let container = assemble(
            &workload,
            &full_budget(),
            &Default::default(),
            &MgwSettings::default(),
            Vec::new(),
        )
        .unwrap()
        .value;

        assert_eq!(container.image.as_deref(), Some(""));
    }

    #[test]
    fn plan_rejects_malformed_env_before_any_mount_is_known() {
        let workload = WorkloadDefinitionBuilder::default()
            .name("orders")
            .namespace("team-a")
            .environment_variables(vec!["LOG_LEVEL=debug".to_owned(), "BROKEN".to_owned()])
            .build()
            .unwrap();

        let result = plan(&workload, &full_budget(), &Default::default());

        assert!(matches!(
            result,
            Err(SynthesisError::MalformedEnvVar(raw)) if raw == "BROKEN"
        ));
    }

    #[test]
    fn planned_container_takes_mounts_and_settings_afterwards() {
        let workload = WorkloadDefinitionBuilder::default()
            .name("orders")
            .namespace("team-a")
            .build()
            .unwrap();
        let settings = MgwSettings {
            https_port: 9443,
            ..Default::default()
        };

        let planned = plan(&workload, &full_budget(), &Default::default()).unwrap();
        assert!(!planned.is_degraded());

        let container = planned.value.into_container(
            &settings,
            vec![VolumeMount {
                name: "mgw-conf-configmap".to_owned(),
                mount_path: "/home/ballerina/conf".to_owned(),
                ..Default::default()
            }],
        );

        assert_eq!(container.name, "mgworders");
        assert_eq!(container.volume_mounts.map(|m| m.len()), Some(1));
        assert_eq!(
            container.liveness_probe.unwrap().http_get.unwrap().port,
            IntOrString::Int(9443)
        );
    }
}
