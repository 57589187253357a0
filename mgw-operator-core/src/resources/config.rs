use std::{borrow::Cow, env::var, str::FromStr};

use derive_builder::Builder;
use k8s_openapi::api::core::v1::{ConfigMap, EnvVar, LocalObjectReference};
use thiserror::Error;

use crate::DEFAULT_CONTROL_NAMESPACE;

pub const DEFAULT_HTTP_PORT: i32 = 9090;
pub const DEFAULT_HTTPS_PORT: i32 = 9095;
pub const OBSERVABILITY_PROMETHEUS_PORT: i32 = 9797;

const ENV_CONTROL_NAMESPACE: &str = "MGW_CONTROL_NAMESPACE";
const ENV_HTTP_PORT: &str = "MGW_HTTP_PORT";
const ENV_HTTPS_PORT: &str = "MGW_HTTPS_PORT";
const ENV_OBSERVABILITY_ENABLED: &str = "MGW_OBSERVABILITY_ENABLED";
const ENV_ANALYTICS_ENABLED: &str = "MGW_ANALYTICS_ENABLED";
const ENV_KEYS: [&str; 5] = [
    ENV_CONTROL_NAMESPACE,
    ENV_HTTP_PORT,
    ENV_HTTPS_PORT,
    ENV_OBSERVABILITY_ENABLED,
    ENV_ANALYTICS_ENABLED,
];

const KEY_CONTROL_NAMESPACE: &str = "controlNamespace";
const KEY_HTTP_PORT: &str = "httpPort";
const KEY_HTTPS_PORT: &str = "httpsPort";
const KEY_OBSERVABILITY_ENABLED: &str = "observabilityEnabled";
const KEY_ANALYTICS_ENABLED: &str = "analyticsEnabled";

#[derive(Debug, Error)]
pub enum FromError {
    #[error("ConfigMap data is unset!")]
    MissingData,
    #[error("Value of '{}' couldn't be parsed: {:?}", .0, .1)]
    InvalidValue(Cow<'static, str>, String),
}

/// Operator-wide microgateway settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MgwSettings {
    pub control_namespace: String,
    pub http_port: i32,
    pub https_port: i32,
    pub observability_enabled: bool,
    pub analytics_enabled: bool,
}

impl Default for MgwSettings {
    fn default() -> Self {
        Self {
            control_namespace: DEFAULT_CONTROL_NAMESPACE.to_owned(),
            http_port: DEFAULT_HTTP_PORT,
            https_port: DEFAULT_HTTPS_PORT,
            observability_enabled: false,
            analytics_enabled: false,
        }
    }
}

impl MgwSettings {
    pub fn from_env() -> Result<Self, FromError> {
        Self::from_lookup(|key| var(key).ok(), ENV_KEYS)
    }

    pub fn from_configmap(configmap: &ConfigMap) -> Result<Self, FromError> {
        let data = configmap.data.as_ref().ok_or(FromError::MissingData)?;

        Self::from_lookup(
            |key| data.get(key).map(|value| value.to_owned()),
            [
                KEY_CONTROL_NAMESPACE,
                KEY_HTTP_PORT,
                KEY_HTTPS_PORT,
                KEY_OBSERVABILITY_ENABLED,
                KEY_ANALYTICS_ENABLED,
            ],
        )
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        [namespace, http, https, observability, analytics]: [&'static str; 5],
    ) -> Result<Self, FromError> {
        let defaults = Self::default();

        Ok(Self {
            control_namespace: lookup(namespace)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(defaults.control_namespace),
            http_port: parse_or(&lookup, http, defaults.http_port)?,
            https_port: parse_or(&lookup, https, defaults.https_port)?,
            observability_enabled: parse_or(&lookup, observability, false)?,
            analytics_enabled: parse_or(&lookup, analytics, false)?,
        })
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, FromError> {
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| FromError::InvalidValue(key.into(), raw)),
        _ => Ok(default),
    }
}

/// Image registry defaults applied to every microgateway container.
#[derive(Debug, Clone, Default, Builder)]
#[builder(default)]
pub struct RegistryConfig {
    #[builder(setter(into))]
    pub image_path: String,
    pub env: Vec<EnvVar>,
    pub image_pull_secrets: Vec<LocalObjectReference>,
}
