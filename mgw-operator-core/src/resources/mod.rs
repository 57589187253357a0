use std::{borrow::Cow, fmt::Display};

use log::warn;
use thiserror::Error;

use crate::{kubernetes::ClusterError, DEPLOYMENT_CONFIGS_NAME};

pub mod config;
pub mod container;
pub mod crd;
pub mod deployment;
pub mod labels;
pub mod layer;
pub mod propagation;
pub mod quantity;
pub mod volumes;
pub mod workload;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleKind {
    ConfigMap,
    Secret,
}

impl Display for BundleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BundleKind::ConfigMap => write!(f, "ConfigMap"),
            BundleKind::Secret => write!(f, "Secret"),
        }
    }
}

/// Conditions that abort synthesis, no manifest is produced.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Couldn't read '{}' from '{}' namespace! Reason: {}", DEPLOYMENT_CONFIGS_NAME, .namespace, .source)]
    LayerLookup {
        namespace: String,
        source: ClusterError,
    },
    #[error("Resource quantity '{}' is invalid ({:?})!", .key, .value)]
    InvalidQuantity { key: &'static str, value: String },
    #[error("Environment variable '{}' is not in KEY=VALUE form!", .0)]
    MalformedEnvVar(String),
    #[error("{} '{}' is declared in '{}' namespace, only the tenant namespace or none is supported!", .kind, .name, .namespace)]
    UnsupportedBundleNamespace {
        kind: BundleKind,
        name: String,
        namespace: String,
    },
    #[error("Resource contains invalid data ({})!", .0)]
    InvalidData(Cow<'static, str>),
    #[error("Resource is missing required data ({})!", .0)]
    MissingData(Cow<'static, str>),
}

/// Degraded outcomes that let synthesis continue with default or empty data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SynthesisWarning {
    #[error("No '{}' found in tenant or control namespace, using defaults", DEPLOYMENT_CONFIGS_NAME)]
    LayerNotFound,
    #[error("Couldn't decode '{}' bundle list, treating it as empty: {}", .key, .reason)]
    BundleListUndecodable { key: &'static str, reason: String },
    #[error("Tuning value '{}' is not an integer ({:?}), using 0", .key, .value)]
    InvalidTuningValue { key: &'static str, value: String },
    #[error("Resource quantity '{}' is unset, leaving it out of the budget", .key)]
    MissingQuantity { key: &'static str },
    #[error("Couldn't fetch {} '{}' from control namespace, skipping it: {}", .kind, .name, .reason)]
    BundleFetchFailed {
        kind: BundleKind,
        name: String,
        reason: String,
    },
    #[error("Couldn't copy {} '{}' to tenant namespace: {}", .kind, .name, .reason)]
    BundleUpsertFailed {
        kind: BundleKind,
        name: String,
        reason: String,
    },
}

/// A successfully synthesized value together with everything that degraded along the way.
#[derive(Debug)]
pub struct Synthesized<T> {
    pub value: T,
    pub warnings: Vec<SynthesisWarning>,
}

impl<T> Synthesized<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(value: T, warnings: Vec<SynthesisWarning>) -> Self {
        Self { value, warnings }
    }

    pub fn warn(&mut self, warning: SynthesisWarning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Moves the other result's warnings into this one and hands back its value.
    pub fn absorb<U>(&mut self, other: Synthesized<U>) -> U {
        self.warnings.extend(other.warnings);

        other.value
    }

    pub fn map<U>(self, op: impl FnOnce(T) -> U) -> Synthesized<U> {
        Synthesized {
            value: op(self.value),
            warnings: self.warnings,
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}
