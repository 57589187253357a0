use derive_builder::Builder;

use crate::helpers::RequireMetadata;

use super::{crd::v1alpha1::api::ApiDefinition, SynthesisError};

/// Tenant-submitted API workload, the immutable input of a synthesis run.
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct WorkloadDefinition {
    #[builder(setter(into))]
    pub name: String,
    #[builder(setter(into))]
    pub namespace: String,
    #[builder(default)]
    pub replicas: i32,
    #[builder(default, setter(into, strip_option))]
    pub image: Option<String>,
    #[builder(default)]
    pub environment_variables: Vec<String>,
}

impl WorkloadDefinitionBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.replicas {
            Some(replicas) if replicas < 0 => Err(format!("negative replica count {replicas}")),
            _ => Ok(()),
        }
    }
}

impl WorkloadDefinition {
    pub fn from_api(api: &ApiDefinition) -> Result<Self, SynthesisError> {
        let name = api.require_name_or_else(|| SynthesisError::MissingData("API name".into()))?;
        let namespace = api
            .require_namespace_or_else(|| SynthesisError::MissingData("API namespace".into()))?;
        let replicas = i32::try_from(api.spec.replicas).map_err(|_| {
            SynthesisError::InvalidData(format!("replica count {}", api.spec.replicas).into())
        })?;

        Ok(Self {
            name: name.to_owned(),
            namespace: namespace.to_owned(),
            replicas,
            image: api.spec.image.to_owned(),
            environment_variables: api.spec.environment_variables.to_owned(),
        })
    }

    /// Rejects a negative replica count, which the builder catches but direct construction doesn't.
    pub fn validate(&self) -> Result<(), SynthesisError> {
        if self.replicas < 0 {
            return Err(SynthesisError::InvalidData(
                format!("replica count {}", self.replicas).into(),
            ));
        }

        Ok(())
    }

    /// Workload image override, an empty string counts as unset.
    pub fn image_override(&self) -> Option<&str> {
        self.image.as_deref().filter(|image| !image.is_empty())
    }

    pub fn container_name(&self) -> String {
        format!("mgw{}", self.name)
    }
}
