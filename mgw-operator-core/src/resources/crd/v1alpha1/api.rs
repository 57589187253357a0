use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[kube(
    group = "wso2.com",
    version = "v1alpha1",
    kind = "API",
    struct = "ApiDefinition",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ApiSpec {
    /// number of microgateway replicas serving this API
    #[serde(default)]
    pub replicas: u32,
    /// microgateway image overriding the registry default
    pub image: Option<String>,
    /// extra container environment in KEY=VALUE form
    #[serde(default)]
    pub environment_variables: Vec<String>,
}
