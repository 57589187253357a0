pub mod helpers;
pub mod kubernetes;
pub mod resources;
pub mod synthesis;

pub const RESOURCE_GROUP: &str = "wso2.com";

pub const FIELD_MANAGER: &str = "mgw-operator";

/// Namespace holding cluster-wide defaults shared by every tenant.
pub const DEFAULT_CONTROL_NAMESPACE: &str = "wso2-system";

pub const DEPLOYMENT_CONFIGS_NAME: &str = "mgw-deployment-configs";
pub const DEPLOYMENT_CONFIGS_CONFIGMAPS_KEY: &str = "mgwConfigMaps";
pub const DEPLOYMENT_CONFIGS_SECRETS_KEY: &str = "mgwSecrets";
