use crate::config::DriverConfig;
use crate::DeployError;
use boxyard_schema::{EnvBox, EnvId, Environment};

/// Renders and applies staged boxes to the cluster, and removes torn-down ones.
///
/// Calls block until the cluster operation completes or fails.
pub trait DeployDriver: Send + Sync {
    fn name(&self) -> &str;

    fn available(&self) -> bool;

    /// Install or upgrade the box from its staged working directory.
    fn apply(&self, env_box: &EnvBox, environment: &Environment) -> Result<(), DeployError>;

    /// Remove everything the box deployed for the given environment.
    fn destroy(&self, env_box: &EnvBox, env_id: &EnvId) -> Result<(), DeployError>;

    /// Human-readable status of the box's cluster objects.
    fn describe(&self, env_box: &EnvBox, environment: &Environment)
        -> Result<String, DeployError>;
}

pub fn select_driver(
    name: &str,
    config: &DriverConfig,
) -> Result<Box<dyn DeployDriver>, DeployError> {
    match name {
        "helm" => Ok(Box::new(crate::helm::HelmDriver::new(config.clone()))),
        "mock" => Ok(Box::new(crate::mock::MockDriver::new())),
        other => Err(DeployError::DriverUnavailable(other.to_owned())),
    }
}
