use crate::config::DriverConfig;
use crate::driver::DeployDriver;
use crate::DeployError;
use boxyard_schema::{EnvBox, EnvId, Environment};
use std::process::Command;
use tracing::{debug, warn};

/// Deploys each box as a helm release named after the box, installed from
/// the box's staged directory into the box namespace.
pub struct HelmDriver {
    config: DriverConfig,
}

impl HelmDriver {
    pub fn new(config: DriverConfig) -> Self {
        Self { config }
    }

    fn global_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        // $KUBECONFIG may be a path list; helm reads it itself.
        if let Some(ref kubeconfig) = self.config.kubeconfig {
            args.push("--kubeconfig".to_owned());
            args.push(kubeconfig.to_string_lossy().into_owned());
        }
        if let Some(ref context) = self.config.kube_context {
            args.push("--kube-context".to_owned());
            args.push(context.clone());
        }
        args
    }

    fn apply_args(
        &self,
        env_box: &EnvBox,
        environment: &Environment,
    ) -> Result<Vec<String>, DeployError> {
        let chart_dir = env_box
            .work_dir
            .as_ref()
            .ok_or_else(|| DeployError::NotStaged(env_box.name.clone()))?;
        let mut args = vec![
            "upgrade".to_owned(),
            "--install".to_owned(),
            env_box.name.clone(),
            chart_dir.to_string_lossy().into_owned(),
            "--namespace".to_owned(),
            env_box.namespace.clone(),
            "--create-namespace".to_owned(),
        ];
        for (key, value) in &environment.variables {
            args.push("--set-string".to_owned());
            args.push(format!("{key}={}", escape_set_value(value)));
        }
        args.extend(self.config.extra_args.iter().cloned());
        args.extend(self.global_args());
        Ok(args)
    }

    fn destroy_args(&self, env_box: &EnvBox) -> Vec<String> {
        let mut args = vec![
            "uninstall".to_owned(),
            env_box.name.clone(),
            "--namespace".to_owned(),
            env_box.namespace.clone(),
        ];
        args.extend(self.global_args());
        args
    }

    fn status_args(&self, env_box: &EnvBox) -> Vec<String> {
        let mut args = vec![
            "status".to_owned(),
            env_box.name.clone(),
            "--namespace".to_owned(),
            env_box.namespace.clone(),
        ];
        args.extend(self.global_args());
        args
    }

    fn run(&self, args: &[String]) -> Result<String, DeployError> {
        let rendered = format!("{} {}", self.config.helm_bin, args.join(" "));
        debug!("running {rendered}");
        let output = Command::new(&self.config.helm_bin)
            .args(args)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    DeployError::DriverUnavailable(self.config.helm_bin.clone())
                } else {
                    DeployError::Io(e)
                }
            })?;
        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(DeployError::CommandFailed {
                command: rendered,
                code: output.status.code().unwrap_or(1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            })
        }
    }
}

/// `helm uninstall` of a release that is already gone.
fn release_missing(stderr: &str) -> bool {
    stderr.contains("release: not found")
}

/// helm splits `--set-string` values on unescaped commas.
fn escape_set_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace(',', "\\,")
}

impl DeployDriver for HelmDriver {
    fn name(&self) -> &'static str {
        "helm"
    }

    fn available(&self) -> bool {
        Command::new(&self.config.helm_bin)
            .arg("version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn apply(&self, env_box: &EnvBox, environment: &Environment) -> Result<(), DeployError> {
        let args = self.apply_args(env_box, environment)?;
        self.run(&args)?;
        Ok(())
    }

    fn destroy(&self, env_box: &EnvBox, env_id: &EnvId) -> Result<(), DeployError> {
        debug!("uninstalling box '{}' of environment {env_id}", env_box.name);
        match self.run(&self.destroy_args(env_box)) {
            Ok(_) => Ok(()),
            Err(DeployError::CommandFailed { ref stderr, .. }) if release_missing(stderr) => {
                warn!(
                    "box '{}' of environment {env_id} has no release; treating it as torn down",
                    env_box.name
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn describe(
        &self,
        env_box: &EnvBox,
        _environment: &Environment,
    ) -> Result<String, DeployError> {
        self.run(&self.status_args(env_box))
    }
}
