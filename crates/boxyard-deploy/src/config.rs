use crate::DeployError;
use serde::{Deserialize, Serialize};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Cluster access settings for the helm driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DriverConfig {
    #[serde(default = "default_helm_bin")]
    pub helm_bin: String,
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,
    #[serde(default)]
    pub kube_context: Option<String>,
    /// Appended verbatim to every `helm upgrade --install`.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            helm_bin: default_helm_bin(),
            kubeconfig: None,
            kube_context: None,
            extra_args: Vec::new(),
        }
    }
}

fn default_helm_bin() -> String {
    "helm".to_owned()
}

impl DriverConfig {
    /// Load config from `~/.config/boxyard/driver.json`, falling back to
    /// defaults when the file does not exist.
    pub fn load_default() -> Result<Self, DeployError> {
        let path = default_config_path()?;
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load(path: &Path) -> Result<Self, DeployError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| DeployError::Config(format!("invalid driver config: {e}")))
    }

    /// Kubeconfig files helm will consult: the configured one, else every
    /// entry of the `$KUBECONFIG` path list. Empty means helm's own default.
    pub fn kubeconfig_candidates(&self) -> Vec<PathBuf> {
        kubeconfig_paths(
            self.kubeconfig.as_deref(),
            std::env::var_os("KUBECONFIG").as_deref(),
        )
    }
}

pub(crate) fn kubeconfig_paths(explicit: Option<&Path>, env_value: Option<&OsStr>) -> Vec<PathBuf> {
    if let Some(path) = explicit {
        return vec![path.to_path_buf()];
    }
    env_value
        .map(|v| {
            std::env::split_paths(v)
                .filter(|p| !p.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn default_config_path() -> Result<PathBuf, DeployError> {
    let home = std::env::var("HOME").map_err(|_| DeployError::Config("HOME not set".to_owned()))?;
    Ok(PathBuf::from(home).join(".config/boxyard/driver.json"))
}
