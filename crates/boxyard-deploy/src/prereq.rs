use crate::DriverConfig;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Something the helm driver needs but cannot find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingPrereq {
    pub name: String,
    pub purpose: &'static str,
    pub install_hint: String,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {} is needed for {} ({})",
            self.name, self.purpose, self.install_hint
        )
    }
}

/// A configured helm path is checked directly; a bare name is looked up on PATH.
fn helm_available(helm_bin: &str) -> bool {
    if helm_bin.contains('/') {
        return Path::new(helm_bin).is_file();
    }
    Command::new("which")
        .arg(helm_bin)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Everything the helm driver would trip over with `config`.
/// An empty result means deploys can proceed.
pub fn check_helm_prereqs(config: &DriverConfig) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    if !helm_available(&config.helm_bin) {
        missing.push(MissingPrereq {
            name: config.helm_bin.clone(),
            purpose: "rendering and installing box charts",
            install_hint: "see https://helm.sh/docs/intro/install/ or set helm_bin in driver.json"
                .to_owned(),
        });
    }

    missing.extend(missing_kubeconfig(&config.kubeconfig_candidates()));
    missing
}

/// With no candidates helm falls back to `~/.kube/config`; otherwise at least
/// one listed file has to exist.
fn missing_kubeconfig(candidates: &[PathBuf]) -> Option<MissingPrereq> {
    if candidates.is_empty() || candidates.iter().any(|p| p.is_file()) {
        return None;
    }
    let listed: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
    Some(MissingPrereq {
        name: listed.join(", "),
        purpose: "reaching the cluster",
        install_hint: "point kubeconfig or $KUBECONFIG at an existing file".to_owned(),
    })
}

/// Render missing prerequisites as a single error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        msg.push_str(&m.to_string());
        msg.push('\n');
    }
    msg.push_str("\nuse --driver mock to run without a cluster.");
    msg
}
