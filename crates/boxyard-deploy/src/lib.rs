//! Deploy driver boundary for boxyard environments.
//!
//! This crate implements the cluster-facing side of a deploy: the pluggable
//! `DeployDriver` trait, a `HelmDriver` that installs each staged box as a helm
//! release, a recording `MockDriver`, the optional JSON `DriverConfig`, and
//! prerequisite checks for the helm toolchain.

pub mod config;
pub mod driver;
pub mod helm;
pub mod mock;
pub mod prereq;

pub use config::DriverConfig;
pub use driver::{select_driver, DeployDriver};
pub use helm::HelmDriver;
pub use mock::{DriverCall, MockDriver};
pub use prereq::{check_helm_prereqs, format_missing, MissingPrereq};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("deploy I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("driver '{0}' is not available on this system")]
    DriverUnavailable(String),
    #[error("box '{0}' has not been staged")]
    NotStaged(String),
    #[error("`{command}` exited with code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },
    #[error("box '{box_name}' was rejected: {reason}")]
    Rejected { box_name: String, reason: String },
    #[error("driver config error: {0}")]
    Config(String),
}
