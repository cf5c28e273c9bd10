//! Core reconciliation and staging pipeline for boxyard environments.
//!
//! This crate ties together spec loading, the snapshot store, and deploy
//! drivers into the `Pipeline`: validate a desired environment, reconcile it
//! against the last deployed snapshot, stage every box into an isolated
//! working directory, tear down what was deployed before, apply the new
//! boxes, and record the result. It also provides the store lock the CLI uses
//! to serialize runs.

pub mod concurrency;
pub mod ids;
pub mod pipeline;
pub mod reconcile;
pub mod stage;
pub mod validate;

pub use concurrency::StoreLock;
pub use ids::{IdSource, RandomIds, SequenceIds};
pub use pipeline::{DeployReport, DeploymentPlan, Pipeline};
pub use reconcile::{apply_defaults, reconcile, Reconciliation, GENERATED_PREFIX};
pub use stage::{
    source_digest, stage, StagingError, CHART_DESCRIPTOR, TEMPLATES_DIR, VALUES_DESCRIPTOR,
};
pub use validate::{check_unique_names, validate, ValidationError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("spec error: {0}")]
    Spec(#[from] boxyard_schema::SpecError),
    #[error("validation failed:\n{0}")]
    Validation(#[from] ValidationError),
    #[error("store error: {0}")]
    Store(#[from] boxyard_store::StoreError),
    #[error("staging error: {0}")]
    Staging(#[from] StagingError),
    #[error("deploy error: {0}")]
    Deploy(#[from] boxyard_deploy::DeployError),
    #[error("environment not found: {0}")]
    EnvNotFound(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
