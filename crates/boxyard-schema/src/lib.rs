//! Environment spec model, TOML loading, and variable expansion for boxyard.
//!
//! This crate defines the schema layer: the in-memory `Environment`, `EnvBox`
//! and `Application` model, the TOML spec loader (`load_environment`) that
//! resolves the source root against which chart and values paths are read,
//! and `$VAR` expansion over box fields.

pub mod manifest;
pub mod model;
pub mod types;
pub mod vars;

pub use manifest::{load_environment, parse_environment_str, SpecError};
pub use model::{Application, EnvBox, Environment};
pub use types::{EnvId, SourceDigest};
pub use vars::{expand_box_variables, expand_str};
