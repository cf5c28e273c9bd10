use crate::types::{EnvId, SourceDigest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A named, identified collection of boxes deployed and tracked as one unit.
///
/// Fields not present in the spec file default to empty values so that the
/// validator, not the parser, reports what is missing. `work_dir` is assigned
/// by the stager and never read from the spec.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Environment {
    #[serde(default)]
    pub id: EnvId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    #[serde(default)]
    pub boxes: Vec<EnvBox>,
    #[serde(skip)]
    pub work_dir: Option<PathBuf>,
}

/// A deployable unit wrapping one chart descriptor, one values file, and the
/// application templates rendered with them.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct EnvBox {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub box_type: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub chart: String,
    #[serde(default)]
    pub values: String,
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(skip)]
    pub work_dir: Option<PathBuf>,
    #[serde(skip)]
    pub source_digest: Option<SourceDigest>,
}

/// One template owned by a box.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Application {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub chart: String,
    /// The box's `templates/` directory once staged.
    #[serde(skip)]
    pub work_dir: Option<PathBuf>,
    #[serde(skip)]
    pub staged_file: Option<PathBuf>,
}

impl Environment {
    pub fn box_names(&self) -> Vec<String> {
        self.boxes.iter().map(|b| b.name.clone()).collect()
    }
}

impl EnvBox {
    pub fn is_staged(&self) -> bool {
        self.work_dir.is_some()
    }
}
