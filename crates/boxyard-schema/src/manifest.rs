use crate::model::Environment;
use crate::vars::expand_box_variables;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpecError {
    #[error("spec file {} not found", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read spec file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse spec: {0}")]
    ParseToml(#[from] toml::de::Error),
}

pub fn parse_environment_str(input: &str) -> Result<Environment, SpecError> {
    let mut environment: Environment = toml::from_str(input)?;
    let variables = environment.variables.clone();
    expand_box_variables(&mut environment.boxes, &variables);
    Ok(environment)
}

/// Load an environment spec and return it together with its source root, the
/// directory that relative chart, values and application paths resolve against.
pub fn load_environment(path: impl AsRef<Path>) -> Result<(Environment, PathBuf), SpecError> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(SpecError::NotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    let environment = parse_environment_str(&content)?;
    Ok((environment, source_root_of(path)))
}

fn source_root_of(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
