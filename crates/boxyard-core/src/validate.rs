use boxyard_schema::Environment;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// Every structural problem found in an environment, in check order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .messages.join("\n"))]
pub struct ValidationError {
    pub messages: Vec<String>,
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn readable(source_root: &Path, relative: &str) -> bool {
    let path = source_root.join(relative);
    path.is_file() && File::open(&path).is_ok()
}

/// Check an environment before any side effect happens.
///
/// Checks never short-circuit each other: a spec with several problems yields
/// one message per problem. Chart, values and application paths are resolved
/// against `source_root`. A missing path is reported once as missing, not
/// also as unreadable.
pub fn validate(environment: &Environment, source_root: &Path) -> Result<(), ValidationError> {
    let mut messages = Vec::new();

    if is_blank(&environment.id) {
        messages.push("Environment id is missing".to_owned());
    } else if boxyard_store::validate_env_id(&environment.id).is_err() {
        messages.push(format!(
            "Environment id '{}' may only contain [a-zA-Z0-9_.-] and must not start with '.'",
            environment.id
        ));
    }

    if is_blank(&environment.name) {
        messages.push("Environment name is missing".to_owned());
    }

    if environment.boxes.is_empty() {
        messages.push("Environment boxes are missing".to_owned());
    }

    for (index, b) in environment.boxes.iter().enumerate() {
        if is_blank(&b.box_type) {
            messages.push(format!("-> Box {index}: Type is missing"));
        }

        if b.applications.is_empty() {
            messages.push(format!("-> Box {index}: Applications are missing"));
        }

        if is_blank(&b.chart) {
            messages.push(format!("-> Box {index}: Chart is missing"));
        } else if !readable(source_root, &b.chart) {
            messages.push(format!(
                "-> Box {index}: Chart file can't be opened ({})",
                source_root.join(&b.chart).display()
            ));
        }

        if is_blank(&b.values) {
            messages.push(format!("-> Box {index}: Values are missing"));
        } else if !readable(source_root, &b.values) {
            messages.push(format!(
                "-> Box {index}: Values file can't be opened ({})",
                source_root.join(&b.values).display()
            ));
        }

        for (app_index, app) in b.applications.iter().enumerate() {
            if is_blank(&app.chart) {
                messages.push(format!(
                    "-> Box {index}: Application {app_index}: Chart is missing"
                ));
            } else if !readable(source_root, &app.chart) {
                messages.push(format!(
                    "-> Box {index}: Application {app_index}: Chart file can't be opened ({})",
                    source_root.join(&app.chart).display()
                ));
            }
        }

        if let Some(first) = earlier_box_named(environment, index) {
            messages.push(format!(
                "-> Box {index}: Name '{}' is already used by box {first}",
                b.name
            ));
        }
    }

    if messages.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { messages })
    }
}

/// Index of the first box before `index` carrying the same non-blank name.
fn earlier_box_named(environment: &Environment, index: usize) -> Option<usize> {
    let name = &environment.boxes[index].name;
    if is_blank(name) {
        return None;
    }
    environment.boxes[..index].iter().position(|b| &b.name == name)
}

/// Box names must stay unique once defaults have filled in generated ones.
pub fn check_unique_names(environment: &Environment) -> Result<(), ValidationError> {
    let messages: Vec<String> = (0..environment.boxes.len())
        .filter_map(|index| {
            earlier_box_named(environment, index).map(|first| {
                format!(
                    "-> Box {index}: Name '{}' is already used by box {first}",
                    environment.boxes[index].name
                )
            })
        })
        .collect();
    if messages.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { messages })
    }
}
