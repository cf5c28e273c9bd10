use crate::driver::DeployDriver;
use crate::DeployError;
use boxyard_schema::{EnvBox, EnvId, Environment};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// One recorded driver invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    Apply { box_name: String, namespace: String },
    Destroy { box_name: String, env_id: String },
    Describe { box_name: String },
}

/// In-process driver that records calls instead of contacting a cluster.
///
/// `apply` checks that the box was staged the way a renderer would need it:
/// a chart descriptor in the working directory and one staged file per
/// application.
#[derive(Default)]
pub struct MockDriver {
    calls: Mutex<Vec<DriverCall>>,
    /// box name -> namespace of currently applied boxes
    applied: Mutex<HashMap<String, String>>,
    failing: Mutex<HashSet<String>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent apply or destroy of `box_name` fail.
    pub fn fail_on(&self, box_name: &str) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(box_name.to_owned());
        }
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn applied(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .applied
            .lock()
            .map(|a| a.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    fn record(&self, call: DriverCall) -> Result<(), DeployError> {
        self.calls
            .lock()
            .map_err(|e| DeployError::Config(format!("mutex poisoned: {e}")))?
            .push(call);
        Ok(())
    }

    fn check_failing(&self, box_name: &str) -> Result<(), DeployError> {
        let failing = self
            .failing
            .lock()
            .map_err(|e| DeployError::Config(format!("mutex poisoned: {e}")))?;
        if failing.contains(box_name) {
            return Err(DeployError::Rejected {
                box_name: box_name.to_owned(),
                reason: "mock failure".to_owned(),
            });
        }
        Ok(())
    }
}

impl DeployDriver for MockDriver {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn available(&self) -> bool {
        true
    }

    fn apply(&self, env_box: &EnvBox, _environment: &Environment) -> Result<(), DeployError> {
        self.record(DriverCall::Apply {
            box_name: env_box.name.clone(),
            namespace: env_box.namespace.clone(),
        })?;
        self.check_failing(&env_box.name)?;

        let dir = env_box
            .work_dir
            .as_ref()
            .ok_or_else(|| DeployError::NotStaged(env_box.name.clone()))?;
        if !dir.join("Chart.yaml").is_file() {
            return Err(DeployError::Rejected {
                box_name: env_box.name.clone(),
                reason: format!("no chart descriptor in {}", dir.display()),
            });
        }
        for app in &env_box.applications {
            let staged = app.staged_file.as_ref().is_some_and(|f| f.is_file());
            if !staged {
                return Err(DeployError::Rejected {
                    box_name: env_box.name.clone(),
                    reason: format!("application '{}' has no staged template", app.name),
                });
            }
        }

        self.applied
            .lock()
            .map_err(|e| DeployError::Config(format!("mutex poisoned: {e}")))?
            .insert(env_box.name.clone(), env_box.namespace.clone());
        Ok(())
    }

    fn destroy(&self, env_box: &EnvBox, env_id: &EnvId) -> Result<(), DeployError> {
        self.record(DriverCall::Destroy {
            box_name: env_box.name.clone(),
            env_id: env_id.to_string(),
        })?;
        self.check_failing(&env_box.name)?;
        self.applied
            .lock()
            .map_err(|e| DeployError::Config(format!("mutex poisoned: {e}")))?
            .remove(&env_box.name);
        Ok(())
    }

    fn describe(&self, env_box: &EnvBox, environment: &Environment) -> Result<String, DeployError> {
        self.record(DriverCall::Describe {
            box_name: env_box.name.clone(),
        })?;
        Ok(format!(
            "box {} (type {}) in namespace {} of environment {}: {} application(s)",
            env_box.name,
            env_box.box_type,
            env_box.namespace,
            environment.id,
            env_box.applications.len()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxyard_schema::Application;
    use std::fs;

    fn staged_box(dir: &std::path::Path) -> EnvBox {
        fs::create_dir_all(dir.join("templates")).unwrap();
        fs::write(dir.join("Chart.yaml"), "name: web").unwrap();
        fs::write(dir.join("templates").join("a1.yaml"), "kind: Pod").unwrap();
        EnvBox {
            name: "web".to_owned(),
            namespace: "prod".to_owned(),
            applications: vec![Application {
                name: "frontend".to_owned(),
                staged_file: Some(dir.join("templates").join("a1.yaml")),
                ..Application::default()
            }],
            work_dir: Some(dir.to_path_buf()),
            ..EnvBox::default()
        }
    }

    #[test]
    fn apply_then_destroy_records_calls() {
        let dir = tempfile::tempdir().unwrap();
        let driver = MockDriver::new();
        let b = staged_box(dir.path());
        let env = Environment::default();

        driver.apply(&b, &env).unwrap();
        assert_eq!(driver.applied(), vec!["web"]);
        driver.destroy(&b, &EnvId::new("e1")).unwrap();
        assert!(driver.applied().is_empty());

        assert_eq!(
            driver.calls(),
            vec![
                DriverCall::Apply {
                    box_name: "web".to_owned(),
                    namespace: "prod".to_owned()
                },
                DriverCall::Destroy {
                    box_name: "web".to_owned(),
                    env_id: "e1".to_owned()
                },
            ]
        );
    }

    #[test]
    fn apply_rejects_unstaged_box() {
        let driver = MockDriver::new();
        let b = EnvBox {
            name: "web".to_owned(),
            ..EnvBox::default()
        };
        assert!(matches!(
            driver.apply(&b, &Environment::default()),
            Err(DeployError::NotStaged(_))
        ));
    }

    #[test]
    fn apply_rejects_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let driver = MockDriver::new();
        let mut b = staged_box(dir.path());
        b.applications[0].staged_file = Some(dir.path().join("templates").join("gone.yaml"));
        assert!(matches!(
            driver.apply(&b, &Environment::default()),
            Err(DeployError::Rejected { .. })
        ));
    }

    #[test]
    fn fail_on_rejects_named_box() {
        let dir = tempfile::tempdir().unwrap();
        let driver = MockDriver::new();
        driver.fail_on("web");
        let b = staged_box(dir.path());
        assert!(driver.apply(&b, &Environment::default()).is_err());
        assert!(driver.destroy(&b, &EnvId::new("e1")).is_err());
        assert_eq!(driver.calls().len(), 2);
    }

    #[test]
    fn describe_mentions_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let driver = MockDriver::new();
        let text = driver
            .describe(&staged_box(dir.path()), &Environment::default())
            .unwrap();
        assert!(text.contains("prod"));
        assert!(text.contains("1 application"));
    }
}
