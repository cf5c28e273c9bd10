use crate::ids::{IdSource, RandomIds};
use crate::reconcile::reconcile;
use crate::stage::stage;
use crate::validate::{check_unique_names, validate};
use crate::CoreError;
use boxyard_deploy::DeployDriver;
use boxyard_schema::{load_environment, EnvBox, EnvId, Environment};
use boxyard_store::{BoxRecord, EnvSnapshot, FileSnapshotStore, SnapshotStore, StoreLayout};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A validated, reconciled environment that has not touched the filesystem
/// or the cluster yet.
#[derive(Debug, Clone)]
pub struct DeploymentPlan {
    pub environment: Environment,
    pub source_root: PathBuf,
    pub previous: Option<EnvSnapshot>,
    pub teardown: Vec<EnvBox>,
}

impl DeploymentPlan {
    pub fn was_previously_deployed(&self) -> bool {
        self.previous.is_some()
    }
}

/// Summary of a successful deploy.
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub env_id: EnvId,
    pub name: String,
    pub work_dir: PathBuf,
    pub previously_deployed: bool,
    pub torn_down: Vec<String>,
    pub applied: Vec<String>,
}

/// Straight-line deploy pipeline: load, validate, reconcile, stage, tear
/// down, apply, record. The first failing stage aborts the run and its error
/// is returned unchanged; nothing is retried or rolled back.
pub struct Pipeline {
    layout: StoreLayout,
    store: Box<dyn SnapshotStore>,
    driver: Arc<dyn DeployDriver>,
    ids: Box<dyn IdSource>,
}

impl Pipeline {
    /// Pipeline over the file-backed store rooted at `store_root`, drawing
    /// generated names from the thread RNG.
    pub fn new(store_root: impl Into<PathBuf>, driver: Arc<dyn DeployDriver>) -> Self {
        let layout = StoreLayout::new(store_root);
        let store = Box::new(FileSnapshotStore::new(layout.clone()));
        Self {
            layout,
            store,
            driver,
            ids: Box::new(RandomIds),
        }
    }

    /// Assemble a pipeline from explicit parts.
    pub fn from_parts(
        layout: StoreLayout,
        store: Box<dyn SnapshotStore>,
        driver: Arc<dyn DeployDriver>,
        ids: Box<dyn IdSource>,
    ) -> Self {
        Self {
            layout,
            store,
            driver,
            ids,
        }
    }

    #[must_use]
    pub fn with_ids(mut self, ids: impl IdSource + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn driver(&self) -> &dyn DeployDriver {
        self.driver.as_ref()
    }

    /// Load and validate a spec file.
    pub fn validate(&self, spec_path: &Path) -> Result<(Environment, PathBuf), CoreError> {
        info!("loading environment from {}", spec_path.display());
        let (environment, source_root) = load_environment(spec_path)?;
        validate(&environment, &source_root)?;
        debug!(
            "environment {} is valid ({} box(es))",
            environment.id,
            environment.boxes.len()
        );
        Ok((environment, source_root))
    }

    /// Load, validate and reconcile without staging or cluster contact.
    pub fn plan(&mut self, spec_path: &Path) -> Result<DeploymentPlan, CoreError> {
        let (environment, source_root) = self.validate(spec_path)?;
        let reconciliation = reconcile(self.store.as_ref(), environment, self.ids.as_mut())?;
        check_unique_names(&reconciliation.environment)?;
        Ok(DeploymentPlan {
            environment: reconciliation.environment,
            source_root,
            previous: reconciliation.previous,
            teardown: reconciliation.teardown,
        })
    }

    /// Run the full pipeline for a spec file.
    pub fn deploy(&mut self, spec_path: &Path) -> Result<DeployReport, CoreError> {
        let mut plan = self.plan(spec_path)?;

        self.layout.initialize()?;
        let work_dir = stage(
            &mut plan.environment,
            &plan.source_root,
            &self.layout.work_dir(),
            plan.previous.as_ref(),
            self.ids.as_mut(),
        )?;
        info!(
            "staged environment {} into {}",
            plan.environment.id,
            work_dir.display()
        );

        self.execute(plan, work_dir)
    }

    fn execute(&self, plan: DeploymentPlan, work_dir: PathBuf) -> Result<DeployReport, CoreError> {
        let environment = plan.environment;

        let mut torn_down = Vec::with_capacity(plan.teardown.len());
        for b in &plan.teardown {
            info!("tearing down box '{}' of {}", b.name, environment.id);
            self.driver.destroy(b, &environment.id)?;
            torn_down.push(b.name.clone());
        }
        remove_stale_box_dirs(&plan.teardown, &environment, &self.layout);

        let mut applied = Vec::with_capacity(environment.boxes.len());
        for b in &environment.boxes {
            info!("applying box '{}' into namespace '{}'", b.name, b.namespace);
            self.driver.apply(b, &environment)?;
            applied.push(b.name.clone());
        }

        let snapshot = EnvSnapshot::capture(&environment, chrono::Utc::now().to_rfc3339())?;
        self.store.put(&snapshot)?;
        info!("recorded snapshot for environment {}", environment.id);

        Ok(DeployReport {
            env_id: environment.id.clone(),
            name: environment.name.clone(),
            work_dir,
            previously_deployed: plan.previous.is_some(),
            torn_down,
            applied,
        })
    }

    /// Tear down every box of a deployed environment, forget its snapshot and
    /// remove its working directory. Returns the torn-down box names.
    pub fn destroy(&mut self, env_id: &str) -> Result<Vec<String>, CoreError> {
        let snapshot = self.inspect(env_id)?;
        let mut torn_down = Vec::with_capacity(snapshot.boxes.len());
        for record in &snapshot.boxes {
            info!("tearing down box '{}' of {}", record.name, snapshot.env_id);
            self.driver.destroy(&record.to_env_box(), &snapshot.env_id)?;
            torn_down.push(record.name.clone());
        }
        self.store.delete(env_id)?;

        if self.layout.owns(&snapshot.work_dir) && snapshot.work_dir.exists() {
            std::fs::remove_dir_all(&snapshot.work_dir)?;
        }
        Ok(torn_down)
    }

    /// Ask the driver to describe each deployed box, in snapshot order.
    pub fn describe(&self, env_id: &str) -> Result<Vec<(String, String)>, CoreError> {
        let snapshot = self.inspect(env_id)?;
        let environment = restore_environment(&snapshot);
        environment
            .boxes
            .iter()
            .map(|b| Ok((b.name.clone(), self.driver.describe(b, &environment)?)))
            .collect()
    }

    pub fn inspect(&self, env_id: &str) -> Result<EnvSnapshot, CoreError> {
        if !self.store.exists(env_id)? {
            return Err(CoreError::EnvNotFound(env_id.to_owned()));
        }
        Ok(self.store.get(env_id)?)
    }

    pub fn list(&self) -> Result<Vec<EnvSnapshot>, CoreError> {
        Ok(self.store.list()?)
    }
}

fn restore_environment(snapshot: &EnvSnapshot) -> Environment {
    Environment {
        id: snapshot.env_id.clone(),
        name: snapshot.name.clone(),
        namespace: snapshot.namespace.clone(),
        boxes: snapshot.boxes.iter().map(BoxRecord::to_env_box).collect(),
        work_dir: Some(snapshot.work_dir.clone()),
        ..Environment::default()
    }
}

/// Remove staged directories of torn-down boxes that the new environment
/// does not reuse. Failures are logged, never fatal.
fn remove_stale_box_dirs(teardown: &[EnvBox], environment: &Environment, layout: &StoreLayout) {
    for old in teardown {
        let Some(ref dir) = old.work_dir else {
            continue;
        };
        let reused = environment
            .boxes
            .iter()
            .any(|b| b.work_dir.as_ref() == Some(dir));
        if reused || !layout.owns(dir) || !dir.exists() {
            continue;
        }
        debug!("removing stale staging directory {}", dir.display());
        if let Err(e) = std::fs::remove_dir_all(dir) {
            warn!("cannot remove stale staging directory {}: {e}", dir.display());
        }
    }
}
