use crate::ids::IdSource;
use boxyard_schema::{EnvBox, Environment};
use boxyard_store::{BoxRecord, EnvSnapshot, SnapshotStore, StoreError};
use tracing::{debug, info};

/// Prefix of generated box names and namespaces.
pub const GENERATED_PREFIX: &str = "boxrun";

/// Outcome of comparing a desired environment with its last deployed snapshot.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// The desired environment with box names and namespaces resolved.
    pub environment: Environment,
    /// The snapshot of the previous deploy, if there was one.
    pub previous: Option<EnvSnapshot>,
    /// Boxes to remove before applying, in snapshot order.
    pub teardown: Vec<EnvBox>,
}

impl Reconciliation {
    pub fn was_previously_deployed(&self) -> bool {
        self.previous.is_some()
    }
}

fn generated_name(ids: &mut dyn IdSource) -> String {
    format!("{GENERATED_PREFIX}-{}", ids.next_id(8)).to_lowercase()
}

/// Fill an empty namespace from the environment (or generate one) and an
/// empty name with a generated one. Non-empty fields are never touched.
pub fn apply_defaults(env_box: &mut EnvBox, env_namespace: &str, ids: &mut dyn IdSource) {
    if env_box.namespace.trim().is_empty() {
        env_box.namespace = if env_namespace.trim().is_empty() {
            generated_name(ids)
        } else {
            env_namespace.to_owned()
        };
    }
    if env_box.name.trim().is_empty() {
        env_box.name = generated_name(ids);
    }
}

/// Reconcile the desired environment against the store.
///
/// Every box of a previous snapshot is torn down regardless of what the
/// desired spec contains; the full desired set is then deployed fresh. An
/// absent snapshot is not an error, a failing store is.
pub fn reconcile(
    store: &dyn SnapshotStore,
    mut desired: Environment,
    ids: &mut dyn IdSource,
) -> Result<Reconciliation, StoreError> {
    let previous = if store.exists(&desired.id)? {
        let snapshot = store.get(&desired.id)?;
        info!(
            "environment {} was deployed before with {} box(es)",
            desired.id,
            snapshot.boxes.len()
        );
        Some(snapshot)
    } else {
        info!("environment {} is new", desired.id);
        None
    };

    let teardown = previous
        .as_ref()
        .map(|s| s.boxes.iter().map(BoxRecord::to_env_box).collect())
        .unwrap_or_default();

    let env_namespace = desired.namespace.clone();
    for b in &mut desired.boxes {
        apply_defaults(b, &env_namespace, ids);
        debug!("resolved box '{}' in namespace '{}'", b.name, b.namespace);
    }

    Ok(Reconciliation {
        environment: desired,
        previous,
        teardown,
    })
}
