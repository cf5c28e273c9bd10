//! End-to-end pipeline tests against the file store and the mock driver.

use boxyard_core::{CoreError, Pipeline, SequenceIds, StoreLock, CHART_DESCRIPTOR};
use boxyard_deploy::{DriverCall, MockDriver};
use boxyard_store::{EnvSnapshot, FileSnapshotStore, SnapshotStore, StoreError, StoreLayout};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct Fixture {
    store: tempfile::TempDir,
    project: tempfile::TempDir,
    driver: Arc<MockDriver>,
}

impl Fixture {
    fn new() -> Self {
        let project = tempfile::tempdir().unwrap();
        for (file, body) in [
            ("web-chart.yaml", "name: web"),
            ("web-values.yaml", "replicas: 2"),
            ("deploy.yaml", "kind: Deployment"),
            ("service.yaml", "kind: Service"),
            ("db-chart.yaml", "name: db"),
            ("db-values.yaml", "storage: 1Gi"),
        ] {
            fs::write(project.path().join(file), body).unwrap();
        }
        Self {
            store: tempfile::tempdir().unwrap(),
            project,
            driver: Arc::new(MockDriver::new()),
        }
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.store.path(), self.driver.clone()).with_ids(SequenceIds::new())
    }

    fn spec(&self, content: &str) -> PathBuf {
        let path = self.project.path().join("env.toml");
        fs::write(&path, content).unwrap();
        path
    }

    fn layout(&self) -> StoreLayout {
        StoreLayout::new(self.store.path())
    }
}

fn box_block(name: &str, chart: &str, values: &str, apps: &[&str]) -> String {
    let mut out = format!(
        "\n[[boxes]]\nname = \"{name}\"\ntype = \"svc\"\nchart = \"{chart}\"\nvalues = \"{values}\"\n"
    );
    for app in apps {
        out.push_str(&format!("\n[[boxes.applications]]\nchart = \"{app}\"\n"));
    }
    out
}

fn web_and_db() -> String {
    format!(
        "id = \"e1\"\nname = \"demo\"\nnamespace = \"prod\"\n{}{}",
        box_block("web", "web-chart.yaml", "web-values.yaml", &["deploy.yaml", "service.yaml"]),
        box_block("db", "db-chart.yaml", "db-values.yaml", &["deploy.yaml"]),
    )
}

fn web_only() -> String {
    format!(
        "id = \"e1\"\nname = \"demo\"\nnamespace = \"prod\"\n{}",
        box_block("web", "web-chart.yaml", "web-values.yaml", &["deploy.yaml", "service.yaml"]),
    )
}

/// File store that refuses to record snapshots.
struct ReadOnlyStore(FileSnapshotStore);

impl SnapshotStore for ReadOnlyStore {
    fn exists(&self, env_id: &str) -> Result<bool, StoreError> {
        self.0.exists(env_id)
    }

    fn get(&self, env_id: &str) -> Result<EnvSnapshot, StoreError> {
        self.0.get(env_id)
    }

    fn put(&self, _snapshot: &EnvSnapshot) -> Result<(), StoreError> {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only store",
        )))
    }

    fn delete(&self, env_id: &str) -> Result<(), StoreError> {
        self.0.delete(env_id)
    }

    fn list(&self) -> Result<Vec<EnvSnapshot>, StoreError> {
        self.0.list()
    }
}

fn dir_entries(dir: &Path) -> usize {
    fs::read_dir(dir).unwrap().count()
}

fn applies(calls: &[DriverCall]) -> Vec<String> {
    calls
        .iter()
        .filter_map(|c| match c {
            DriverCall::Apply { box_name, .. } => Some(box_name.clone()),
            _ => None,
        })
        .collect()
}

fn destroys(calls: &[DriverCall]) -> Vec<String> {
    calls
        .iter()
        .filter_map(|c| match c {
            DriverCall::Destroy { box_name, .. } => Some(box_name.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn first_deploy_stages_applies_and_records() {
    let fx = Fixture::new();
    let spec = fx.spec(&web_and_db());
    let mut pipeline = fx.pipeline();

    let report = pipeline.deploy(&spec).unwrap();
    assert!(!report.previously_deployed);
    assert!(report.torn_down.is_empty());
    assert_eq!(report.applied, vec!["web", "db"]);
    assert!(report.work_dir.starts_with(fx.layout().work_dir()));
    assert_eq!(dir_entries(&report.work_dir), 2);

    let calls = fx.driver.calls();
    assert!(destroys(&calls).is_empty());
    assert_eq!(applies(&calls), vec!["web", "db"]);
    assert_eq!(
        calls[0],
        DriverCall::Apply {
            box_name: "web".to_owned(),
            namespace: "prod".to_owned()
        }
    );

    let snapshot = pipeline.inspect("e1").unwrap();
    assert_eq!(snapshot.work_dir, report.work_dir);
    assert_eq!(snapshot.box_names(), vec!["web", "db"]);
    let web = snapshot.find_box("web").unwrap();
    assert!(web.work_dir.join(CHART_DESCRIPTOR).is_file());
    assert_eq!(web.applications.len(), 2);
    assert!(web.applications.iter().all(|a| a.staged_file.is_file()));
}

#[test]
fn changed_spec_tears_down_every_old_box_before_applying() {
    let fx = Fixture::new();
    let mut pipeline = fx.pipeline();
    let first = pipeline.deploy(&fx.spec(&web_and_db())).unwrap();
    let old_web_dir = pipeline.inspect("e1").unwrap().find_box("web").unwrap().work_dir.clone();

    let spec = fx.spec(&format!(
        "id = \"e1\"\nname = \"demo\"\nnamespace = \"prod\"\n{}",
        box_block("api", "web-chart.yaml", "web-values.yaml", &["deploy.yaml"])
    ));
    let second = pipeline.deploy(&spec).unwrap();

    assert!(second.previously_deployed);
    assert_eq!(second.work_dir, first.work_dir);
    assert_eq!(second.torn_down, vec!["web", "db"]);
    assert_eq!(second.applied, vec!["api"]);

    let calls = fx.driver.calls();
    let tail: Vec<_> = calls[2..].to_vec();
    assert_eq!(
        tail,
        vec![
            DriverCall::Destroy {
                box_name: "web".to_owned(),
                env_id: "e1".to_owned()
            },
            DriverCall::Destroy {
                box_name: "db".to_owned(),
                env_id: "e1".to_owned()
            },
            DriverCall::Apply {
                box_name: "api".to_owned(),
                namespace: "prod".to_owned()
            },
        ]
    );
    assert_eq!(fx.driver.applied(), vec!["api"]);

    // The torn-down boxes' staging directories are gone, only api remains.
    assert!(!old_web_dir.exists());
    assert_eq!(dir_entries(&second.work_dir), 1);
    assert_eq!(pipeline.inspect("e1").unwrap().box_names(), vec!["api"]);
}

#[test]
fn identical_redeploy_reuses_staged_directories() {
    let fx = Fixture::new();
    let mut pipeline = fx.pipeline();
    let spec = fx.spec(&web_and_db());
    let first = pipeline.deploy(&spec).unwrap();
    let before = pipeline.inspect("e1").unwrap();

    let second = pipeline.deploy(&spec).unwrap();
    let after = pipeline.inspect("e1").unwrap();

    assert_eq!(second.torn_down, vec!["web", "db"]);
    assert_eq!(second.applied, vec!["web", "db"]);
    assert_eq!(dir_entries(&first.work_dir), 2);
    for name in ["web", "db"] {
        assert_eq!(
            before.find_box(name).unwrap().work_dir,
            after.find_box(name).unwrap().work_dir
        );
    }
}

#[test]
fn appending_a_box_stages_it_and_keeps_the_existing_one() {
    let fx = Fixture::new();
    let mut pipeline = fx.pipeline();
    pipeline.deploy(&fx.spec(&web_only())).unwrap();
    let web_dir = pipeline.inspect("e1").unwrap().find_box("web").unwrap().work_dir.clone();

    let grown = format!(
        "{}{}",
        web_only(),
        box_block("db", "db-chart.yaml", "db-values.yaml", &["deploy.yaml"])
    );
    let spec = fx.spec(&grown);
    let second = pipeline.deploy(&spec).unwrap();
    assert_eq!(second.torn_down, vec!["web"]);
    assert_eq!(second.applied, vec!["web", "db"]);

    let snapshot = pipeline.inspect("e1").unwrap();
    assert_eq!(snapshot.find_box("web").unwrap().work_dir, web_dir);
    let db = snapshot.find_box("db").unwrap();
    assert!(db.work_dir.join(CHART_DESCRIPTOR).is_file());
    assert_eq!(dir_entries(&second.work_dir), 2);

    let third = pipeline.deploy(&spec).unwrap();
    assert_eq!(third.applied, vec!["web", "db"]);
    assert_eq!(dir_entries(&third.work_dir), 2);
}

#[test]
fn duplicate_box_names_are_rejected_before_any_side_effect() {
    let fx = Fixture::new();
    let spec = fx.spec(&format!(
        "{}{}",
        web_only(),
        box_block("web", "db-chart.yaml", "db-values.yaml", &["deploy.yaml"])
    ));
    let mut pipeline = fx.pipeline();

    let err = pipeline.deploy(&spec).unwrap_err();
    match err {
        CoreError::Validation(v) => {
            assert_eq!(v.messages, vec!["-> Box 1: Name 'web' is already used by box 0"]);
        }
        other => panic!("expected validation error, got {other}"),
    }
    assert!(fx.driver.calls().is_empty());
    assert!(!fx.layout().is_initialized());
}

#[test]
fn snapshot_write_failure_surfaces_after_apply() {
    let fx = Fixture::new();
    let layout = fx.layout();
    let store = ReadOnlyStore(FileSnapshotStore::new(layout.clone()));
    let mut pipeline = Pipeline::from_parts(
        layout,
        Box::new(store),
        fx.driver.clone(),
        Box::new(SequenceIds::new()),
    );

    let err = pipeline.deploy(&fx.spec(&web_and_db())).unwrap_err();
    assert!(matches!(err, CoreError::Store(_)));
    assert!(err.to_string().contains("read-only store"));
    // The cluster already has both boxes; nothing is rolled back.
    assert_eq!(fx.driver.applied(), vec!["db", "web"]);
    assert!(pipeline.list().unwrap().is_empty());
}

#[test]
fn unnamed_box_gets_environment_namespace_and_generated_name() {
    let fx = Fixture::new();
    let spec = fx.spec(
        r#"
id = "e2"
name = "defaults"
namespace = "prod"

[[boxes]]
type = "svc"
chart = "web-chart.yaml"
values = "web-values.yaml"

[[boxes.applications]]
chart = "deploy.yaml"
"#,
    );
    let mut pipeline = fx.pipeline();
    let report = pipeline.deploy(&spec).unwrap();

    assert_eq!(report.applied, vec!["boxrun-00000001"]);
    let snapshot = pipeline.inspect("e2").unwrap();
    assert_eq!(snapshot.boxes[0].namespace, "prod");
    assert_eq!(snapshot.boxes[0].name, "boxrun-00000001");
}

#[test]
fn box_without_any_namespace_gets_a_generated_one() {
    let fx = Fixture::new();
    let spec = fx.spec(&format!(
        "id = \"e3\"\nname = \"loose\"\n{}",
        box_block("web", "web-chart.yaml", "web-values.yaml", &["deploy.yaml"])
    ));
    let mut pipeline = fx.pipeline();
    pipeline.deploy(&spec).unwrap();

    let ns = pipeline.inspect("e3").unwrap().boxes[0].namespace.clone();
    assert!(ns.starts_with("boxrun-"));
    assert_eq!(ns.len(), "boxrun-".len() + 8);
}

#[test]
fn variables_expand_into_box_fields() {
    let fx = Fixture::new();
    let spec = fx.spec(
        r#"
id = "e4"
name = "vars"

[variables]
TIER = "staging"

[[boxes]]
name = "web-${TIER}"
type = "svc"
namespace = "ns-$TIER"
chart = "web-chart.yaml"
values = "web-values.yaml"

[[boxes.applications]]
chart = "deploy.yaml"
"#,
    );
    let mut pipeline = fx.pipeline();
    pipeline.deploy(&spec).unwrap();
    assert_eq!(
        fx.driver.calls()[0],
        DriverCall::Apply {
            box_name: "web-staging".to_owned(),
            namespace: "ns-staging".to_owned()
        }
    );
}

#[test]
fn missing_chart_fails_validation_before_any_side_effect() {
    let fx = Fixture::new();
    let spec = fx.spec(&format!(
        "id = \"e1\"\nname = \"demo\"\n{}",
        box_block("web", "nope.yaml", "web-values.yaml", &["deploy.yaml"])
    ));
    let mut pipeline = fx.pipeline();

    let err = pipeline.deploy(&spec).unwrap_err();
    match err {
        CoreError::Validation(v) => {
            assert_eq!(v.messages.len(), 1);
            assert!(v.messages[0].starts_with("-> Box 0: Chart file can't be opened"));
        }
        other => panic!("expected validation error, got {other}"),
    }
    assert!(fx.driver.calls().is_empty());
    assert!(!fx.layout().is_initialized());
}

#[test]
fn missing_spec_file_is_a_spec_error() {
    let fx = Fixture::new();
    let mut pipeline = fx.pipeline();
    let err = pipeline
        .deploy(&fx.project.path().join("absent.toml"))
        .unwrap_err();
    assert!(matches!(err, CoreError::Spec(_)));
    assert!(err.to_string().starts_with("spec error:"));
}

#[test]
fn failed_apply_leaves_previous_snapshot_untouched() {
    let fx = Fixture::new();
    let mut pipeline = fx.pipeline();
    pipeline.deploy(&fx.spec(&web_and_db())).unwrap();
    let before = pipeline.inspect("e1").unwrap();

    let spec = fx.spec(&format!(
        "id = \"e1\"\nname = \"demo\"\nnamespace = \"prod\"\n{}",
        box_block("api", "web-chart.yaml", "web-values.yaml", &["deploy.yaml"])
    ));
    fx.driver.fail_on("api");
    let err = pipeline.deploy(&spec).unwrap_err();
    assert!(matches!(err, CoreError::Deploy(_)));
    assert!(err.to_string().starts_with("deploy error:"));

    let after = pipeline.inspect("e1").unwrap();
    assert_eq!(after.box_names(), before.box_names());
    assert_eq!(after.deployed_at, before.deployed_at);
}

#[test]
fn failed_first_apply_records_nothing() {
    let fx = Fixture::new();
    fx.driver.fail_on("db");
    let mut pipeline = fx.pipeline();
    assert!(pipeline.deploy(&fx.spec(&web_and_db())).is_err());
    // web was applied before db failed; nothing is rolled back.
    assert_eq!(fx.driver.applied(), vec!["web"]);
    assert!(matches!(
        pipeline.inspect("e1"),
        Err(CoreError::EnvNotFound(_))
    ));
}

#[test]
fn failed_teardown_stops_before_apply() {
    let fx = Fixture::new();
    let mut pipeline = fx.pipeline();
    pipeline.deploy(&fx.spec(&web_and_db())).unwrap();

    fx.driver.fail_on("db");
    let spec = fx.spec(&format!(
        "id = \"e1\"\nname = \"demo\"\nnamespace = \"prod\"\n{}",
        box_block("api", "web-chart.yaml", "web-values.yaml", &["deploy.yaml"])
    ));
    assert!(pipeline.deploy(&spec).is_err());
    assert!(!applies(&fx.driver.calls()).contains(&"api".to_owned()));
}

#[test]
fn describe_reports_each_box_in_order() {
    let fx = Fixture::new();
    let mut pipeline = fx.pipeline();
    pipeline.deploy(&fx.spec(&web_and_db())).unwrap();

    let described = pipeline.describe("e1").unwrap();
    let names: Vec<_> = described.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["web", "db"]);
    assert!(described[0].1.contains("prod"));
}

#[test]
fn destroy_tears_down_and_forgets_environment() {
    let fx = Fixture::new();
    let mut pipeline = fx.pipeline();
    let report = pipeline.deploy(&fx.spec(&web_and_db())).unwrap();

    let torn_down = pipeline.destroy("e1").unwrap();
    assert_eq!(torn_down, vec!["web", "db"]);
    assert!(fx.driver.applied().is_empty());
    assert!(!report.work_dir.exists());
    assert!(pipeline.list().unwrap().is_empty());

    // A later deploy of the same id starts from scratch.
    let again = pipeline.deploy(&fx.spec(&web_and_db())).unwrap();
    assert!(!again.previously_deployed);
    assert_ne!(again.work_dir, report.work_dir);
}

#[test]
fn environments_are_isolated_from_each_other() {
    let fx = Fixture::new();
    let mut pipeline = fx.pipeline();
    let one = pipeline.deploy(&fx.spec(&web_and_db())).unwrap();
    let two = pipeline
        .deploy(&fx.spec(&web_and_db().replacen("id = \"e1\"", "id = \"e9\"", 1)))
        .unwrap();

    assert!(!two.previously_deployed);
    assert!(two.torn_down.is_empty());
    assert_ne!(one.work_dir, two.work_dir);
    assert_eq!(pipeline.list().unwrap().len(), 2);
}

#[test]
fn store_lock_serializes_runs() {
    let fx = Fixture::new();
    let lock_path = fx.layout().lock_file();
    let held = StoreLock::acquire(&lock_path).unwrap();
    assert!(StoreLock::try_acquire(&lock_path).unwrap().is_none());
    drop(held);
    assert!(StoreLock::try_acquire(&lock_path).unwrap().is_some());
}
