use super::{json_pretty, EXIT_FAILURE, EXIT_SUCCESS};
use boxyard_core::StoreLock;
use boxyard_deploy::{check_helm_prereqs, format_missing, DriverConfig};
use boxyard_store::{FileSnapshotStore, StoreLayout};
use serde::Serialize;
use std::path::Path;

pub fn run(store_path: &Path, driver: &str, json_output: bool) -> Result<u8, String> {
    let mut checks: Vec<Check> = Vec::new();

    let config = check_driver_config(&mut checks);
    check_prereqs(driver, config.as_ref(), &mut checks);

    let layout = StoreLayout::new(store_path);
    if layout.store_dir().exists() {
        checks.push(Check::pass("store_exists", "Store directory exists"));
        check_store(&layout, &mut checks);
    } else {
        checks.push(Check::info(
            "store_exists",
            "Store not initialized (will be created on first deploy)",
        ));
    }

    let healthy = checks.iter().all(|c| c.status != Status::Fail);
    print_results(&checks, healthy, json_output)
}

fn check_driver_config(checks: &mut Vec<Check>) -> Option<DriverConfig> {
    match DriverConfig::load_default() {
        Ok(config) => {
            let context = config.kube_context.as_deref().unwrap_or("(current)");
            checks.push(Check::pass(
                "driver_config",
                &format!(
                    "Driver config OK (helm binary '{}', kube context {context})",
                    config.helm_bin
                ),
            ));
            Some(config)
        }
        Err(e) => {
            checks.push(Check::fail(
                "driver_config",
                &format!("Cannot load driver config: {e}"),
            ));
            None
        }
    }
}

fn check_prereqs(driver: &str, config: Option<&DriverConfig>, checks: &mut Vec<Check>) {
    if driver != "helm" {
        checks.push(Check::info(
            "driver_prereqs",
            &format!("Driver '{driver}' needs no external tools"),
        ));
        return;
    }
    let fallback = DriverConfig::default();
    let missing = check_helm_prereqs(config.unwrap_or(&fallback));
    if missing.is_empty() {
        checks.push(Check::pass("driver_prereqs", "Helm and cluster config found"));
    } else {
        checks.push(Check::fail("driver_prereqs", &format_missing(&missing)));
    }
}

fn check_store(layout: &StoreLayout, checks: &mut Vec<Check>) {
    match layout.verify_version() {
        Ok(()) => checks.push(Check::pass("store_version", "Store format version valid")),
        Err(e) => checks.push(Check::fail(
            "store_version",
            &format!("Store version check failed: {e}"),
        )),
    }

    let store = FileSnapshotStore::new(layout.clone());
    match store.list_with_errors() {
        Ok(entries) => {
            let corrupt: Vec<String> = entries
                .iter()
                .filter_map(|e| e.as_ref().err().map(|(name, err)| format!("{name}: {err}")))
                .collect();
            let total = entries.len();
            if corrupt.is_empty() {
                checks.push(Check::pass(
                    "snapshots",
                    &format!("{total} environment snapshot(s), all intact"),
                ));
            } else {
                checks.push(Check::fail(
                    "snapshots",
                    &format!(
                        "{} of {total} snapshot(s) unreadable: {}",
                        corrupt.len(),
                        corrupt.join("; ")
                    ),
                ));
            }
        }
        Err(e) => checks.push(Check::warn(
            "snapshots",
            &format!("Cannot list snapshots: {e}"),
        )),
    }

    match StoreLock::try_acquire(&layout.lock_file()) {
        Ok(Some(_)) => checks.push(Check::pass("store_lock", "Store lock is free")),
        Ok(None) => checks.push(Check::warn(
            "store_lock",
            "Store lock is held by another process",
        )),
        Err(e) => checks.push(Check::fail(
            "store_lock",
            &format!("Cannot check store lock: {e}"),
        )),
    }
}

fn print_results(checks: &[Check], healthy: bool, json_output: bool) -> Result<u8, String> {
    if json_output {
        let payload = serde_json::json!({
            "healthy": healthy,
            "checks": checks,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("boxyard doctor\n");
        for check in checks {
            let icon = match check.status {
                Status::Pass => "✓",
                Status::Fail => "✗",
                Status::Warn => "⚠",
                Status::Info => "ℹ",
            };
            println!("  {icon} {}", check.message);
        }
        println!();
        if healthy {
            println!("All checks passed.");
        } else {
            println!("Some checks failed. See above for details.");
        }
    }
    Ok(if healthy { EXIT_SUCCESS } else { EXIT_FAILURE })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum Status {
    Pass,
    Fail,
    Warn,
    Info,
}

#[derive(Debug, Serialize)]
struct Check {
    name: String,
    status: Status,
    message: String,
}

impl Check {
    fn new(name: &str, status: Status, message: &str) -> Self {
        Self {
            name: name.to_owned(),
            status,
            message: message.to_owned(),
        }
    }

    fn pass(name: &str, message: &str) -> Self {
        Self::new(name, Status::Pass, message)
    }

    fn fail(name: &str, message: &str) -> Self {
        Self::new(name, Status::Fail, message)
    }

    fn warn(name: &str, message: &str) -> Self {
        Self::new(name, Status::Warn, message)
    }

    fn info(name: &str, message: &str) -> Self {
        Self::new(name, Status::Info, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_driver_needs_no_prereqs() {
        let mut checks = Vec::new();
        check_prereqs("mock", None, &mut checks);
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].status, Status::Info);
    }

    #[test]
    fn corrupted_snapshot_fails_the_check() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        layout.initialize().unwrap();
        std::fs::create_dir_all(layout.snapshots_dir()).unwrap();
        std::fs::write(layout.snapshot_path("e1"), "not json").unwrap();

        let mut checks = Vec::new();
        check_store(&layout, &mut checks);
        let snapshots = checks.iter().find(|c| c.name == "snapshots").unwrap();
        assert_eq!(snapshots.status, Status::Fail);
        assert!(snapshots.message.contains("e1"));
    }

    #[test]
    fn healthy_store_passes() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        layout.initialize().unwrap();
        let mut checks = Vec::new();
        check_store(&layout, &mut checks);
        assert!(checks.iter().all(|c| c.status == Status::Pass));
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&Check::warn("x", "y")).unwrap();
        assert!(json.contains("\"status\":\"warn\""));
    }
}
