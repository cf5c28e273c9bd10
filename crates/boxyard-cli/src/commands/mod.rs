pub mod deploy;
pub mod describe;
pub mod destroy;
pub mod doctor;
pub mod inspect;
pub mod list;
pub mod plan;
pub mod validate;

use boxyard_core::{Pipeline, StoreLock};
use boxyard_deploy::{check_helm_prereqs, format_missing, select_driver, DriverConfig};
use boxyard_store::StoreLayout;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_SPEC_ERROR: u8 = 2;
pub const EXIT_STORE_ERROR: u8 = 3;
pub const EXIT_DEPLOY_ERROR: u8 = 4;

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_action(action: &str) -> String {
    use console::Style;
    match action {
        "apply" => Style::new().green().apply_to(action).to_string(),
        "teardown" => Style::new().yellow().apply_to(action).to_string(),
        other => other.to_owned(),
    }
}

/// Build a pipeline over the store at `store_path` with the named driver,
/// reading optional driver settings from the user config file.
pub fn make_pipeline(store_path: &Path, driver: &str) -> Result<Pipeline, String> {
    let config = DriverConfig::load_default().map_err(|e| format!("deploy error: {e}"))?;
    let driver = select_driver(driver, &config).map_err(|e| format!("deploy error: {e}"))?;
    tracing::debug!(
        "using driver '{}' with store {}",
        driver.name(),
        store_path.display()
    );
    Ok(Pipeline::new(store_path, Arc::from(driver)))
}

pub fn lock_store(store_path: &Path) -> Result<StoreLock, String> {
    let layout = StoreLayout::new(store_path);
    StoreLock::acquire(&layout.lock_file()).map_err(|e| format!("store lock: {e}"))
}

/// Fail with install hints when the helm toolchain is missing.
pub fn check_prereqs() -> Result<(), String> {
    let config = DriverConfig::load_default().map_err(|e| e.to_string())?;
    let missing = check_helm_prereqs(&config);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(format_missing(&missing))
    }
}
