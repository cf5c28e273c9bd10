use super::{
    colorize_action, json_pretty, lock_store, make_pipeline, spin_fail, spin_ok, spinner,
    EXIT_SUCCESS,
};
use std::path::Path;

pub fn run(store_path: &Path, driver: &str, spec: &Path, json: bool) -> Result<u8, String> {
    let _lock = lock_store(store_path)?;
    let mut pipeline = make_pipeline(store_path, driver)?;

    let pb = if json {
        None
    } else {
        Some(spinner("deploying environment..."))
    };

    let report = match pipeline.deploy(spec) {
        Ok(r) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, "environment deployed");
            }
            r
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "deploy failed");
            }
            return Err(e.to_string());
        }
    };

    if json {
        println!("{}", json_pretty(&report)?);
    } else {
        println!("deployed environment '{}' ({})", report.name, report.env_id);
        println!("work_dir: {}", report.work_dir.display());
        for name in &report.torn_down {
            println!("  {:<10} {name}", colorize_action("teardown"));
        }
        for name in &report.applied {
            println!("  {:<10} {name}", colorize_action("apply"));
        }
    }
    Ok(EXIT_SUCCESS)
}
