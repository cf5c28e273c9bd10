use super::{json_pretty, lock_store, make_pipeline, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use dialoguer::Confirm;
use std::io::{stderr, stdin, IsTerminal};
use std::path::Path;

fn confirm(env_id: &str, yes: bool) -> Result<bool, String> {
    if yes {
        return Ok(true);
    }
    if !(stdin().is_terminal() && stderr().is_terminal()) {
        return Err(format!(
            "refusing to destroy '{env_id}' without --yes in a non-interactive session"
        ));
    }
    Confirm::new()
        .with_prompt(format!("tear down every box of '{env_id}'?"))
        .default(false)
        .interact()
        .map_err(|e| format!("prompt failed: {e}"))
}

pub fn run(
    store_path: &Path,
    driver: &str,
    env_id: &str,
    yes: bool,
    json: bool,
) -> Result<u8, String> {
    let _lock = lock_store(store_path)?;
    let mut pipeline = make_pipeline(store_path, driver)?;
    // Surface an unknown id before asking anything.
    pipeline.inspect(env_id).map_err(|e| e.to_string())?;

    if !confirm(env_id, yes)? {
        println!("aborted");
        return Ok(EXIT_SUCCESS);
    }

    let pb = if json {
        None
    } else {
        Some(spinner("tearing down environment..."))
    };
    let torn_down = match pipeline.destroy(env_id) {
        Ok(names) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, "environment destroyed");
            }
            names
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "destroy failed");
            }
            return Err(e.to_string());
        }
    };

    if json {
        let payload = serde_json::json!({
            "env_id": env_id,
            "status": "destroyed",
            "torn_down": torn_down,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("destroyed environment {env_id} ({} box(es))", torn_down.len());
    }
    Ok(EXIT_SUCCESS)
}
