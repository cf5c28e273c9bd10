use super::{colorize_action, json_pretty, make_pipeline, EXIT_SUCCESS};
use std::path::Path;

pub fn run(store_path: &Path, driver: &str, spec: &Path, json: bool) -> Result<u8, String> {
    let mut pipeline = make_pipeline(store_path, driver)?;
    let plan = pipeline.plan(spec).map_err(|e| e.to_string())?;
    let env = &plan.environment;

    if json {
        let payload = serde_json::json!({
            "env_id": env.id,
            "name": env.name,
            "previously_deployed": plan.was_previously_deployed(),
            "work_dir": plan.previous.as_ref().map(|p| &p.work_dir),
            "teardown": plan.teardown.iter().map(|b| serde_json::json!({
                "name": b.name,
                "namespace": b.namespace,
            })).collect::<Vec<_>>(),
            "apply": env.boxes.iter().map(|b| serde_json::json!({
                "name": b.name,
                "type": b.box_type,
                "namespace": b.namespace,
                "applications": b.applications.len(),
            })).collect::<Vec<_>>(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("environment '{}' ({})", env.name, env.id);
        match plan.previous {
            Some(ref previous) => println!(
                "previously deployed at {} into {}",
                previous.deployed_at,
                previous.work_dir.display()
            ),
            None => println!("not deployed yet"),
        }
        for b in &plan.teardown {
            println!(
                "  {:<10} {} (namespace {})",
                colorize_action("teardown"),
                b.name,
                b.namespace
            );
        }
        for b in &env.boxes {
            println!(
                "  {:<10} {} (type {}, namespace {}, {} application(s))",
                colorize_action("apply"),
                b.name,
                b.box_type,
                b.namespace,
                b.applications.len()
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
