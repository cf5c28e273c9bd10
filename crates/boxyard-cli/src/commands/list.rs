use super::{json_pretty, make_pipeline, EXIT_SUCCESS};
use std::path::Path;

pub fn run(store_path: &Path, driver: &str, json: bool) -> Result<u8, String> {
    let pipeline = make_pipeline(store_path, driver)?;
    let envs = pipeline.list().map_err(|e| e.to_string())?;
    if json {
        println!("{}", json_pretty(&envs)?);
    } else if envs.is_empty() {
        println!("no environments deployed");
    } else {
        println!(
            "{:<20} {:<16} {:<16} {:<6} DEPLOYED_AT",
            "ENV_ID", "NAME", "NAMESPACE", "BOXES"
        );
        for env in &envs {
            println!(
                "{:<20} {:<16} {:<16} {:<6} {}",
                env.env_id,
                env.name,
                env.namespace,
                env.boxes.len(),
                env.deployed_at
            );
        }
    }
    Ok(EXIT_SUCCESS)
}
