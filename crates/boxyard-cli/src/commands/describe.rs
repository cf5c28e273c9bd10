use super::{json_pretty, make_pipeline, EXIT_SUCCESS};
use std::path::Path;

pub fn run(store_path: &Path, driver: &str, env_id: &str, json: bool) -> Result<u8, String> {
    let pipeline = make_pipeline(store_path, driver)?;
    let described = pipeline.describe(env_id).map_err(|e| e.to_string())?;
    if json {
        let payload: Vec<_> = described
            .iter()
            .map(|(name, status)| serde_json::json!({ "box": name, "status": status }))
            .collect();
        println!("{}", json_pretty(&payload)?);
    } else {
        for (name, status) in &described {
            println!("== {name} ==");
            println!("{}", status.trim_end());
        }
    }
    Ok(EXIT_SUCCESS)
}
