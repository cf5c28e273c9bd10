use super::{json_pretty, make_pipeline, EXIT_SUCCESS};
use std::path::Path;

pub fn run(store_path: &Path, driver: &str, spec: &Path, json: bool) -> Result<u8, String> {
    let pipeline = make_pipeline(store_path, driver)?;
    let (env, source_root) = pipeline.validate(spec).map_err(|e| e.to_string())?;

    if json {
        let payload = serde_json::json!({
            "valid": true,
            "env_id": env.id,
            "name": env.name,
            "boxes": env.box_names(),
            "source_root": source_root,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!(
            "spec is valid: '{}' ({}) with {} box(es)",
            env.name,
            env.id,
            env.boxes.len()
        );
    }
    Ok(EXIT_SUCCESS)
}
