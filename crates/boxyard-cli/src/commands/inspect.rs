use super::{json_pretty, make_pipeline, EXIT_SUCCESS};
use std::path::Path;

pub fn run(store_path: &Path, driver: &str, env_id: &str, json: bool) -> Result<u8, String> {
    let pipeline = make_pipeline(store_path, driver)?;
    let snapshot = pipeline.inspect(env_id).map_err(|e| e.to_string())?;
    if json {
        println!("{}", json_pretty(&snapshot)?);
    } else {
        println!("env_id:       {}", snapshot.env_id);
        println!("name:         {}", snapshot.name);
        println!("namespace:    {}", snapshot.namespace);
        println!("work_dir:     {}", snapshot.work_dir.display());
        println!("deployed_at:  {}", snapshot.deployed_at);
        println!("boxes:        {}", snapshot.boxes.len());
        for b in &snapshot.boxes {
            println!(
                "  - {} (type {}, namespace {}, digest {}) at {}",
                b.name,
                b.box_type,
                b.namespace,
                b.source_digest.prefix(12),
                b.work_dir.display()
            );
            for app in &b.applications {
                println!("      {} -> {}", app.chart, app.staged_file.display());
            }
        }
    }
    Ok(EXIT_SUCCESS)
}
