// happiness/src/commands/clean.rs
//
// USE CASE: Remove generated layers.

use std::path::PathBuf;

use happiness_core::application::clean_project;

pub fn execute(project_dir: PathBuf) -> anyhow::Result<()> {
    match clean_project(&project_dir) {
        Ok(removed) if removed.is_empty() => println!("✨ Nothing to clean"),
        Ok(removed) => println!("✨ Removed {} targets", removed.len()),
        Err(e) => {
            eprintln!("❌ Clean failed: {}", e);
            std::process::exit(1);
        }
    }
    Ok(())
}
