// happiness/src/commands/run.rs
//
// USE CASE: Run the whole pipeline.

use std::path::PathBuf;

use happiness_core::application::{PipelineOptions, run_pipeline};
use happiness_core::domain::report::{RunResult, StageReport};
use happiness_core::infrastructure::http::HttpFetcher;
use tracing::info;

use super::{new_table, open_project};

fn print_stages(result: &RunResult) {
    let mut table = new_table(vec!["Stage", "Result"]);
    for stage in &result.stages {
        let (name, detail) = match stage {
            StageReport::Import(r) => ("import", format!("{} files in bronze", r.files.len())),
            StageReport::Clean { reports } => (
                "preprocess",
                reports
                    .iter()
                    .map(|r| format!("{}: {} -> {} rows", r.table, r.rows_in, r.rows_out))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            StageReport::Reconcile(r) => (
                "engineer",
                format!(
                    "{} gold rows, {} overlapping keys, {} without coordinates",
                    r.gold_rows, r.overlapping_keys, r.missing_coordinates
                ),
            ),
            StageReport::Explore { artifacts } => ("explore", format!("{} charts", artifacts.len())),
        };
        table.add_row(vec![name.to_string(), detail]);
    }
    println!("{table}");
}

pub async fn execute(project_dir: PathBuf, skip_import: bool) -> anyhow::Result<()> {
    let start = std::time::Instant::now();
    let project = open_project(&project_dir)?;
    let fetcher = HttpFetcher::new()?;
    info!(skip_import, dir = %project_dir.display(), "Pipeline requested");

    let result = run_pipeline(
        &project_dir,
        &project.config,
        &project.connector,
        &fetcher,
        PipelineOptions { skip_import },
    )
    .await;

    match result {
        Ok(run_res) => {
            print_stages(&run_res);
            if run_res.success {
                println!("\n✨ SUCCESS! Pipeline finished in {:.2?}", start.elapsed());
            } else {
                for e in &run_res.errors {
                    eprintln!("   {}", e);
                }
                eprintln!("\n❌ FAILURE. Pipeline stopped after {} stages.", run_res.stages.len());
                std::process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("\n💥 CRITICAL PIPELINE ERROR: {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
