// happiness/src/commands/inspect.rs
//
// USE CASE: Inspect one table of a layer (schema + sample rows).

use anyhow::{Context, bail};
use std::path::PathBuf;

use happiness_core::application::load_csv;
use happiness_core::domain::naming::quote_ident;
use happiness_core::domain::project::Layer;
use happiness_core::ports::connector::{Connector, CsvTyping};

use super::{new_table, open_project};

pub async fn execute(
    project_dir: PathBuf,
    layer: Layer,
    table: String,
    limit: usize,
) -> anyhow::Result<()> {
    let p = open_project(&project_dir)?;

    let Some((name, file)) = layer.files().iter().find(|(name, _)| *name == table) else {
        let known: Vec<&str> = layer.files().iter().map(|(n, _)| *n).collect();
        bail!(
            "❌ Unknown table '{}' in the {} layer.\n👉 Expected one of: {}",
            table,
            layer,
            known.join(", ")
        );
    };

    let typing = if layer == Layer::Bronze {
        CsvTyping::AllText
    } else {
        CsvTyping::Infer
    };
    let path = p.layout.layer_dir(layer).join(file);
    let summary = load_csv(&p.connector, name, &path, typing)
        .await
        .with_context(|| format!("Failed to load {:?}\n👉 Have you run 'happiness run'?", path))?;

    println!("\n🔍 Inspecting Table: '{}' ({} rows)", name, summary.rows);

    let mut schema = new_table(vec!["Column", "Type", "Nullable"]);
    for col in p.connector.fetch_columns(name).await? {
        schema.add_row(vec![col.name, col.data_type, col.is_nullable.to_string()]);
    }
    println!("{schema}");

    let sample = p
        .connector
        .fetch_frame(
            name,
            &format!("SELECT * FROM {} LIMIT {}", quote_ident(name), limit),
        )
        .await?;
    println!("   --- Rows (Limit {}) ---", limit);
    let mut rows = new_table(sample.columns.iter().map(String::as_str).collect());
    for row in &sample.rows {
        rows.add_row(row.iter().map(|cell| cell.to_string()).collect::<Vec<_>>());
    }
    println!("{rows}");
    Ok(())
}
