// happiness/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Parser, Subcommand};
use happiness_core::domain::project::Layer;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "happiness")]
#[command(about = "World Happiness medallion pipeline (bronze -> silver -> gold) and dashboard", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🚀 Runs the full pipeline (import -> preprocess -> engineer -> explore)
    Run {
        /// Project directory
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Reuse the files already in the bronze layer
        #[arg(long)]
        skip_import: bool,
    },

    /// 📥 Downloads or copies the raw sources into bronze
    Import {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
    },

    /// 🧽 Cleans bronze tables into silver
    Preprocess {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
    },

    /// 🔗 Reconciles silver tables into the gold table
    Engineer {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
    },

    /// 📊 Writes EDA charts for the gold table into artifacts/
    Explore {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
    },

    /// 📂 Loads every file of a layer and prints row counts
    Load {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// bronze | silver | gold
        #[arg(long)]
        layer: Layer,
    },

    /// 🔍 Inspects one table of a layer (schema + sample rows)
    Inspect {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        #[arg(long)]
        layer: Layer,

        /// Table name, e.g. "silver_2021"
        #[arg(long, short)]
        table: String,

        /// Number of sample rows to display
        #[arg(long, default_value = "5")]
        limit: usize,
    },

    /// 🌍 Serves the dashboard over the gold table
    Serve {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,

        /// Overrides dashboard.port from the configuration
        #[arg(long)]
        port: Option<u16>,
    },

    /// 🧹 Removes generated layers (silver, gold, artifacts, target)
    Clean {
        #[arg(long, default_value = ".")]
        project_dir: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};
    use clap::Parser;

    #[test]
    fn test_cli_parse_run_defaults() -> Result<()> {
        let args = Cli::parse_from(["happiness", "run"]);
        match args.command {
            Commands::Run {
                project_dir,
                skip_import,
            } => {
                assert_eq!(project_dir.to_string_lossy(), ".");
                assert!(!skip_import);
                Ok(())
            }
            _ => bail!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_run_skip_import() -> Result<()> {
        let args = Cli::parse_from(["happiness", "run", "--skip-import", "--project-dir", "/tmp"]);
        match args.command {
            Commands::Run {
                project_dir,
                skip_import,
            } => {
                assert_eq!(project_dir.to_string_lossy(), "/tmp");
                assert!(skip_import);
                Ok(())
            }
            _ => bail!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_inspect() -> Result<()> {
        let args = Cli::parse_from([
            "happiness",
            "inspect",
            "--layer",
            "Silver",
            "--table",
            "silver_2021",
            "--limit",
            "10",
        ]);
        match args.command {
            Commands::Inspect {
                layer,
                table,
                limit,
                ..
            } => {
                assert_eq!(layer, Layer::Silver);
                assert_eq!(table, "silver_2021");
                assert_eq!(limit, 10);
                Ok(())
            }
            _ => bail!("Expected Inspect command"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_layer() {
        let parsed = Cli::try_parse_from(["happiness", "load", "--layer", "platinum"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_cli_parse_serve_port() -> Result<()> {
        let args = Cli::parse_from(["happiness", "serve", "--port", "9000"]);
        match args.command {
            Commands::Serve { port, .. } => {
                assert_eq!(port, Some(9000));
                Ok(())
            }
            _ => bail!("Expected Serve command"),
        }
    }
}
