// happiness-core/src/infrastructure/config/project.rs

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::domain::project::configuration::PipelineConfig;
use crate::infrastructure::error::InfrastructureError;

pub const CONFIG_CANDIDATES: [&str; 2] = ["happiness_project_conf.yaml", "happiness.yaml"];

// --- LOADER ---

/// Load the project configuration.
///
/// The file is optional: without one, every default applies. Environment
/// variables are layered on top, then the result is validated.
#[instrument(skip(project_dir))]
pub fn load_pipeline_config(project_dir: &Path) -> Result<PipelineConfig, InfrastructureError> {
    load_with_env(project_dir, |key| std::env::var(key).ok())
}

pub fn load_with_env<F>(project_dir: &Path, env: F) -> Result<PipelineConfig, InfrastructureError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match find_main_config(project_dir) {
        Some(config_path) => {
            info!(path = ?config_path, "Loading project configuration");
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read project config at {:?}", config_path))?;
            serde_yaml::from_str::<PipelineConfig>(&content).with_context(|| {
                format!("Failed to parse project config YAML at {:?}", config_path)
            })?
        }
        None => {
            info!(dir = ?project_dir, "No configuration file found, using defaults");
            PipelineConfig::default()
        }
    };

    apply_env_overrides(&mut config, env);

    config
        .validate()
        .map_err(|e| InfrastructureError::ConfigError(e.to_string()))?;

    Ok(config)
}

fn find_main_config(root: &Path) -> Option<PathBuf> {
    CONFIG_CANDIDATES
        .iter()
        .map(|filename| root.join(filename))
        .find(|p| p.exists())
}

fn apply_env_overrides<F>(config: &mut PipelineConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(val) = env("HAPPINESS_DATA_DIR") {
        info!(old = ?config.data_dir, new = ?val, "Overriding data dir via ENV");
        config.data_dir = val;
    }
    if let Some(val) = env("HAPPINESS_ARTIFACTS_DIR") {
        info!(old = ?config.artifacts_dir, new = ?val, "Overriding artifacts dir via ENV");
        config.artifacts_dir = val;
    }
    if let Some(val) = env("HAPPINESS_DASHBOARD_PORT") {
        match val.parse::<u16>() {
            Ok(port) => {
                info!(old = config.dashboard.port, new = port, "Overriding dashboard port via ENV");
                config.dashboard.port = port;
            }
            Err(_) => warn!(value = %val, "Ignoring invalid HAPPINESS_DASHBOARD_PORT"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::collections::HashMap;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = load_with_env(dir.path(), no_env)?;
        assert_eq!(config.name, "world_happiness");
        assert_eq!(config.dashboard.host, "127.0.0.1");
        Ok(())
    }

    #[test]
    fn test_file_then_env_layering() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join("happiness.yaml"),
            "name: lab\ndata-dir: lake\ndashboard:\n  port: 9000\n",
        )?;
        let vars: HashMap<&str, &str> = [
            ("HAPPINESS_DATA_DIR", "/srv/data"),
            ("HAPPINESS_DASHBOARD_PORT", "not-a-port"),
        ]
        .into_iter()
        .collect();

        let config = load_with_env(dir.path(), |k| vars.get(k).map(|v| v.to_string()))?;
        assert_eq!(config.name, "lab");
        assert_eq!(config.data_dir, "/srv/data");
        assert_eq!(config.dashboard.port, 9000);
        Ok(())
    }

    #[test]
    fn test_invalid_yaml_is_reported() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("happiness_project_conf.yaml"), "dashboard: [1, 2")?;
        let err = load_with_env(dir.path(), no_env).unwrap_err();
        assert!(err.to_string().contains("happiness_project_conf.yaml"));
        Ok(())
    }

    #[test]
    fn test_validation_error_surfaces() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("happiness.yaml"), "cleaning:\n  default-year: 42\n")?;
        assert!(load_with_env(dir.path(), no_env).is_err());
        Ok(())
    }
}
