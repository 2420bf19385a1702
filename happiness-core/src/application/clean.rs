// happiness-core/src/application/clean.rs

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::domain::project::layout::{Layer, ProjectLayout};
use crate::error::HappinessError;
use crate::infrastructure::config::project::{CONFIG_CANDIDATES, load_pipeline_config};

/// Remove generated layers. Bronze and the project config are never removed.
///
/// Without `clean-targets` the silver, gold, artifacts and target directories
/// of the resolved layout are removed. Every target is checked before the
/// first deletion.
pub fn clean_project(project_dir: &Path) -> Result<Vec<String>, HappinessError> {
    tracing::info!("🧹 Cleaning generated layers...");

    let config = load_pipeline_config(project_dir)?;
    let layout = ProjectLayout::new(project_dir, &config);

    let targets = if config.clean_targets.is_empty() {
        default_targets(&layout)
    } else {
        config
            .clean_targets
            .iter()
            .map(|rel| configured_target(project_dir, rel))
            .collect::<Result<Vec<_>, _>>()?
    };

    let protected = protected_paths(&layout);
    for (label, full_path) in &targets {
        if protected.iter().any(|p| p.starts_with(full_path)) {
            return Err(HappinessError::UnsafePath(format!(
                "{label} holds source data or the project config"
            )));
        }
    }

    let mut removed = Vec::new();
    for (label, full_path) in targets {
        if full_path.exists() {
            if full_path.is_dir() {
                fs::remove_dir_all(&full_path)?;
            } else {
                fs::remove_file(&full_path)?;
            }
            println!("   🗑️  Removed: {}", label);
            removed.push(label);
        }
    }

    Ok(removed)
}

fn default_targets(layout: &ProjectLayout) -> Vec<(String, PathBuf)> {
    [
        layout.layer_dir(Layer::Silver),
        layout.layer_dir(Layer::Gold),
        layout.artifacts_dir.clone(),
        layout.target_dir.clone(),
    ]
    .into_iter()
    .map(|path| {
        let label = path
            .strip_prefix(&layout.root)
            .unwrap_or(&path)
            .display()
            .to_string();
        (label, path)
    })
    .collect()
}

/// A configured target must name something inside the project.
fn configured_target(project_dir: &Path, rel: &str) -> Result<(String, PathBuf), HappinessError> {
    let components: Vec<Component> = Path::new(rel).components().collect();
    let inside = components
        .iter()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    let names_something = components.iter().any(|c| matches!(c, Component::Normal(_)));
    if !inside || !names_something {
        return Err(HappinessError::UnsafePath(rel.to_string()));
    }
    Ok((rel.to_string(), project_dir.join(rel)))
}

fn protected_paths(layout: &ProjectLayout) -> Vec<PathBuf> {
    let mut paths = vec![layout.root.clone(), layout.layer_dir(Layer::Bronze)];
    paths.extend(CONFIG_CANDIDATES.iter().map(|name| layout.root.join(name)));
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn scaffold(root: &Path, dirs: &[&str]) -> Result<()> {
        for sub in dirs {
            fs::create_dir_all(root.join(sub))?;
        }
        Ok(())
    }

    #[test]
    fn test_clean_keeps_bronze() -> Result<()> {
        let dir = tempfile::tempdir()?;
        scaffold(dir.path(), &["data/bronze", "data/silver", "data/gold", "artifacts", "target"])?;

        let removed = clean_project(dir.path())?;
        assert_eq!(removed, vec!["data/silver", "data/gold", "artifacts", "target"]);
        assert!(dir.path().join("data/bronze").exists());
        assert!(!dir.path().join("data/gold").exists());
        Ok(())
    }

    #[test]
    fn test_clean_follows_configured_data_dir() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("happiness.yaml"), "data-dir: lake\nartifacts-dir: out/charts\n")?;
        scaffold(dir.path(), &["lake/bronze", "lake/silver", "lake/gold", "out/charts"])?;

        let removed = clean_project(dir.path())?;
        assert_eq!(removed, vec!["lake/silver", "lake/gold", "out/charts"]);
        assert!(dir.path().join("lake/bronze").exists());
        assert!(!dir.path().join("lake/silver").exists());
        assert!(!dir.path().join("lake/gold").exists());
        Ok(())
    }

    #[test]
    fn test_clean_rejects_traversal() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join("happiness.yaml"),
            "name: escape\nclean-targets:\n  - ../outside\n",
        )?;
        let err = clean_project(dir.path()).unwrap_err();
        assert!(matches!(err, HappinessError::UnsafePath(_)));
        Ok(())
    }

    #[test]
    fn test_clean_refuses_project_root_and_bronze() -> Result<()> {
        for target in ["\".\"", "\"\"", "./", "data", "data/bronze", "happiness.yaml"] {
            let dir = tempfile::tempdir()?;
            fs::write(
                dir.path().join("happiness.yaml"),
                format!("clean-targets:\n  - data/gold\n  - {target}\n"),
            )?;
            scaffold(dir.path(), &["data/bronze", "data/gold"])?;
            fs::write(dir.path().join("data/bronze/geolocation.csv"), "country\nFI\n")?;

            let err = clean_project(dir.path()).unwrap_err();
            assert!(matches!(err, HappinessError::UnsafePath(_)), "{target} accepted");
            assert!(dir.path().join("data/bronze/geolocation.csv").exists());
            assert!(dir.path().join("happiness.yaml").exists());
            // Nothing is removed when any target is refused.
            assert!(dir.path().join("data/gold").exists());
        }
        Ok(())
    }
}
