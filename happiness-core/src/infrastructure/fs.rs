// happiness-core/src/infrastructure/fs.rs

use crate::infrastructure::error::InfrastructureError;
use std::io::Write;
use std::path::Path;

/// Write content to a file atomically.
///
/// The bytes go to a temporary file in the target's directory, which is then
/// renamed over the target: the file is either fully written or untouched.
/// Missing parent directories are created.
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(
    path: P,
    content: C,
) -> Result<(), InfrastructureError> {
    let path = path.as_ref();
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    ensure_dir(parent)?;

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(content.as_ref())?;
    temp_file
        .persist(path)
        .map_err(|e| InfrastructureError::Io(e.error))?;

    Ok(())
}

pub fn ensure_dir(dir: &Path) -> Result<(), InfrastructureError> {
    if !dir.as_os_str().is_empty() && !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

pub fn save_json<T: serde::Serialize>(path: &Path, data: &T) -> Result<(), InfrastructureError> {
    let content = serde_json::to_string_pretty(data)
        .map_err(|e| InfrastructureError::ConfigError(format!("Serialization: {}", e)))?;
    atomic_write(path, content)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_creates_parents() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("silver/geolocation_silver.csv");

        atomic_write(&file_path, "country,country_name\n")?;

        assert_eq!(fs::read_to_string(file_path)?, "country,country_name\n");
        Ok(())
    }

    #[test]
    fn test_atomic_write_overwrites_existing() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("gold.csv");

        atomic_write(&file_path, "Initial")?;
        atomic_write(&file_path, "Updated")?;

        assert_eq!(fs::read_to_string(file_path)?, "Updated");
        Ok(())
    }

    #[test]
    fn test_save_json_is_pretty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("target/run_results.json");
        save_json(&path, &serde_json::json!({ "success": true }))?;
        assert!(fs::read_to_string(path)?.contains("\"success\": true"));
        Ok(())
    }
}
