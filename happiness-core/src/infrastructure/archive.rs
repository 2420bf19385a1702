// happiness-core/src/infrastructure/archive.rs
//
// Copies CSV members out of a zip archive or a directory tree.

use std::io::{Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::HappinessError;
use crate::infrastructure::error::InfrastructureError;
use crate::infrastructure::fs::atomic_write;

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

pub fn looks_like_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(b"PK\x03\x04")
}

/// Extract every `.csv` member under `dest`, keeping sub-folders.
///
/// Members whose path would land outside `dest` abort the extraction.
pub fn extract_csvs<R: Read + Seek>(reader: R, dest: &Path) -> Result<Vec<PathBuf>, HappinessError> {
    let mut archive = zip::ZipArchive::new(reader).map_err(InfrastructureError::from)?;
    let mut written = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(InfrastructureError::from)?;
        if entry.is_dir() {
            continue;
        }
        let Some(relative) = entry.enclosed_name() else {
            return Err(HappinessError::UnsafePath(entry.name().to_string()));
        };
        if !is_csv(&relative) {
            debug!(member = %entry.name(), "Skipping non-CSV member");
            continue;
        }

        let mut buf = Vec::new();
        entry.read_to_end(&mut buf)?;
        let out_path = dest.join(&relative);
        atomic_write(&out_path, &buf)?;
        written.push(out_path);
    }

    if written.is_empty() {
        warn!(dest = ?dest, "Archive contained no CSV files");
    }
    Ok(written)
}

pub fn extract_csvs_from_bytes(bytes: &[u8], dest: &Path) -> Result<Vec<PathBuf>, HappinessError> {
    extract_csvs(Cursor::new(bytes), dest)
}

/// Copy every `.csv` below `src` into `dest`, keeping sub-folders.
pub fn copy_csv_tree(src: &Path, dest: &Path) -> Result<Vec<PathBuf>, HappinessError> {
    let mut written = Vec::new();
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            InfrastructureError::Io(std::io::Error::other(e.to_string()))
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_csv(path) {
            continue;
        }
        let relative = path
            .strip_prefix(src)
            .map_err(|e| HappinessError::InternalError(e.to_string()))?;
        let out_path = dest.join(relative);
        let content = std::fs::read(path)?;
        atomic_write(&out_path, content)?;
        written.push(out_path);
    }
    Ok(written)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn build_zip(members: &[(&str, &str)]) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
            let options = SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated);
            for (name, content) in members {
                zip.start_file(*name, options)?;
                zip.write_all(content.as_bytes())?;
            }
            zip.finish()?;
        }
        Ok(buf)
    }

    #[test]
    fn test_extracts_only_csv_members() -> Result<()> {
        let bytes = build_zip(&[
            ("world-happiness-report.csv", "Country name,year\n"),
            ("nested/world-happiness-report-2021.csv", "Country name\n"),
            ("README.md", "# notes"),
        ])?;
        assert!(looks_like_zip(&bytes));

        let dir = tempfile::tempdir()?;
        let written = extract_csvs_from_bytes(&bytes, dir.path())?;

        assert_eq!(written.len(), 2);
        assert!(dir.path().join("nested/world-happiness-report-2021.csv").exists());
        assert!(!dir.path().join("README.md").exists());
        Ok(())
    }

    #[test]
    fn test_rejects_escaping_member() -> Result<()> {
        let bytes = build_zip(&[("../evil.csv", "x\n")])?;
        let dir = tempfile::tempdir()?;
        let result = extract_csvs_from_bytes(&bytes, &dir.path().join("bronze"));
        assert!(matches!(result, Err(HappinessError::UnsafePath(_))));
        Ok(())
    }

    #[test]
    fn test_copy_csv_tree() -> Result<()> {
        let src = tempfile::tempdir()?;
        std::fs::create_dir_all(src.path().join("a"))?;
        std::fs::write(src.path().join("a/one.csv"), "x\n1\n")?;
        std::fs::write(src.path().join("skip.txt"), "no")?;

        let dest = tempfile::tempdir()?;
        let written = copy_csv_tree(src.path(), dest.path())?;
        assert_eq!(written, vec![dest.path().join("a/one.csv")]);
        Ok(())
    }
}
