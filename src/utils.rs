// ABOUTME: Utility functions for the slide-bridge application
// ABOUTME: Provides helpers for path validation, directory setup and output file naming

use crate::errors::{BridgeError, Result};
use log::warn;
use std::path::{Path, PathBuf};

/// Validate that a file exists
pub fn validate_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(BridgeError::PathNotFoundError(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(BridgeError::ValidationError(format!(
            "Path is not a file: {:?}",
            path
        )));
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path).map_err(|e| BridgeError::persistence(path, e))?;
    } else if !path.is_dir() {
        return Err(BridgeError::ValidationError(format!(
            "Path exists but is not a directory: {:?}",
            path
        )));
    }
    Ok(())
}

/// Validate write permissions for a directory
pub fn validate_directory_writable(path: &Path) -> Result<()> {
    ensure_directory_exists(path)?;

    // Probe with a throwaway file
    let test_file = path.join(format!(".write_test_{}.tmp", uuid::Uuid::new_v4()));
    match std::fs::File::create(&test_file) {
        Ok(_) => {
            if let Err(e) = std::fs::remove_file(&test_file) {
                warn!("Failed to clean up test file {:?}: {}", test_file, e);
            }
            Ok(())
        }
        Err(e) => Err(BridgeError::persistence(
            path,
            format!("directory is not writable: {}", e),
        )),
    }
}

/// Turn a user-supplied output name into a safe file stem.
///
/// Path separators, `..` and characters invalid in file names are removed.
/// An empty result becomes `presentation`.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '|' | '?' | '*') && !c.is_control())
        .collect();
    let cleaned = cleaned.trim().trim_matches('.').trim();
    if cleaned.is_empty() {
        "presentation".to_string()
    } else {
        cleaned.to_string()
    }
}

/// `<dir>/<stem><suffix>.<extension>`
pub fn artifact_path(dir: &Path, stem: &str, suffix: &str, extension: &str) -> PathBuf {
    dir.join(format!("{}{}.{}", stem, suffix, extension))
}
