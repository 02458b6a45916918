//! Artifact path resolution with glob pattern support.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Resolve a potentially glob-patterned artifact path to an actual file.
///
/// - If path contains no glob chars (`*`, `?`, `[`, `]`), returns it unchanged after existence check
/// - If path is a glob, expands and returns most recently modified match
/// - Returns error if no files match or path doesn't exist
pub fn resolve_artifact_path(pattern: &str) -> Result<PathBuf> {
    if !contains_glob_chars(pattern) {
        let path = PathBuf::from(pattern);
        if path.exists() {
            return Ok(path);
        }
        return Err(Error::build_artifact_missing(pattern));
    }

    let entries: Vec<PathBuf> = glob::glob(pattern)
        .map_err(|e| {
            Error::validation_invalid_argument(
                "artifact",
                format!("Invalid glob pattern '{}': {}", pattern, e),
                Some(pattern.to_string()),
                None,
            )
        })?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .collect();

    if entries.is_empty() {
        return Err(Error::build_artifact_missing(pattern));
    }

    let newest = entries
        .into_iter()
        .max_by_key(|p| p.metadata().and_then(|m| m.modified()).ok());

    match newest {
        Some(path) => {
            log_status!("build", "Resolved '{}' -> '{}'", pattern, path.display());
            Ok(path)
        }
        None => Err(Error::build_artifact_missing(pattern)),
    }
}

fn contains_glob_chars(s: &str) -> bool {
    s.contains('*') || s.contains('?') || s.contains('[') || s.contains(']')
}
