use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Base tagship config directory (universal ~/.config/tagship/ on all platforms)
pub fn tagship() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected(
                "APPDATA environment variable not set on Windows".to_string(),
            )
        })?;
        Ok(PathBuf::from(appdata).join("tagship"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected(
                "HOME environment variable not set on Unix-like system".to_string(),
            )
        })?;
        Ok(PathBuf::from(home).join(".config").join("tagship"))
    }
}

/// Apps directory
pub fn apps() -> Result<PathBuf> {
    Ok(tagship()?.join("apps"))
}

/// App config file path
pub fn app(id: &str) -> Result<PathBuf> {
    Ok(apps()?.join(format!("{}.json", id)))
}
