//! App configuration records.
//!
//! An app is the unit a pipeline runs against: where its source lives, how
//! its dependencies and release build are invoked, where the artifact lands,
//! and which repository receives the published release.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::local_files::{local, FileSystem};
use crate::paths;
use crate::toolchain::ToolchainPins;

/// Default relative artifact path produced by the release build.
pub const DEFAULT_ARTIFACT: &str = "build/app/outputs/flutter-apk/app-release.apk";

/// Default dependency resolution command.
pub const DEFAULT_DEPENDENCY_COMMAND: &str = "flutter pub get";

/// Default release build command. Icon tree-shaking is disabled explicitly.
pub const DEFAULT_BUILD_COMMAND: &str = "flutter build apk --release --no-tree-shake-icons";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishTarget {
    pub owner: String,
    pub repo: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct App {
    /// Comes from the file name; load() overwrites whatever the file says.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub local_path: String,
    /// Directory holding the signing material, relative to local_path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android_dir: Option<String>,
    /// Artifact path relative to local_path; glob patterns are allowed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependency_command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,
    #[serde(default, skip_serializing_if = "ToolchainPins::is_default")]
    pub toolchains: ToolchainPins,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<PublishTarget>,
}

impl App {
    pub fn android_dir(&self) -> &str {
        self.android_dir.as_deref().unwrap_or("android")
    }

    pub fn artifact(&self) -> &str {
        self.artifact.as_deref().unwrap_or(DEFAULT_ARTIFACT)
    }

    pub fn dependency_command(&self) -> &str {
        self.dependency_command
            .as_deref()
            .unwrap_or(DEFAULT_DEPENDENCY_COMMAND)
    }

    pub fn build_command(&self) -> &str {
        self.build_command.as_deref().unwrap_or(DEFAULT_BUILD_COMMAND)
    }

    pub fn publish_target(&self) -> Result<&PublishTarget> {
        self.publish.as_ref().ok_or_else(|| {
            Error::config_missing_key("publish", Some(format!("apps/{}.json", self.id))).with_hint(
                format!(
                    "Set the release repository: tagship app add {} --local-path <path> --owner <owner> --repo <repo>",
                    self.id
                ),
            )
        })
    }
}

pub fn load(id: &str) -> Result<App> {
    let path = paths::app(id)?;
    if !path.exists() {
        return Err(Error::app_not_found(id));
    }

    let content = local().read(&path)?;
    let mut app: App = serde_json::from_str(&content)
        .map_err(|e| Error::config_invalid_json(path.display().to_string(), e))?;
    app.id = id.to_string();
    Ok(app)
}

pub fn save(app: &App) -> Result<()> {
    let dir = paths::apps()?;
    local().ensure_dir(&dir)?;

    let path = paths::app(&app.id)?;
    let content = serde_json::to_string_pretty(app)
        .map_err(|e| Error::internal_json(e.to_string(), Some("serialize app".to_string())))?;
    local().write(&path, &content)
}

pub fn remove(id: &str) -> Result<()> {
    let path = paths::app(id)?;
    if !path.exists() {
        return Err(Error::app_not_found(id));
    }
    local().delete(&path)
}

pub fn list() -> Result<Vec<App>> {
    let dir = paths::apps()?;
    let mut apps = Vec::new();

    for entry in local().list(&dir)? {
        if entry.is_dir || !entry.is_json() {
            continue;
        }
        let Some(stem) = entry.path.file_stem().map(|s| s.to_string_lossy().to_string()) else {
            continue;
        };
        apps.push(load(&stem)?);
    }

    apps.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(apps)
}

/// Validate and expand the app's local_path (tilde expansion, absolute, exists).
pub fn validate_local_path(app: &App) -> Result<PathBuf> {
    let expanded = shellexpand::tilde(&app.local_path);
    let path = PathBuf::from(expanded.as_ref());

    if !path.is_absolute() {
        return Err(Error::validation_invalid_argument(
            "local_path",
            format!(
                "App '{}' has relative local_path '{}' which cannot be resolved",
                app.id, app.local_path
            ),
            Some(app.id.clone()),
            None,
        )
        .with_hint(format!(
            "Set absolute path: tagship app add {} --local-path \"/full/path/to/app\"",
            app.id
        )));
    }

    if !path.exists() {
        return Err(Error::validation_invalid_argument(
            "local_path",
            format!("App '{}' local_path does not exist: {}", app.id, path.display()),
            Some(app.id.clone()),
            None,
        ));
    }

    Ok(path)
}
