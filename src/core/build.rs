//! Dependency resolution and the release build.
//!
//! Both steps shell out to the app's configured commands in its local path.
//! Dependency resolution is idempotent and network-dependent; a failure is
//! fatal with no retry. The build consumes the materialized signing config
//! implicitly through the build configuration.

use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::app::App;
use crate::error::{CommandFailedDetails, Error, Result};
use crate::utils::artifact::resolve_artifact_path;
use crate::utils::command::{self, execute_shell_in_dir};

const OUTPUT_TAIL_LINES: usize = 15;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyOutput {
    pub command: String,
    pub exit_code: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactInfo {
    pub path: String,
    pub size_bytes: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutput {
    pub command: String,
    pub artifact: ArtifactInfo,
}

/// Fetch build dependencies in the app directory.
pub fn resolve_dependencies(app: &App, local_path: &Path) -> Result<DependencyOutput> {
    let cmd = app.dependency_command();
    let dir = local_path.to_string_lossy().to_string();
    log_status!("deps", "Resolving dependencies: {}", cmd);

    let output = execute_shell_in_dir(cmd, Some(&dir), None);
    if !output.success {
        return Err(Error::deps_resolve_failed(CommandFailedDetails {
            command: cmd.to_string(),
            working_dir: dir,
            exit_code: output.exit_code,
            output_tail: command::output_tail(&output, OUTPUT_TAIL_LINES),
        })
        .with_hint("Dependency resolution needs network access to the package registry"));
    }

    Ok(DependencyOutput {
        command: cmd.to_string(),
        exit_code: output.exit_code,
    })
}

/// Run the release build and resolve the produced artifact.
///
/// The signing config file must exist before this runs; the build reads it
/// implicitly. No artifact is reported unless the build command succeeded.
pub fn build_release(app: &App, local_path: &Path) -> Result<BuildOutput> {
    let cmd = app.build_command();
    let dir = local_path.to_string_lossy().to_string();
    log_status!("build", "Building release: {}", cmd);

    let output = execute_shell_in_dir(cmd, Some(&dir), None);
    if !output.success {
        let hint = match output.exit_code {
            127 => Some("Command not found. Check that the build tool is installed and on PATH"),
            126 => Some("Permission denied. Check file permissions on the build command"),
            _ => None,
        };
        let mut err = Error::build_failed(CommandFailedDetails {
            command: cmd.to_string(),
            working_dir: dir,
            exit_code: output.exit_code,
            output_tail: command::output_tail(&output, OUTPUT_TAIL_LINES),
        });
        if let Some(hint) = hint {
            err = err.with_hint(hint);
        }
        return Err(err);
    }

    let artifact_path = resolve_artifact(app, local_path)?;
    let artifact = describe_artifact(&artifact_path)?;

    Ok(BuildOutput {
        command: cmd.to_string(),
        artifact,
    })
}

/// Resolve the artifact path relative to the app directory.
pub fn resolve_artifact(app: &App, local_path: &Path) -> Result<PathBuf> {
    let configured = app.artifact();
    let pattern = if Path::new(configured).is_absolute() {
        configured.to_string()
    } else {
        local_path.join(configured).to_string_lossy().to_string()
    };
    resolve_artifact_path(&pattern)
}

/// Size and checksum for the run report.
pub fn describe_artifact(path: &Path) -> Result<ArtifactInfo> {
    let bytes = std::fs::read(path).map_err(|e| {
        Error::internal_io(e.to_string(), Some(format!("read artifact {}", path.display())))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let sha256 = format!("{:x}", hasher.finalize());

    Ok(ArtifactInfo {
        path: path.display().to_string(),
        size_bytes: bytes.len() as u64,
        sha256,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn app_with(dir: &TempDir, dependency: &str, build: &str, artifact: &str) -> App {
        App {
            id: "demo".to_string(),
            local_path: dir.path().display().to_string(),
            dependency_command: Some(dependency.to_string()),
            build_command: Some(build.to_string()),
            artifact: Some(artifact.to_string()),
            ..App::default()
        }
    }

    #[test]
    fn dependency_failure_is_fatal_and_retryable() {
        let dir = TempDir::new().unwrap();
        let app = app_with(&dir, "exit 69", "true", "out.apk");

        let err = resolve_dependencies(&app, dir.path()).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::DepsResolveFailed);
        assert_eq!(err.retryable, Some(true));
        assert_eq!(err.details["exitCode"], 69);
    }

    #[test]
    fn dependency_success_reports_command() {
        let dir = TempDir::new().unwrap();
        let app = app_with(&dir, "true", "true", "out.apk");

        let output = resolve_dependencies(&app, dir.path()).unwrap();
        assert_eq!(output.command, "true");
        assert_eq!(output.exit_code, 0);
    }

    #[test]
    fn build_failure_carries_output_tail() {
        let dir = TempDir::new().unwrap();
        let app = app_with(&dir, "true", "echo boom >&2; exit 1", "out.apk");

        let err = build_release(&app, dir.path()).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::BuildFailed);
        assert_eq!(err.details["outputTail"], "boom");
    }

    #[test]
    fn successful_build_resolves_and_hashes_artifact() {
        let dir = TempDir::new().unwrap();
        let app = app_with(&dir, "true", "printf apk-bytes > out.apk", "out.apk");

        let output = build_release(&app, dir.path()).unwrap();
        assert!(output.artifact.path.ends_with("out.apk"));
        assert_eq!(output.artifact.size_bytes, 9);
        // sha256 of "apk-bytes"
        assert_eq!(output.artifact.sha256.len(), 64);
    }

    #[test]
    fn successful_build_without_artifact_is_an_error() {
        let dir = TempDir::new().unwrap();
        let app = app_with(&dir, "true", "true", "missing/app-release.apk");

        let err = build_release(&app, dir.path()).unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::BuildArtifactMissing);
    }

    #[test]
    fn artifact_glob_resolves_inside_app_dir() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("dist")).unwrap();
        fs::write(dir.path().join("dist/app-1.2.3-release.apk"), b"x").unwrap();

        let app = app_with(&dir, "true", "true", "dist/*.apk");
        let path = resolve_artifact(&app, dir.path()).unwrap();
        assert!(path.ends_with("dist/app-1.2.3-release.apk"));
    }
}
