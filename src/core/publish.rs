//! Conditional release publication.
//!
//! Creates (or reuses) a release keyed by the tag name on GitHub Releases
//! and attaches the built artifact as an asset. Runs only when the trigger
//! gate passed. There is no transactional guarantee across these calls: a
//! release created before a failed upload is left in place.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::app::{App, PublishTarget};
use crate::error::{Error, PublishApiDetails, Result};
use crate::keychain;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const GITHUB_API: &str = "https://api.github.com";
const GITHUB_UPLOADS: &str = "https://uploads.github.com";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Environment variables probed for the publish token, in order.
pub const TOKEN_ENV_VARS: &[&str] = &["TAGSHIP_GITHUB_TOKEN", "GITHUB_TOKEN"];

/// Keychain variable name for a stored publish token.
pub const TOKEN_KEYCHAIN_VAR: &str = "github_token";

/// Resolve the publish token: environment first, then the app's keychain entry.
pub fn resolve_token(app_id: &str) -> Result<String> {
    for var in TOKEN_ENV_VARS {
        if let Ok(value) = std::env::var(var) {
            if !value.trim().is_empty() {
                return Ok(value.trim().to_string());
            }
        }
    }

    if let Some(token) = keychain::get(app_id, TOKEN_KEYCHAIN_VAR)? {
        return Ok(token);
    }

    Err(Error::publish_auth_missing())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseInfo {
    pub id: u64,
    pub tag_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ReleaseAsset {
    id: u64,
    name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishOutput {
    pub tag: String,
    pub release_id: u64,
    pub release_created: bool,
    pub asset_name: String,
    pub asset_replaced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_url: Option<String>,
}

/// Asset name under which the artifact is attached: its file name.
pub fn asset_name_for(artifact_path: &Path) -> Result<String> {
    artifact_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| {
            Error::validation_invalid_argument(
                "artifact",
                format!("Artifact path has no file name: {}", artifact_path.display()),
                None,
                None,
            )
        })
}

/// Request body for release creation, keyed by the tag name.
pub fn release_payload(tag: &str) -> serde_json::Value {
    serde_json::json!({
        "tag_name": tag,
        "name": tag,
        "draft": false,
        "prerelease": false,
    })
}

pub struct GithubPublisher {
    client: reqwest::blocking::Client,
    token: String,
    owner: String,
    repo: String,
    api_base: String,
    uploads_base: String,
}

impl GithubPublisher {
    pub fn new(target: &PublishTarget, token: String) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(format!("tagship/{}", VERSION))
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::internal_io(e.to_string(), Some("create HTTP client".to_string())))?;

        Ok(Self {
            client,
            token,
            owner: target.owner.clone(),
            repo: target.repo.clone(),
            api_base: GITHUB_API.to_string(),
            uploads_base: GITHUB_UPLOADS.to_string(),
        })
    }

    /// Point the publisher at different API hosts. Used by tests.
    pub fn with_base_urls(mut self, api_base: impl Into<String>, uploads_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self.uploads_base = uploads_base.into();
        self
    }

    fn releases_url(&self) -> String {
        format!("{}/repos/{}/{}/releases", self.api_base, self.owner, self.repo)
    }

    fn api_failed(operation: &str, status: Option<u16>, error: impl Into<String>) -> Error {
        Error::publish_api_failed(PublishApiDetails {
            operation: operation.to_string(),
            status,
            error: error.into(),
        })
    }

    /// Look up an existing release for the tag. 404 means none exists.
    pub fn find_release(&self, tag: &str) -> Result<Option<ReleaseInfo>> {
        let url = format!("{}/tags/{}", self.releases_url(), tag);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| Self::api_failed("find_release", None, e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_failed(
                "find_release",
                Some(status.as_u16()),
                response.text().unwrap_or_default(),
            ));
        }

        let release: ReleaseInfo = response
            .json()
            .map_err(|e| Self::api_failed("find_release", None, e.to_string()))?;
        Ok(Some(release))
    }

    /// Create the release entry keyed by the tag name.
    pub fn create_release(&self, tag: &str) -> Result<ReleaseInfo> {
        let response = self
            .client
            .post(self.releases_url())
            .bearer_auth(&self.token)
            .json(&release_payload(tag))
            .send()
            .map_err(|e| Self::api_failed("create_release", None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_failed(
                "create_release",
                Some(status.as_u16()),
                response.text().unwrap_or_default(),
            ));
        }

        response
            .json()
            .map_err(|e| Self::api_failed("create_release", None, e.to_string()))
    }

    /// Find or create the release for the tag.
    pub fn ensure_release(&self, tag: &str) -> Result<(ReleaseInfo, bool)> {
        if let Some(existing) = self.find_release(tag)? {
            log_status!("publish", "Reusing existing release for {}", tag);
            return Ok((existing, false));
        }
        let created = self.create_release(tag)?;
        Ok((created, true))
    }

    fn list_assets(&self, release_id: u64) -> Result<Vec<ReleaseAsset>> {
        let url = format!("{}/{}/assets", self.releases_url(), release_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| Self::api_failed("list_assets", None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_failed(
                "list_assets",
                Some(status.as_u16()),
                response.text().unwrap_or_default(),
            ));
        }

        response
            .json()
            .map_err(|e| Self::api_failed("list_assets", None, e.to_string()))
    }

    fn delete_asset(&self, asset_id: u64) -> Result<()> {
        let url = format!(
            "{}/repos/{}/{}/releases/assets/{}",
            self.api_base, self.owner, self.repo, asset_id
        );
        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| Self::api_failed("delete_asset", None, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_failed(
                "delete_asset",
                Some(status.as_u16()),
                response.text().unwrap_or_default(),
            ));
        }
        Ok(())
    }

    /// Upload the artifact as a release asset, replacing a same-named one.
    pub fn upload_asset(&self, release: &ReleaseInfo, artifact_path: &Path) -> Result<(String, bool)> {
        let name = asset_name_for(artifact_path)?;

        let mut replaced = false;
        for asset in self.list_assets(release.id)? {
            if asset.name == name {
                self.delete_asset(asset.id)?;
                replaced = true;
            }
        }

        let bytes = std::fs::read(artifact_path).map_err(|e| {
            Error::internal_io(
                e.to_string(),
                Some(format!("read artifact {}", artifact_path.display())),
            )
        })?;

        let url = format!(
            "{}/repos/{}/{}/releases/{}/assets?name={}",
            self.uploads_base, self.owner, self.repo, release.id, name
        );

        log_status!("publish", "Uploading {} ({} bytes)", name, bytes.len());

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("Content-Type", "application/vnd.android.package-archive")
            .body(bytes)
            .send()
            .map_err(|e| {
                Error::publish_upload_failed(PublishApiDetails {
                    operation: "upload_asset".to_string(),
                    status: None,
                    error: e.to_string(),
                })
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::publish_upload_failed(PublishApiDetails {
                operation: "upload_asset".to_string(),
                status: Some(status.as_u16()),
                error: response.text().unwrap_or_default(),
            })
            .with_hint("The release entry may already exist; re-running will reuse it"));
        }

        Ok((name, replaced))
    }
}

/// Publish the artifact under the tag's release for the app's configured repo.
pub fn publish_artifact(app: &App, tag: &str, artifact_path: &Path) -> Result<PublishOutput> {
    let target = app.publish_target()?;
    let token = resolve_token(&app.id)?;
    let publisher = GithubPublisher::new(target, token)?;

    let (release, release_created) = publisher.ensure_release(tag)?;
    let (asset_name, asset_replaced) = publisher.upload_asset(&release, artifact_path)?;

    Ok(PublishOutput {
        tag: tag.to_string(),
        release_id: release.id,
        release_created,
        asset_name,
        asset_replaced,
        html_url: release.html_url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn asset_name_is_the_artifact_file_name() {
        let path = PathBuf::from("/work/app/build/app/outputs/flutter-apk/app-release.apk");
        assert_eq!(asset_name_for(&path).unwrap(), "app-release.apk");
    }

    #[test]
    fn release_payload_is_keyed_by_tag() {
        let payload = release_payload("v1.0.0");
        assert_eq!(payload["tag_name"], "v1.0.0");
        assert_eq!(payload["name"], "v1.0.0");
        assert_eq!(payload["draft"], false);
        assert_eq!(payload["prerelease"], false);
    }

    #[test]
    fn publisher_builds_repo_scoped_urls() {
        let target = PublishTarget {
            owner: "acme".to_string(),
            repo: "demo-app".to_string(),
        };
        let publisher = GithubPublisher::new(&target, "token".to_string()).unwrap();
        assert_eq!(
            publisher.releases_url(),
            "https://api.github.com/repos/acme/demo-app/releases"
        );
    }

    #[test]
    fn base_url_override_is_respected() {
        let target = PublishTarget {
            owner: "acme".to_string(),
            repo: "demo-app".to_string(),
        };
        let publisher = GithubPublisher::new(&target, "token".to_string())
            .unwrap()
            .with_base_urls("http://127.0.0.1:9999", "http://127.0.0.1:9999");
        assert_eq!(
            publisher.releases_url(),
            "http://127.0.0.1:9999/repos/acme/demo-app/releases"
        );
    }
}
