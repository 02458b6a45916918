use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigMissingKey,
    ConfigInvalidJson,
    ConfigInvalidValue,

    ValidationMissingArgument,
    ValidationInvalidArgument,
    ValidationInvalidJson,

    AppNotFound,
    TriggerRefInvalid,

    SetupToolchainMissing,
    SetupToolchainVersionMismatch,

    SecretsMissing,
    SecretsDecodeFailed,

    DepsResolveFailed,

    BuildFailed,
    BuildArtifactMissing,

    PublishAuthMissing,
    PublishApiFailed,
    PublishUploadFailed,

    InternalIoError,
    InternalJsonError,
    InternalUnexpected,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigMissingKey => "config.missing_key",
            ErrorCode::ConfigInvalidJson => "config.invalid_json",
            ErrorCode::ConfigInvalidValue => "config.invalid_value",

            ErrorCode::ValidationMissingArgument => "validation.missing_argument",
            ErrorCode::ValidationInvalidArgument => "validation.invalid_argument",
            ErrorCode::ValidationInvalidJson => "validation.invalid_json",

            ErrorCode::AppNotFound => "app.not_found",
            ErrorCode::TriggerRefInvalid => "trigger.ref_invalid",

            ErrorCode::SetupToolchainMissing => "setup.toolchain_missing",
            ErrorCode::SetupToolchainVersionMismatch => "setup.toolchain_version_mismatch",

            ErrorCode::SecretsMissing => "secrets.missing",
            ErrorCode::SecretsDecodeFailed => "secrets.decode_failed",

            ErrorCode::DepsResolveFailed => "deps.resolve_failed",

            ErrorCode::BuildFailed => "build.failed",
            ErrorCode::BuildArtifactMissing => "build.artifact_missing",

            ErrorCode::PublishAuthMissing => "publish.auth_missing",
            ErrorCode::PublishApiFailed => "publish.api_failed",
            ErrorCode::PublishUploadFailed => "publish.upload_failed",

            ErrorCode::InternalIoError => "internal.io_error",
            ErrorCode::InternalJsonError => "internal.json_error",
            ErrorCode::InternalUnexpected => "internal.unexpected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMissingKeyDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidJsonDetails {
    pub path: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigInvalidValueDetails {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub problem: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotFoundDetails {
    pub id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingArgumentDetails {
    pub args: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidArgumentDetails {
    pub field: String,
    pub problem: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tried: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolchainDetails {
    pub toolchain: String,
    pub program: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandFailedDetails {
    pub command: String,
    pub working_dir: String,
    pub exit_code: i32,
    pub output_tail: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishApiDetails {
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<Hint>,
    pub retryable: Option<bool>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn validation_missing_argument(args: Vec<String>) -> Self {
        let details = serde_json::to_value(MissingArgumentDetails { args })
            .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));
        Self::new(
            ErrorCode::ValidationMissingArgument,
            "Missing required argument",
            details,
        )
    }

    pub fn validation_invalid_argument(
        field: impl Into<String>,
        problem: impl Into<String>,
        id: Option<String>,
        tried: Option<Vec<String>>,
    ) -> Self {
        let details = serde_json::to_value(InvalidArgumentDetails {
            field: field.into(),
            problem: problem.into(),
            id,
            tried,
        })
        .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

        Self::new(
            ErrorCode::ValidationInvalidArgument,
            "Invalid argument",
            details,
        )
    }

    pub fn validation_invalid_json(err: serde_json::Error, context: Option<String>) -> Self {
        let details = serde_json::json!({
            "error": err.to_string(),
            "context": context,
        });

        Self::new(ErrorCode::ValidationInvalidJson, "Invalid JSON", details)
    }

    pub fn app_not_found(id: impl Into<String>) -> Self {
        let details = serde_json::to_value(NotFoundDetails { id: id.into() })
            .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));
        Self::new(ErrorCode::AppNotFound, "App not found", details)
            .with_hint("Run 'tagship app list' to see configured apps")
    }

    pub fn trigger_ref_invalid(ref_name: impl Into<String>, problem: impl Into<String>) -> Self {
        let ref_name = ref_name.into();
        let details = serde_json::json!({
            "ref": ref_name,
            "problem": problem.into(),
        });
        Self::new(
            ErrorCode::TriggerRefInvalid,
            format!("Trigger ref '{}' is not a release tag", ref_name),
            details,
        )
        .with_hint("Release runs are triggered by refs matching 'refs/tags/v*'")
    }

    pub fn setup_toolchain_missing(details: ToolchainDetails) -> Self {
        let message = format!("Toolchain '{}' is not installed", details.toolchain);
        let details =
            serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()));
        Self::new(ErrorCode::SetupToolchainMissing, message, details)
    }

    pub fn setup_toolchain_version_mismatch(details: ToolchainDetails) -> Self {
        let message = format!(
            "Toolchain '{}' does not satisfy pinned version",
            details.toolchain
        );
        let details =
            serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()));
        Self::new(ErrorCode::SetupToolchainVersionMismatch, message, details)
    }

    pub fn secrets_missing(names: Vec<String>) -> Self {
        let details = serde_json::json!({ "missing": names });
        Self::new(
            ErrorCode::SecretsMissing,
            "Required signing secrets are not set",
            details,
        )
        .with_hint("Export ANDROID_KEYSTORE_BASE64, ANDROID_STORE_PASSWORD and ANDROID_KEY_PASSWORD")
    }

    pub fn secrets_decode_failed(error: impl Into<String>) -> Self {
        let details = serde_json::json!({ "error": error.into() });
        Self::new(
            ErrorCode::SecretsDecodeFailed,
            "Keystore secret is not valid base64",
            details,
        )
    }

    pub fn deps_resolve_failed(details: CommandFailedDetails) -> Self {
        let details =
            serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()));
        Self::new(
            ErrorCode::DepsResolveFailed,
            "Dependency resolution failed",
            details,
        )
        .retryable(true)
    }

    pub fn build_failed(details: CommandFailedDetails) -> Self {
        let details =
            serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()));
        Self::new(ErrorCode::BuildFailed, "Release build failed", details)
    }

    pub fn build_artifact_missing(path: impl Into<String>) -> Self {
        let path = path.into();
        let details = serde_json::json!({ "path": path });
        Self::new(
            ErrorCode::BuildArtifactMissing,
            format!("Build succeeded but no artifact was found at '{}'", path),
            details,
        )
    }

    pub fn publish_auth_missing() -> Self {
        Self::new(
            ErrorCode::PublishAuthMissing,
            "No publish token available",
            Value::Object(serde_json::Map::new()),
        )
        .with_hint("Set GITHUB_TOKEN, or store one with 'tagship app token <app>'")
    }

    pub fn publish_api_failed(details: PublishApiDetails) -> Self {
        let details =
            serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()));
        Self::new(
            ErrorCode::PublishApiFailed,
            "Release API request failed",
            details,
        )
        .retryable(true)
    }

    pub fn publish_upload_failed(details: PublishApiDetails) -> Self {
        let details =
            serde_json::to_value(details).unwrap_or_else(|_| Value::Object(serde_json::Map::new()));
        Self::new(
            ErrorCode::PublishUploadFailed,
            "Artifact upload failed",
            details,
        )
        .retryable(true)
    }

    pub fn config_missing_key(key: impl Into<String>, path: Option<String>) -> Self {
        let details = serde_json::to_value(ConfigMissingKeyDetails {
            key: key.into(),
            path,
        })
        .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

        Self::new(
            ErrorCode::ConfigMissingKey,
            "Missing required configuration key",
            details,
        )
    }

    pub fn config_invalid_json(path: impl Into<String>, err: serde_json::Error) -> Self {
        let details = serde_json::to_value(ConfigInvalidJsonDetails {
            path: path.into(),
            error: err.to_string(),
        })
        .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

        Self::new(
            ErrorCode::ConfigInvalidJson,
            "Invalid JSON in configuration",
            details,
        )
    }

    pub fn config_invalid_value(
        key: impl Into<String>,
        value: Option<String>,
        problem: impl Into<String>,
    ) -> Self {
        let details = serde_json::to_value(ConfigInvalidValueDetails {
            key: key.into(),
            value,
            problem: problem.into(),
        })
        .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));

        Self::new(
            ErrorCode::ConfigInvalidValue,
            "Invalid configuration value",
            details,
        )
    }

    pub fn internal_io(error: impl Into<String>, context: Option<String>) -> Self {
        let details = serde_json::json!({
            "error": error.into(),
            "context": context,
        });

        Self::new(ErrorCode::InternalIoError, "IO error", details)
    }

    pub fn internal_json(error: impl Into<String>, context: Option<String>) -> Self {
        let details = serde_json::json!({
            "error": error.into(),
            "context": context,
        });

        Self::new(ErrorCode::InternalJsonError, "JSON error", details)
    }

    pub fn internal_unexpected(error: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::InternalUnexpected,
            "Unexpected error",
            serde_json::json!({ "error": error.into() }),
        )
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::internal_unexpected(message)
    }

    pub fn with_hint(mut self, message: impl Into<String>) -> Self {
        self.hints.push(Hint {
            message: message.into(),
        });
        self
    }

    pub fn retryable(mut self, value: bool) -> Self {
        self.retryable = Some(value);
        self
    }
}
