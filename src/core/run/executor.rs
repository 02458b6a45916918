use std::path::PathBuf;
use std::sync::Mutex;

use crate::app::App;
use crate::error::{Error, Result};
use crate::pipeline::{PipelineStep, StepExecutor, StepResult, StepStatus};
use crate::secrets::SecretBundle;
use crate::signing::SigningMaterials;
use crate::trigger::TriggerEvent;
use crate::{build, publish, toolchain};

use super::types::{RunContext, RunStepType};

pub(crate) struct RunStepExecutor {
    app: App,
    local_path: PathBuf,
    trigger: TriggerEvent,
    pub(crate) context: Mutex<RunContext>,
}

impl RunStepExecutor {
    pub fn new(app: App, local_path: PathBuf, trigger: TriggerEvent) -> Self {
        Self {
            app,
            local_path,
            trigger,
            context: Mutex::new(RunContext::default()),
        }
    }

    fn lock_context(&self) -> Result<std::sync::MutexGuard<'_, RunContext>> {
        self.context
            .lock()
            .map_err(|_| Error::internal_unexpected("Failed to lock run context".to_string()))
    }

    fn success(
        &self,
        step: &PipelineStep,
        data: Option<serde_json::Value>,
    ) -> StepResult {
        StepResult {
            id: step.id.clone(),
            step_type: step.step_type.clone(),
            status: StepStatus::Success,
            warnings: Vec::new(),
            hints: Vec::new(),
            data,
            error: None,
        }
    }

    fn run_setup(&self, step: &PipelineStep) -> Result<StepResult> {
        let statuses = toolchain::ensure_toolchains(&self.app.toolchains)?;
        let data = serde_json::to_value(&statuses)
            .map_err(|e| Error::internal_json(e.to_string(), Some("toolchain statuses".to_string())))?;
        Ok(self.success(step, Some(data)))
    }

    fn run_secrets(&self, step: &PipelineStep) -> Result<StepResult> {
        let bundle = SecretBundle::from_env()?;
        let android_dir = self.local_path.join(self.app.android_dir());
        let materials = SigningMaterials::materialize(&android_dir, &bundle)?;

        // Paths only; the secret values never enter any output
        let data = serde_json::json!({
            "keystore": materials.keystore_path().display().to_string(),
            "properties": materials.properties_path().display().to_string(),
        });

        self.lock_context()?.signing = Some(materials);
        Ok(self.success(step, Some(data)))
    }

    fn run_deps(&self, step: &PipelineStep) -> Result<StepResult> {
        let output = build::resolve_dependencies(&self.app, &self.local_path)?;
        let data = serde_json::to_value(&output)
            .map_err(|e| Error::internal_json(e.to_string(), Some("deps output".to_string())))?;
        Ok(self.success(step, Some(data)))
    }

    fn run_build(&self, step: &PipelineStep) -> Result<StepResult> {
        {
            // The signing config must exist before the build reads it
            let context = self.lock_context()?;
            let missing = match &context.signing {
                Some(materials) => !materials.properties_path().exists(),
                None => true,
            };
            if missing {
                return Err(Error::validation_invalid_argument(
                    "signing",
                    "Signing config is not materialized",
                    None,
                    None,
                ));
            }
        }

        let output = build::build_release(&self.app, &self.local_path)?;
        let data = serde_json::to_value(&output)
            .map_err(|e| Error::internal_json(e.to_string(), Some("build output".to_string())))?;

        self.lock_context()?.artifact = Some(output.artifact);
        Ok(self.success(step, Some(data)))
    }

    fn run_publish(&self, step: &PipelineStep) -> Result<StepResult> {
        let tag = self.trigger.require_version_tag()?.to_string();

        let artifact_path = {
            let context = self.lock_context()?;
            let artifact = context.artifact.as_ref().ok_or_else(|| {
                Error::validation_invalid_argument(
                    "artifact",
                    "No artifact recorded for publish step",
                    None,
                    Some(vec!["Ensure the build step runs before publish".to_string()]),
                )
            })?;
            PathBuf::from(&artifact.path)
        };

        let output = publish::publish_artifact(&self.app, &tag, &artifact_path)?;
        let data = serde_json::to_value(&output)
            .map_err(|e| Error::internal_json(e.to_string(), Some("publish output".to_string())))?;

        self.lock_context()?.publish = Some(output);
        Ok(self.success(step, Some(data)))
    }

    fn run_cleanup(&self, step: &PipelineStep) -> Result<StepResult> {
        let materials = self.lock_context()?.signing.take();

        let removed = match materials {
            Some(mut materials) => materials.cleanup()?,
            None => Vec::new(),
        };

        let data = serde_json::json!({
            "action": "cleanup",
            "removed": removed,
        });
        Ok(self.success(step, Some(data)))
    }
}

impl StepExecutor for RunStepExecutor {
    fn execute_step(&self, step: &PipelineStep) -> Result<StepResult> {
        let step_type = RunStepType::from_str(&step.step_type).ok_or_else(|| {
            Error::validation_invalid_argument(
                "step",
                format!("Unknown step type '{}'", step.step_type),
                None,
                None,
            )
        })?;

        match step_type {
            RunStepType::Setup => self.run_setup(step),
            RunStepType::Secrets => self.run_secrets(step),
            RunStepType::Deps => self.run_deps(step),
            RunStepType::Build => self.run_build(step),
            RunStepType::Publish => self.run_publish(step),
            RunStepType::Cleanup => self.run_cleanup(step),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::types::RunState;
    use crate::pipeline::{self, RunStatus};
    use crate::secrets;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn step(step_type: RunStepType, needs: &[RunStepType]) -> PipelineStep {
        PipelineStep {
            id: step_type.as_str().to_string(),
            step_type: step_type.as_str().to_string(),
            label: None,
            needs: needs.iter().map(|n| n.as_str().to_string()).collect(),
            disabled: false,
            config: HashMap::new(),
        }
    }

    /// Steps below setup: toolchains are not probed so the test does not
    /// depend on a Java or Flutter install.
    fn steps_without_setup() -> Vec<PipelineStep> {
        vec![
            step(RunStepType::Secrets, &[]),
            step(RunStepType::Deps, &[RunStepType::Secrets]),
            step(RunStepType::Build, &[RunStepType::Deps]),
            step(RunStepType::Publish, &[RunStepType::Build]),
            step(RunStepType::Cleanup, &[RunStepType::Build]),
        ]
    }

    fn app_in(dir: &TempDir) -> App {
        App {
            id: "demo".to_string(),
            local_path: dir.path().display().to_string(),
            dependency_command: Some("true".to_string()),
            build_command: Some("printf apk > out.apk".to_string()),
            artifact: Some("out.apk".to_string()),
            ..App::default()
        }
    }

    fn set_secret_env(keystore: &str) {
        std::env::set_var(secrets::KEYSTORE_BASE64_VAR, keystore);
        std::env::set_var(secrets::STORE_PASSWORD_VAR, "store-pass");
        std::env::set_var(secrets::KEY_PASSWORD_VAR, "key-pass");
    }

    fn clear_secret_env() {
        std::env::remove_var(secrets::KEYSTORE_BASE64_VAR);
        std::env::remove_var(secrets::STORE_PASSWORD_VAR);
        std::env::remove_var(secrets::KEY_PASSWORD_VAR);
    }

    // One test covers both secret scenarios; the env vars are process-global
    // and must not be mutated from concurrent tests.
    #[test]
    fn secrets_drive_the_run_outcome() {
        // Valid secrets: the run reaches the build, records the artifact,
        // and cleanup removes the materialized signing files.
        let dir = TempDir::new().unwrap();
        set_secret_env(&BASE64.encode(b"keystore bytes"));

        let mut gated = steps_without_setup();
        // Branch ref: publish stays gated
        gated[3].disabled = true;

        let executor = RunStepExecutor::new(
            app_in(&dir),
            dir.path().to_path_buf(),
            TriggerEvent::new("refs/heads/main"),
        );
        let result = pipeline::run(&gated, &executor, "run.steps").unwrap();

        assert_eq!(result.status, RunStatus::Success);
        assert_eq!(RunState::from_results(&result), RunState::Skipped);
        assert!(dir.path().join("out.apk").exists());
        assert!(!dir.path().join("android/key.properties").exists());
        assert!(!dir.path().join("android/app/upload-keystore.jks").exists());
        {
            let context = executor.context.lock().unwrap();
            assert!(context.artifact.is_some());
            assert!(context.publish.is_none());
        }

        // Malformed base64: the run fails at the secrets step, every later
        // step is skipped, and nothing was written.
        let dir = TempDir::new().unwrap();
        set_secret_env("%%% not base64 %%%");

        let executor = RunStepExecutor::new(
            app_in(&dir),
            dir.path().to_path_buf(),
            TriggerEvent::new("refs/tags/v1.0.0"),
        );
        let result = pipeline::run(&steps_without_setup(), &executor, "run.steps").unwrap();

        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(RunState::from_results(&result), RunState::Failed);
        assert_eq!(result.steps[0].id, "secrets.materialize");
        assert_eq!(
            result.steps[0].data.as_ref().unwrap()["code"],
            "secrets.decode_failed"
        );
        for later in &result.steps[1..] {
            assert_eq!(later.status, crate::pipeline::StepStatus::Skipped);
        }
        assert!(!dir.path().join("android/key.properties").exists());

        clear_secret_env();
    }
}
