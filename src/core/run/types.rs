use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::build::ArtifactInfo;
use crate::pipeline::{PipelineRunResult, PipelineStep, StepStatus};
use crate::publish::PublishOutput;
use crate::signing::SigningMaterials;

/// Internal step types for the release run.
/// These are fixed - the pipeline shape is non-configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunStepType {
    Setup,
    Secrets,
    Deps,
    Build,
    Publish,
    Cleanup,
}

impl RunStepType {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            RunStepType::Setup => "setup.toolchains",
            RunStepType::Secrets => "secrets.materialize",
            RunStepType::Deps => "deps.resolve",
            RunStepType::Build => "build.release",
            RunStepType::Publish => "publish.github",
            RunStepType::Cleanup => "cleanup",
        }
    }

    pub(crate) fn from_str(s: &str) -> Option<Self> {
        match s {
            "setup.toolchains" => Some(RunStepType::Setup),
            "secrets.materialize" => Some(RunStepType::Secrets),
            "deps.resolve" => Some(RunStepType::Deps),
            "build.release" => Some(RunStepType::Build),
            "publish.github" => Some(RunStepType::Publish),
            "cleanup" => Some(RunStepType::Cleanup),
            _ => None,
        }
    }
}

/// The state a run reached. Transitions are one-directional; `Published`,
/// `Skipped` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Started,
    ToolchainsReady,
    SecretsMaterialized,
    DependenciesResolved,
    ArtifactBuilt,
    Published,
    Skipped,
    Failed,
}

impl RunState {
    /// Derive the reached state from ordered step results.
    pub fn from_results(result: &PipelineRunResult) -> Self {
        let mut state = RunState::Started;

        for step in &result.steps {
            let Some(step_type) = RunStepType::from_str(&step.step_type) else {
                continue;
            };
            match (step_type, &step.status) {
                (RunStepType::Setup, StepStatus::Success) => state = RunState::ToolchainsReady,
                (RunStepType::Secrets, StepStatus::Success) => state = RunState::SecretsMaterialized,
                (RunStepType::Deps, StepStatus::Success) => state = RunState::DependenciesResolved,
                (RunStepType::Build, StepStatus::Success) => state = RunState::ArtifactBuilt,
                (RunStepType::Publish, StepStatus::Success) => state = RunState::Published,
                (RunStepType::Publish, StepStatus::Skipped) => {
                    if state == RunState::ArtifactBuilt {
                        state = RunState::Skipped;
                    }
                }
                (RunStepType::Cleanup, _) => {}
                (_, StepStatus::Failed) => return RunState::Failed,
                (_, StepStatus::Skipped) => {}
            }
        }

        if result.steps.iter().any(|s| s.status == StepStatus::Failed) {
            return RunState::Failed;
        }

        state
    }

    pub fn is_terminal_success(&self) -> bool {
        matches!(self, RunState::Published | RunState::Skipped)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOptions {
    /// Explicit trigger ref; environment is probed when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_override: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunPlan {
    pub app_id: String,
    #[serde(rename = "ref")]
    pub ref_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub publish_enabled: bool,
    pub steps: Vec<PipelineStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: Uuid,
    pub app_id: String,
    #[serde(rename = "ref")]
    pub ref_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub result: PipelineRunResult,
}

/// Context threaded through the steps of one run.
#[derive(Debug, Default)]
pub(crate) struct RunContext {
    pub signing: Option<SigningMaterials>,
    pub artifact: Option<ArtifactInfo>,
    pub publish: Option<PublishOutput>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{RunStatus, RunSummary, StepResult};

    fn result_with(statuses: &[(&str, StepStatus)]) -> PipelineRunResult {
        let steps: Vec<StepResult> = statuses
            .iter()
            .map(|(id, status)| StepResult {
                id: id.to_string(),
                step_type: id.to_string(),
                status: status.clone(),
                warnings: Vec::new(),
                hints: Vec::new(),
                data: None,
                error: None,
            })
            .collect();
        let summary = RunSummary {
            total_steps: steps.len(),
            succeeded: steps.iter().filter(|s| s.status == StepStatus::Success).count(),
            failed: steps.iter().filter(|s| s.status == StepStatus::Failed).count(),
            skipped: steps.iter().filter(|s| s.status == StepStatus::Skipped).count(),
        };
        let status = if summary.failed > 0 {
            RunStatus::Failed
        } else {
            RunStatus::Success
        };
        PipelineRunResult { steps, status, summary }
    }

    #[test]
    fn full_success_ends_published() {
        let result = result_with(&[
            ("setup.toolchains", StepStatus::Success),
            ("secrets.materialize", StepStatus::Success),
            ("deps.resolve", StepStatus::Success),
            ("build.release", StepStatus::Success),
            ("publish.github", StepStatus::Success),
            ("cleanup", StepStatus::Success),
        ]);
        assert_eq!(RunState::from_results(&result), RunState::Published);
    }

    #[test]
    fn gated_publish_ends_skipped() {
        let result = result_with(&[
            ("setup.toolchains", StepStatus::Success),
            ("secrets.materialize", StepStatus::Success),
            ("deps.resolve", StepStatus::Success),
            ("build.release", StepStatus::Success),
            ("publish.github", StepStatus::Skipped),
            ("cleanup", StepStatus::Success),
        ]);
        assert_eq!(RunState::from_results(&result), RunState::Skipped);
    }

    #[test]
    fn secrets_failure_ends_failed() {
        let result = result_with(&[
            ("setup.toolchains", StepStatus::Success),
            ("secrets.materialize", StepStatus::Failed),
            ("deps.resolve", StepStatus::Skipped),
            ("build.release", StepStatus::Skipped),
            ("publish.github", StepStatus::Skipped),
            ("cleanup", StepStatus::Skipped),
        ]);
        assert_eq!(RunState::from_results(&result), RunState::Failed);
    }

    #[test]
    fn cleanup_failure_still_fails_the_run() {
        let result = result_with(&[
            ("setup.toolchains", StepStatus::Success),
            ("secrets.materialize", StepStatus::Success),
            ("deps.resolve", StepStatus::Success),
            ("build.release", StepStatus::Success),
            ("publish.github", StepStatus::Success),
            ("cleanup", StepStatus::Failed),
        ]);
        assert_eq!(RunState::from_results(&result), RunState::Failed);
    }

    #[test]
    fn step_type_round_trips() {
        for step in [
            RunStepType::Setup,
            RunStepType::Secrets,
            RunStepType::Deps,
            RunStepType::Build,
            RunStepType::Publish,
            RunStepType::Cleanup,
        ] {
            assert_eq!(RunStepType::from_str(step.as_str()), Some(step));
        }
        assert_eq!(RunStepType::from_str("unknown"), None);
    }

    #[test]
    fn terminal_success_states() {
        assert!(RunState::Published.is_terminal_success());
        assert!(RunState::Skipped.is_terminal_success());
        assert!(!RunState::Failed.is_terminal_success());
        assert!(!RunState::ArtifactBuilt.is_terminal_success());
    }
}
