use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use crate::app::{self, App};
use crate::error::Result;
use crate::pipeline::{self, PipelineStep};
use crate::trigger::TriggerEvent;

use super::executor::RunStepExecutor;
use super::types::{RunOptions, RunPlan, RunReport, RunState, RunStepType};

/// Plan a run: the fixed linear step list, with the publish step gated on
/// the trigger ref.
///
/// Steps (always generated, non-configurable):
/// 1. Verify pinned toolchains
/// 2. Decode secrets and materialize signing config
/// 3. Resolve build dependencies
/// 4. Build the signed release artifact
/// 5. Publish to the release endpoint (iff the ref is a version tag)
/// 6. Remove run-scoped signing material
pub fn plan(app: &App, trigger: &TriggerEvent) -> RunPlan {
    let publish_enabled = trigger.is_version_tag();
    let mut hints = Vec::new();

    if !publish_enabled {
        hints.push(format!(
            "Publish is gated: ref '{}' is not a 'refs/tags/v*' version tag",
            trigger.ref_name
        ));
    }

    let step = |step_type: RunStepType, label: String, needs: &[RunStepType], disabled: bool| {
        PipelineStep {
            id: step_type.as_str().to_string(),
            step_type: step_type.as_str().to_string(),
            label: Some(label),
            needs: needs.iter().map(|n| n.as_str().to_string()).collect(),
            disabled,
            config: HashMap::new(),
        }
    };

    let steps = vec![
        step(
            RunStepType::Setup,
            "Verify pinned toolchains".to_string(),
            &[],
            false,
        ),
        step(
            RunStepType::Secrets,
            "Materialize signing config".to_string(),
            &[RunStepType::Setup],
            false,
        ),
        step(
            RunStepType::Deps,
            "Resolve build dependencies".to_string(),
            &[RunStepType::Secrets],
            false,
        ),
        step(
            RunStepType::Build,
            "Build signed release artifact".to_string(),
            &[RunStepType::Deps],
            false,
        ),
        step(
            RunStepType::Publish,
            match trigger.tag() {
                Some(tag) => format!("Publish release {}", tag),
                None => "Publish release".to_string(),
            },
            &[RunStepType::Build],
            !publish_enabled,
        ),
        step(
            RunStepType::Cleanup,
            "Remove run-scoped signing material".to_string(),
            &[RunStepType::Build],
            false,
        ),
    ];

    RunPlan {
        app_id: app.id.clone(),
        ref_name: trigger.ref_name.clone(),
        tag: trigger.tag().map(|t| t.to_string()),
        publish_enabled,
        steps,
        hints,
    }
}

/// Plan a run for a configured app without executing it.
pub fn plan_for(app_id: &str, options: &RunOptions) -> Result<RunPlan> {
    let app = app::load(app_id)?;
    let trigger = TriggerEvent::resolve(options.ref_override.as_deref())?;
    Ok(plan(&app, &trigger))
}

/// Execute a run by computing the plan and executing it.
/// What you preview (plan) is what you execute.
pub fn run(app_id: &str, options: &RunOptions) -> Result<RunReport> {
    let app = app::load(app_id)?;
    let local_path = app::validate_local_path(&app)?;
    let trigger = TriggerEvent::resolve(options.ref_override.as_deref())?;

    let run_plan = plan(&app, &trigger);
    log_status!(
        "run",
        "Starting run for '{}' ({}, publish {})",
        app.id,
        trigger.ref_name,
        if run_plan.publish_enabled { "enabled" } else { "gated" }
    );

    let started_at = Utc::now();
    let executor = RunStepExecutor::new(app.clone(), local_path, trigger.clone());

    // Any signing material left behind by a failed run (cleanup skipped) is
    // removed when the executor's context drops with the guard still inside.
    let result = pipeline::run(&run_plan.steps, &executor, "run.steps")?;
    let finished_at = Utc::now();

    let state = RunState::from_results(&result);
    let tag = trigger.tag().map(|t| t.to_string());

    Ok(RunReport {
        run_id: Uuid::new_v4(),
        app_id: app.id,
        ref_name: trigger.ref_name,
        tag,
        state,
        started_at,
        finished_at,
        result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;

    fn demo_app() -> App {
        App {
            id: "demo".to_string(),
            local_path: "/tmp/demo".to_string(),
            ..App::default()
        }
    }

    #[test]
    fn plan_has_the_fixed_step_sequence() {
        let trigger = TriggerEvent::new("refs/tags/v1.0.0");
        let plan = plan(&demo_app(), &trigger);

        let ids: Vec<&str> = plan.steps.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "setup.toolchains",
                "secrets.materialize",
                "deps.resolve",
                "build.release",
                "publish.github",
                "cleanup",
            ]
        );
        assert!(plan.publish_enabled);
        assert_eq!(plan.tag.as_deref(), Some("v1.0.0"));
    }

    #[test]
    fn branch_ref_disables_publish_only() {
        let trigger = TriggerEvent::new("refs/heads/main");
        let plan = super::plan(&demo_app(), &trigger);

        assert!(!plan.publish_enabled);
        let publish = plan.steps.iter().find(|s| s.id == "publish.github").unwrap();
        assert!(publish.disabled);
        let build = plan.steps.iter().find(|s| s.id == "build.release").unwrap();
        assert!(!build.disabled);
        assert!(!plan.hints.is_empty());
    }

    #[test]
    fn non_version_tag_disables_publish() {
        let trigger = TriggerEvent::new("refs/tags/nightly");
        let plan = super::plan(&demo_app(), &trigger);
        assert!(!plan.publish_enabled);
        assert_eq!(plan.tag.as_deref(), Some("nightly"));
    }

    #[test]
    fn plan_order_is_valid_for_the_engine() {
        let trigger = TriggerEvent::new("refs/tags/v1.0.0");
        let plan = super::plan(&demo_app(), &trigger);
        let ordered = crate::pipeline::order_steps(&plan.steps, "run.steps").unwrap();
        assert_eq!(ordered.len(), plan.steps.len());
        // cleanup comes after publish in execution order
        let pos = |id: &str| ordered.iter().position(|s| s.id == id).unwrap();
        assert!(pos("cleanup") > pos("publish.github"));
    }
}
