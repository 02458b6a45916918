//! Linear step engine.
//!
//! Steps declare dependencies by id; planning validates the graph and fixes
//! the execution order. Execution is strictly sequential — a single run is a
//! single thread of control — and one-directional: a failed step fails the
//! run and every step depending on it is recorded as skipped.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStep {
    pub id: String,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub needs: Vec<String>,
    /// Planned as skipped: the step is part of the plan but its gate is closed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub config: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub id: String,
    #[serde(rename = "type")]
    pub step_type: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<crate::error::Hint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_steps: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRunResult {
    pub steps: Vec<StepResult>,
    pub status: RunStatus,
    pub summary: RunSummary,
}

pub trait StepExecutor {
    fn execute_step(&self, step: &PipelineStep) -> Result<StepResult>;
}

/// Validate step ids and dependencies and return execution order.
///
/// Duplicate ids, references to unknown steps, and cycles are validation
/// errors; the fixed pipelines built by the runner always pass, but plans
/// are validated regardless so the engine never executes a malformed graph.
pub fn order_steps(steps: &[PipelineStep], field: &str) -> Result<Vec<PipelineStep>> {
    if steps.len() <= 1 {
        return Ok(steps.to_vec());
    }

    let mut id_index = HashMap::new();
    for (idx, step) in steps.iter().enumerate() {
        if id_index.contains_key(&step.id) {
            return Err(Error::validation_invalid_argument(
                field,
                format!("Duplicate step id '{}'", step.id),
                None,
                None,
            ));
        }
        id_index.insert(step.id.clone(), idx);
    }

    let mut indegree = vec![0usize; steps.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); steps.len()];

    for (idx, step) in steps.iter().enumerate() {
        for need in &step.needs {
            if let Some(&parent_idx) = id_index.get(need) {
                indegree[idx] += 1;
                dependents[parent_idx].push(idx);
            } else {
                return Err(Error::validation_invalid_argument(
                    field,
                    format!("Step '{}' depends on unknown step '{}'", step.id, need),
                    None,
                    None,
                ));
            }
        }
    }

    let mut queue = VecDeque::new();
    for (idx, count) in indegree.iter().enumerate() {
        if *count == 0 {
            queue.push_back(idx);
        }
    }

    let mut ordered = Vec::with_capacity(steps.len());
    while let Some(idx) = queue.pop_front() {
        ordered.push(steps[idx].clone());
        for &child in &dependents[idx] {
            indegree[child] -= 1;
            if indegree[child] == 0 {
                queue.push_back(child);
            }
        }
    }

    if ordered.len() != steps.len() {
        let pending: Vec<String> = steps
            .iter()
            .enumerate()
            .filter(|(idx, _)| indegree[*idx] > 0)
            .map(|(_, step)| step.id.clone())
            .collect();
        return Err(Error::validation_invalid_argument(
            field,
            "Steps contain a cycle".to_string(),
            None,
            Some(pending),
        ));
    }

    Ok(ordered)
}

fn skipped_result(step: &PipelineStep, reason: String) -> StepResult {
    StepResult {
        id: step.id.clone(),
        step_type: step.step_type.clone(),
        status: StepStatus::Skipped,
        warnings: vec![reason],
        hints: Vec::new(),
        data: None,
        error: None,
    }
}

/// Execute the steps in order, one at a time.
///
/// A disabled step is recorded as skipped without consulting the executor.
/// Once a step fails, every remaining step that depends (directly or through
/// skipped ancestors) on it is skipped with the failing id in the reason.
pub fn run(
    steps: &[PipelineStep],
    executor: &dyn StepExecutor,
    field: &str,
) -> Result<PipelineRunResult> {
    let ordered = order_steps(steps, field)?;

    let mut results: Vec<StepResult> = Vec::with_capacity(ordered.len());
    let mut status_map: HashMap<String, StepStatus> = HashMap::new();

    for step in &ordered {
        if step.disabled {
            let result = skipped_result(step, "Skipped: gate condition not met".to_string());
            status_map.insert(step.id.clone(), StepStatus::Skipped);
            results.push(result);
            continue;
        }

        let unmet = step
            .needs
            .iter()
            .find(|need| status_map.get(need.as_str()) != Some(&StepStatus::Success));
        if let Some(dep) = unmet {
            let result = skipped_result(step, format!("Skipped because '{}' did not succeed", dep));
            status_map.insert(step.id.clone(), StepStatus::Skipped);
            results.push(result);
            continue;
        }

        let result = match executor.execute_step(step) {
            Ok(result) => result,
            Err(err) => StepResult {
                id: step.id.clone(),
                step_type: step.step_type.clone(),
                status: StepStatus::Failed,
                warnings: Vec::new(),
                hints: err.hints.clone(),
                data: Some(serde_json::json!({ "code": err.code.as_str(), "details": err.details })),
                error: Some(err.message.clone()),
            },
        };

        status_map.insert(step.id.clone(), result.status.clone());
        results.push(result);
    }

    let status = derive_overall_status(&results);
    let summary = build_summary(&results);

    Ok(PipelineRunResult {
        steps: results,
        status,
        summary,
    })
}

fn derive_overall_status(results: &[StepResult]) -> RunStatus {
    if results.iter().any(|r| r.status == StepStatus::Failed) {
        return RunStatus::Failed;
    }
    if results.iter().all(|r| r.status == StepStatus::Skipped) && !results.is_empty() {
        return RunStatus::Skipped;
    }
    RunStatus::Success
}

fn build_summary(results: &[StepResult]) -> RunSummary {
    RunSummary {
        total_steps: results.len(),
        succeeded: results.iter().filter(|r| r.status == StepStatus::Success).count(),
        failed: results.iter().filter(|r| r.status == StepStatus::Failed).count(),
        skipped: results.iter().filter(|r| r.status == StepStatus::Skipped).count(),
    }
}
