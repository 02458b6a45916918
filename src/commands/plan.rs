use clap::Args;
use serde::Serialize;

use tagship::core::run as runner;
use tagship::core::run::{RunOptions, RunPlan};

use super::CmdResult;

#[derive(Args)]

pub struct PlanArgs {
    /// App ID to plan a release run for
    pub app_id: String,
    /// Trigger ref (defaults to TAGSHIP_REF / GITHUB_REF)
    #[arg(long = "ref")]
    pub ref_name: Option<String>,
}

#[derive(Serialize)]
#[serde(tag = "command")]

pub enum PlanOutput {
    #[serde(rename = "plan")]
    Plan { plan: RunPlan },
}

pub fn run(args: PlanArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<PlanOutput> {
    let options = RunOptions {
        ref_override: args.ref_name,
    };

    let plan = runner::plan_for(&args.app_id, &options)?;
    Ok((PlanOutput::Plan { plan }, 0))
}
