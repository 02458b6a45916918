use clap::Args;
use serde::Serialize;

use tagship::core::run as runner;
use tagship::core::run::{RunOptions, RunReport};

use super::CmdResult;

#[derive(Args)]

pub struct RunArgs {
    /// App ID to run the release pipeline for
    pub app_id: String,
    /// Trigger ref (defaults to TAGSHIP_REF / GITHUB_REF)
    #[arg(long = "ref")]
    pub ref_name: Option<String>,
}

#[derive(Serialize)]
#[serde(tag = "command")]

pub enum RunOutput {
    #[serde(rename = "run")]
    Run { report: RunReport },
}

pub fn run(args: RunArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<RunOutput> {
    let options = RunOptions {
        ref_override: args.ref_name,
    };

    let report = runner::run(&args.app_id, &options)?;
    let exit_code = if report.state.is_terminal_success() { 0 } else { 1 };

    Ok((RunOutput::Run { report }, exit_code))
}
