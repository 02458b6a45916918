pub type CmdResult<T> = tagship::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}

pub mod app;
pub mod doctor;
pub mod plan;
pub mod run;

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (tagship::Result<serde_json::Value>, i32) {
    crate::tty::status("tagship is working...");

    match command {
        crate::Commands::Run(args) => dispatch!(args, global, run),
        crate::Commands::Plan(args) => dispatch!(args, global, plan),
        crate::Commands::App(args) => dispatch!(args, global, app),
        crate::Commands::Doctor(args) => dispatch!(args, global, doctor),
    }
}
