//! The release pipeline runner.
//!
//! One run = one strictly sequential pass over a fixed step list: verify
//! toolchains, materialize signing secrets, resolve dependencies, build the
//! signed artifact, conditionally publish it, clean up.

mod executor;
mod pipeline;
mod types;

pub use pipeline::{plan, plan_for, run};
pub use types::{RunOptions, RunPlan, RunReport, RunState};
