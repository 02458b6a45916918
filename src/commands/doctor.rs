use clap::Args;
use serde::Serialize;

use tagship::toolchain::{self, ToolchainPins, ToolchainStatus};
use tagship::{app, secrets};

use super::CmdResult;

#[derive(Args)]

pub struct DoctorArgs {
    /// App ID whose toolchain pins to check (defaults apply otherwise)
    pub app_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]

pub struct SecretsStatus {
    pub keystore_set: bool,
    pub store_password_set: bool,
    pub key_password_set: bool,
}

#[derive(Serialize)]
#[serde(tag = "command")]

pub enum DoctorOutput {
    #[serde(rename = "doctor")]
    Doctor {
        toolchains: Vec<ToolchainStatus>,
        secrets: SecretsStatus,
    },
}

fn env_set(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| !v.trim().is_empty())
}

pub fn run(args: DoctorArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<DoctorOutput> {
    let pins = match &args.app_id {
        Some(id) => app::load(id)?.toolchains,
        None => ToolchainPins::default(),
    };

    let toolchains = toolchain::check_all(&pins);

    // Presence only; values are never read into the report
    let secrets = SecretsStatus {
        keystore_set: env_set(secrets::KEYSTORE_BASE64_VAR),
        store_password_set: env_set(secrets::STORE_PASSWORD_VAR),
        key_password_set: env_set(secrets::KEY_PASSWORD_VAR),
    };

    let exit_code = if toolchains.iter().all(|t| t.satisfied) { 0 } else { 1 };

    Ok((DoctorOutput::Doctor { toolchains, secrets }, exit_code))
}
