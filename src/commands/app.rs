use clap::{Args, Subcommand};
use serde::Serialize;

use tagship::app::{self, App, PublishTarget};
use tagship::toolchain::ToolchainPins;
use tagship::{keychain, publish, Error};

use super::CmdResult;

#[derive(Args)]

pub struct AppArgs {
    #[command(subcommand)]
    command: AppCommand,
}

#[derive(Subcommand)]

enum AppCommand {
    /// Register an app
    Add {
        /// App ID
        id: String,
        /// Absolute path to the app source checkout
        #[arg(long)]
        local_path: String,
        /// Release repository owner
        #[arg(long)]
        owner: Option<String>,
        /// Release repository name
        #[arg(long)]
        repo: Option<String>,
        /// Artifact path relative to local_path (glob allowed)
        #[arg(long)]
        artifact: Option<String>,
        /// Override the release build command
        #[arg(long)]
        build_command: Option<String>,
        /// Override the dependency resolution command
        #[arg(long)]
        dependency_command: Option<String>,
        /// Directory holding signing material, relative to local_path
        #[arg(long)]
        android_dir: Option<String>,
        /// Java version pin
        #[arg(long)]
        java: Option<String>,
        /// Flutter channel or version pin
        #[arg(long)]
        flutter: Option<String>,
    },
    /// List configured apps
    List,
    /// Show one app's configuration
    Show { id: String },
    /// Remove an app
    Remove { id: String },
    /// Store (or delete) the app's publish token in the system keychain
    Token {
        id: String,
        /// Delete the stored token instead of setting one
        #[arg(long)]
        delete: bool,
    },
}

#[derive(Serialize)]
#[serde(tag = "command")]

pub enum AppOutput {
    #[serde(rename = "app.add")]
    Add { app: App },
    #[serde(rename = "app.list")]
    List { apps: Vec<App> },
    #[serde(rename = "app.show")]
    Show { app: App },
    #[serde(rename = "app.remove")]
    Remove { id: String },
    #[serde(rename = "app.token")]
    Token { id: String, stored: bool },
}

pub fn run(args: AppArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<AppOutput> {
    match args.command {
        AppCommand::Add {
            id,
            local_path,
            owner,
            repo,
            artifact,
            build_command,
            dependency_command,
            android_dir,
            java,
            flutter,
        } => {
            let publish = match (owner, repo) {
                (Some(owner), Some(repo)) => Some(PublishTarget { owner, repo }),
                (None, None) => None,
                _ => {
                    return Err(Error::validation_invalid_argument(
                        "publish",
                        "--owner and --repo must be provided together",
                        Some(id),
                        None,
                    ))
                }
            };

            let app = App {
                id,
                local_path,
                android_dir,
                artifact,
                dependency_command,
                build_command,
                toolchains: ToolchainPins { java, flutter },
                publish,
            };
            app::save(&app)?;
            Ok((AppOutput::Add { app }, 0))
        }
        AppCommand::List => {
            let apps = app::list()?;
            Ok((AppOutput::List { apps }, 0))
        }
        AppCommand::Show { id } => {
            let app = app::load(&id)?;
            Ok((AppOutput::Show { app }, 0))
        }
        AppCommand::Remove { id } => {
            app::remove(&id)?;
            Ok((AppOutput::Remove { id }, 0))
        }
        AppCommand::Token { id, delete } => {
            // Ensure the app exists before touching the keychain
            app::load(&id)?;

            if delete {
                keychain::delete(&id, publish::TOKEN_KEYCHAIN_VAR)?;
                return Ok((AppOutput::Token { id, stored: false }, 0));
            }

            let token = crate::tty::prompt("Publish token: ")?;
            if token.is_empty() {
                return Err(Error::validation_missing_argument(vec!["token".to_string()]));
            }
            keychain::store(&id, publish::TOKEN_KEYCHAIN_VAR, &token)?;
            Ok((AppOutput::Token { id, stored: true }, 0))
        }
    }
}
