//! Command execution primitives with consistent error handling.

use std::process::Command;

use serde::Serialize;

/// Captured output from command execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommandOutput {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stdout: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

/// Run a full command string through `sh -c` in a working directory.
///
/// Shell execution is required for configured commands: overrides are whole
/// command strings that may use pipes, chaining and environment expansion.
pub fn execute_shell_in_dir(
    command: &str,
    current_dir: Option<&str>,
    env: Option<&[(&str, &str)]>,
) -> CommandOutput {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };

    if let Some(dir) = current_dir {
        cmd.current_dir(dir);
    }

    if let Some(env_pairs) = env {
        cmd.envs(env_pairs.iter().copied());
    }

    match cmd.output() {
        Ok(out) => CommandOutput {
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
            success: out.status.success(),
            exit_code: out.status.code().unwrap_or(-1),
        },
        Err(e) => CommandOutput {
            stdout: String::new(),
            stderr: format!("Command error: {}", e),
            success: false,
            exit_code: -1,
        },
    }
}

/// Probe a program's version output; stderr counts because some tools
/// (notably `java -version`) print there.
pub fn probe(program: &str, args: &[&str]) -> Option<CommandOutput> {
    let out = Command::new(program).args(args).output().ok()?;
    Some(CommandOutput {
        stdout: String::from_utf8_lossy(&out.stdout).to_string(),
        stderr: String::from_utf8_lossy(&out.stderr).to_string(),
        success: out.status.success(),
        exit_code: out.status.code().unwrap_or(-1),
    })
}

/// Extract error text from captured output.
///
/// Prefers stderr, falls back to stdout if stderr is empty.
pub fn error_text(output: &CommandOutput) -> String {
    if !output.stderr.trim().is_empty() {
        output.stderr.trim().to_string()
    } else {
        output.stdout.trim().to_string()
    }
}

/// Last `n` lines of whichever stream carried the failure text.
pub fn output_tail(output: &CommandOutput, n: usize) -> String {
    let text = error_text(output);
    let tail: Vec<&str> = text.lines().rev().take(n).collect();
    tail.into_iter().rev().collect::<Vec<_>>().join("\n")
}
