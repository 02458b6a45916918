//! Pinned toolchain verification.
//!
//! The release build needs two toolchains on PATH: a Java distribution and
//! the Flutter SDK. Setup asserts both are present and satisfy their pins
//! before any secret is materialized; `tagship doctor` runs the same probes
//! standalone.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ToolchainDetails};
use crate::utils::command;

pub const DEFAULT_JAVA_PIN: &str = "17";
pub const DEFAULT_FLUTTER_PIN: &str = "stable";

/// Per-app pin overrides, stored in the app config.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ToolchainPins {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub java: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flutter: Option<String>,
}

impl ToolchainPins {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone)]
pub struct ToolchainSpec {
    pub id: &'static str,
    pub program: &'static str,
    pub version_args: &'static [&'static str],
    pub pin: String,
}

/// The two toolchains the release build requires, with effective pins.
pub fn required_toolchains(pins: &ToolchainPins) -> Vec<ToolchainSpec> {
    vec![
        ToolchainSpec {
            id: "java",
            program: "java",
            version_args: &["-version"],
            pin: pins.java.clone().unwrap_or_else(|| DEFAULT_JAVA_PIN.to_string()),
        },
        ToolchainSpec {
            id: "flutter",
            program: "flutter",
            version_args: &["--version"],
            pin: pins
                .flutter
                .clone()
                .unwrap_or_else(|| DEFAULT_FLUTTER_PIN.to_string()),
        },
    ]
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolchainStatus {
    pub id: String,
    pub program: String,
    pub pin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub found: Option<String>,
    pub satisfied: bool,
}

/// Whether a version probe's output satisfies a pin.
///
/// A pin is satisfied by any whitespace-delimited token that equals it or
/// that starts with `<pin>.` — so pin `17` accepts `"17.0.9"` from
/// `java -version`, and pin `stable` accepts the channel word in
/// `flutter --version` output.
pub fn pin_satisfied(output: &str, pin: &str) -> bool {
    output
        .split(|c: char| c.is_whitespace() || c == '"' || c == '\'')
        .any(|token| token == pin || token.starts_with(&format!("{}.", pin)))
}

/// First version-looking token in probe output, for reporting.
fn version_token(output: &str) -> Option<String> {
    output
        .split(|c: char| c.is_whitespace() || c == '"')
        .find(|token| {
            let mut chars = token.chars();
            chars.next().is_some_and(|c| c.is_ascii_digit()) && token.contains('.')
        })
        .map(|s| s.to_string())
}

/// Probe one toolchain. Version output on stderr counts: `java -version`
/// prints there.
pub fn verify(spec: &ToolchainSpec) -> ToolchainStatus {
    let probe = command::probe(spec.program, spec.version_args);

    let Some(output) = probe else {
        return ToolchainStatus {
            id: spec.id.to_string(),
            program: spec.program.to_string(),
            pin: spec.pin.clone(),
            found: None,
            satisfied: false,
        };
    };

    let combined = format!("{}\n{}", output.stdout, output.stderr);
    let found = version_token(&combined);

    ToolchainStatus {
        id: spec.id.to_string(),
        program: spec.program.to_string(),
        pin: spec.pin.clone(),
        found,
        satisfied: output.exit_code == 0 && pin_satisfied(&combined, &spec.pin),
    }
}

/// Verify every required toolchain, failing on the first unsatisfied one.
pub fn ensure_toolchains(pins: &ToolchainPins) -> Result<Vec<ToolchainStatus>> {
    let mut statuses = Vec::new();

    for spec in required_toolchains(pins) {
        let status = verify(&spec);
        if !status.satisfied {
            let details = ToolchainDetails {
                toolchain: status.id.clone(),
                program: status.program.clone(),
                pin: Some(status.pin.clone()),
                found: status.found.clone(),
            };
            return Err(match status.found {
                None => Error::setup_toolchain_missing(details)
                    .with_hint(format!("Install {} and ensure it is on PATH", spec.program)),
                Some(_) => Error::setup_toolchain_version_mismatch(details),
            });
        }
        log_status!("setup", "{} ok ({})", status.id, status.found.as_deref().unwrap_or("?"));
        statuses.push(status);
    }

    Ok(statuses)
}

/// Probe all toolchains without failing, for `tagship doctor`.
pub fn check_all(pins: &ToolchainPins) -> Vec<ToolchainStatus> {
    required_toolchains(pins).iter().map(verify).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn java_version_output_satisfies_major_pin() {
        let output = r#"openjdk version "17.0.9" 2023-10-17"#;
        assert!(pin_satisfied(output, "17"));
        assert!(!pin_satisfied(output, "21"));
    }

    #[test]
    fn flutter_channel_satisfies_channel_pin() {
        let output = "Flutter 3.24.3 • channel stable • https://github.com/flutter/flutter.git";
        assert!(pin_satisfied(output, "stable"));
        assert!(pin_satisfied(output, "3"));
        assert!(!pin_satisfied(output, "beta"));
    }

    #[test]
    fn pin_does_not_match_inside_words() {
        assert!(!pin_satisfied("unstable channel", "stable"));
        assert!(!pin_satisfied("version 170.1", "17"));
    }

    #[test]
    fn version_token_extraction() {
        assert_eq!(
            version_token(r#"openjdk version "17.0.9" 2023-10-17"#).as_deref(),
            Some("17.0.9")
        );
        assert_eq!(
            version_token("Flutter 3.24.3 • channel stable").as_deref(),
            Some("3.24.3")
        );
        assert_eq!(version_token("no digits here"), None);
    }

    #[test]
    fn defaults_pin_java_17_and_flutter_stable() {
        let specs = required_toolchains(&ToolchainPins::default());
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].pin, "17");
        assert_eq!(specs[1].pin, "stable");
    }

    #[test]
    fn app_pins_override_defaults() {
        let pins = ToolchainPins {
            java: Some("21".to_string()),
            flutter: None,
        };
        let specs = required_toolchains(&pins);
        assert_eq!(specs[0].pin, "21");
        assert_eq!(specs[1].pin, "stable");
    }

    #[test]
    fn missing_program_reports_unsatisfied() {
        let spec = ToolchainSpec {
            id: "java",
            program: "definitely_not_a_real_jvm",
            version_args: &["-version"],
            pin: "17".to_string(),
        };
        let status = verify(&spec);
        assert!(!status.satisfied);
        assert!(status.found.is_none());
    }
}
