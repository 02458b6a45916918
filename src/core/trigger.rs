//! Trigger event parsing.
//!
//! A run starts from a git ref string. Only refs under the tag prefix can
//! publish, and only tags matching the `v*` release pattern are treated as
//! version tags.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Prefix carried by tag refs.
pub const TAG_REFS_PREFIX: &str = "refs/tags/";

/// Environment variables probed for the trigger ref, in order.
pub const REF_ENV_VARS: &[&str] = &["TAGSHIP_REF", "GITHUB_REF"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    #[serde(rename = "ref")]
    pub ref_name: String,
}

impl TriggerEvent {
    pub fn new(ref_name: impl Into<String>) -> Self {
        Self {
            ref_name: ref_name.into(),
        }
    }

    /// Resolve the trigger ref from an explicit flag value or the environment.
    pub fn resolve(explicit: Option<&str>) -> Result<Self> {
        if let Some(ref_name) = explicit {
            return Ok(Self::new(ref_name));
        }

        for var in REF_ENV_VARS {
            if let Ok(value) = std::env::var(var) {
                if !value.trim().is_empty() {
                    return Ok(Self::new(value.trim()));
                }
            }
        }

        Err(Error::validation_missing_argument(vec!["ref".to_string()])
            .with_hint("Pass --ref refs/tags/v1.0.0, or set TAGSHIP_REF / GITHUB_REF"))
    }

    /// Whether the ref carries the tag prefix. This is the publish gate.
    pub fn is_tag_ref(&self) -> bool {
        self.ref_name.starts_with(TAG_REFS_PREFIX)
    }

    /// The tag name, when the ref is a tag ref.
    pub fn tag(&self) -> Option<&str> {
        self.ref_name.strip_prefix(TAG_REFS_PREFIX)
    }

    /// Whether the ref is a version tag (`refs/tags/v*`).
    pub fn is_version_tag(&self) -> bool {
        matches!(self.tag(), Some(tag) if tag.len() > 1 && tag.starts_with('v'))
    }

    /// Parse the semantic version out of a `vX.Y.Z` tag.
    ///
    /// Returns None for non-tag refs, non-`v` tags, and tags whose remainder
    /// is not a valid semver version.
    pub fn version(&self) -> Option<semver::Version> {
        let tag = self.tag()?;
        let raw = tag.strip_prefix('v')?;
        semver::Version::parse(raw).ok()
    }

    /// Require a version tag, for runs that must end in publication.
    pub fn require_version_tag(&self) -> Result<&str> {
        match self.tag() {
            Some(tag) if self.is_version_tag() => Ok(tag),
            Some(tag) => Err(Error::trigger_ref_invalid(
                &self.ref_name,
                format!("tag '{}' does not match the 'v*' release pattern", tag),
            )),
            None => Err(Error::trigger_ref_invalid(
                &self.ref_name,
                "ref does not carry the tag prefix",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_ref_is_parsed() {
        let trigger = TriggerEvent::new("refs/tags/v1.0.0");
        assert!(trigger.is_tag_ref());
        assert!(trigger.is_version_tag());
        assert_eq!(trigger.tag(), Some("v1.0.0"));
        assert_eq!(trigger.version().unwrap(), semver::Version::new(1, 0, 0));
    }

    #[test]
    fn branch_ref_never_gates_open() {
        let trigger = TriggerEvent::new("refs/heads/main");
        assert!(!trigger.is_tag_ref());
        assert!(!trigger.is_version_tag());
        assert_eq!(trigger.tag(), None);
        assert!(trigger.require_version_tag().is_err());
    }

    #[test]
    fn non_version_tag_is_not_a_release() {
        let trigger = TriggerEvent::new("refs/tags/nightly");
        assert!(trigger.is_tag_ref());
        assert!(!trigger.is_version_tag());
        let err = trigger.require_version_tag().unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::TriggerRefInvalid);
    }

    #[test]
    fn bare_v_tag_is_rejected() {
        let trigger = TriggerEvent::new("refs/tags/v");
        assert!(trigger.is_tag_ref());
        assert!(!trigger.is_version_tag());
    }

    #[test]
    fn version_parse_tolerates_non_semver_tags() {
        // Still a version tag for gating purposes; semver parse just fails
        let trigger = TriggerEvent::new("refs/tags/v1.0");
        assert!(trigger.is_version_tag());
        assert!(trigger.version().is_none());
    }

    #[test]
    fn explicit_ref_wins_over_environment() {
        let trigger = TriggerEvent::resolve(Some("refs/tags/v2.1.0")).unwrap();
        assert_eq!(trigger.ref_name, "refs/tags/v2.1.0");
    }
}
