//! Host-version gating for patch sets.
//!
//! A patch set declares the host versions it was written against
//! (`version_range = ">=1.2.0, <1.4.0"`); sets outside the range are skipped
//! rather than attempted.

use semver::{Version, VersionReq};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    /// The host reported something that is not a semver version.
    InvalidVersion { value: String, reason: String },
    /// The patch set's `version_range` does not parse.
    InvalidRequirement { value: String, reason: String },
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionError::InvalidVersion { value, reason } => {
                write!(f, "invalid host version '{value}': {reason}")
            }
            VersionError::InvalidRequirement { value, reason } => {
                write!(f, "invalid version_range '{value}': {reason}")
            }
        }
    }
}

impl std::error::Error for VersionError {}

/// Whether `host_version` satisfies `requirement`.
///
/// A missing or blank requirement accepts every host version without
/// parsing it.
///
/// ```
/// use seqpatch::config::version::matches_requirement;
///
/// assert!(matches_requirement("1.3.0", Some(">=1.2.0, <1.4.0")).unwrap());
/// assert!(!matches_requirement("1.4.0", Some(">=1.2.0, <1.4.0")).unwrap());
/// assert!(matches_requirement("anything", None).unwrap());
/// ```
pub fn matches_requirement(
    host_version: &str,
    requirement: Option<&str>,
) -> Result<bool, VersionError> {
    let Some(requirement) = requirement.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(true);
    };

    let req = VersionReq::parse(requirement).map_err(|e| VersionError::InvalidRequirement {
        value: requirement.to_string(),
        reason: e.to_string(),
    })?;
    let version = parse_host_version(host_version)?;

    Ok(req.matches(&version))
}

/// Parse a host version, accepting the two-component `1.2` form hosts often report.
pub fn parse_host_version(value: &str) -> Result<Version, VersionError> {
    let trimmed = value.trim().trim_start_matches('v');
    let normalized = if trimmed.split('.').count() == 2 && !trimmed.contains('-') {
        format!("{trimmed}.0")
    } else {
        trimmed.to_string()
    };

    Version::parse(&normalized).map_err(|e| VersionError::InvalidVersion {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_or_blank_requirement_accepts_all() {
        assert!(matches_requirement("1.0.0", None).unwrap());
        assert!(matches_requirement("garbage", Some("  ")).unwrap());
    }

    #[test]
    fn bounded_range() {
        let req = Some(">=1.2.0, <1.4.0");
        assert!(matches_requirement("1.2.0", req).unwrap());
        assert!(matches_requirement("1.3.9", req).unwrap());
        assert!(!matches_requirement("1.1.9", req).unwrap());
        assert!(!matches_requirement("1.4.0", req).unwrap());
    }

    #[test]
    fn two_component_host_versions() {
        assert_eq!(parse_host_version("1.2").unwrap(), Version::new(1, 2, 0));
        assert_eq!(parse_host_version("v2.0.1").unwrap(), Version::new(2, 0, 1));
        assert!(matches_requirement("1.2", Some("^1.2")).unwrap());
    }

    #[test]
    fn invalid_inputs() {
        assert!(matches!(
            matches_requirement("beta", Some(">=1.0.0")),
            Err(VersionError::InvalidVersion { .. })
        ));
        assert!(matches!(
            matches_requirement("1.0.0", Some(">=one")),
            Err(VersionError::InvalidRequirement { .. })
        ));
    }

    #[test]
    fn prerelease_hosts() {
        let req = Some(">=1.2.0-beta.2");
        assert!(matches_requirement("1.2.0-beta.3", req).unwrap());
        assert!(!matches_requirement("1.2.0-beta.1", req).unwrap());
    }
}
