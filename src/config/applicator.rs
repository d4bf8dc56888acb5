//! Patch applicator - runs a patch set against one method body
//!
//! This module provides high-level patch application that:
//! - Filters whole patch sets by host version
//! - Routes each definition to the method it names
//! - Applies definitions in file order, each seeing the previous ones' edits
//! - Reports a result per definition; one failure never stops the rest

use crate::config::schema::{PatchConfig, PatchDefinition};
use crate::config::version::{matches_requirement, VersionError};
use crate::diagnostics::Context;
use crate::ir::InstructionStream;
use crate::seq::{PatchOutcome, SequenceError, SequencePatcher};
use std::fmt;
use tracing::{debug, info};

/// Result of applying a single patch definition
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchResult should be checked for success/skip"]
pub enum PatchResult {
    /// Target found and rewritten
    Applied {
        method: String,
        occurrences: usize,
        len_delta: isize,
    },
    /// Target absent from this method body (not an error)
    NotFound { method: String },
    /// Definition targets a different method
    SkippedMethod { method: String },
    /// Patch set does not cover this host version
    SkippedVersion { reason: String },
}

impl PatchResult {
    pub fn is_applied(&self) -> bool {
        matches!(self, PatchResult::Applied { .. })
    }
}

impl fmt::Display for PatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchResult::Applied {
                method,
                occurrences,
                len_delta,
            } => write!(
                f,
                "Applied to {method} ({occurrences} occurrence(s), {len_delta:+} instructions)"
            ),
            PatchResult::NotFound { method } => {
                write!(f, "Target not found in {method}")
            }
            PatchResult::SkippedMethod { method } => {
                write!(f, "Skipped (targets {method})")
            }
            PatchResult::SkippedVersion { reason } => {
                write!(f, "Skipped (version): {reason}")
            }
        }
    }
}

/// Errors during patch application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicationError {
    /// Version filtering error
    Version(VersionError),
    /// Definition could not be turned into a patch spec
    Sequence {
        patch_id: String,
        source: SequenceError,
    },
    /// A `required` definition found no target
    NotFound { patch_id: String, method: String },
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::Version(e) => write!(f, "version error: {e}"),
            ApplicationError::Sequence { patch_id, source } => {
                write!(f, "patch '{patch_id}': {source}")
            }
            ApplicationError::NotFound { patch_id, method } => {
                write!(
                    f,
                    "required patch '{patch_id}' found no target sequence in {method}"
                )
            }
        }
    }
}

impl std::error::Error for ApplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicationError::Version(e) => Some(e),
            ApplicationError::Sequence { source, .. } => Some(source),
            ApplicationError::NotFound { .. } => None,
        }
    }
}

impl From<VersionError> for ApplicationError {
    fn from(e: VersionError) -> Self {
        ApplicationError::Version(e)
    }
}

pub type PatchReport = Vec<(String, Result<PatchResult, ApplicationError>)>;

/// Apply a patch set to the body of `method`.
///
/// # Arguments
///
/// * `config` - The patch set to apply
/// * `method` - Name of the method whose body `stream` holds
/// * `stream` - The decoded body, rewritten in place
/// * `host_version` - Version of the host the body was decoded from
///
/// # Returns
///
/// One entry per definition in the set, in file order
pub fn apply_patches(
    config: &PatchConfig,
    method: &str,
    stream: &mut InstructionStream,
    host_version: &str,
) -> PatchReport {
    match matches_requirement(host_version, config.meta.version_range.as_deref()) {
        Ok(true) => config
            .patches
            .iter()
            .map(|patch| {
                (
                    patch.id.clone(),
                    apply_patch(&config.meta.name, patch, method, stream),
                )
            })
            .collect(),
        Ok(false) => {
            let req = config.meta.version_range.as_deref().unwrap_or("").trim();
            let reason = format!("host version {host_version} does not satisfy version_range {req}");
            info!("Skipping patch set '{}': {}", config.meta.name, reason);
            config
                .patches
                .iter()
                .map(|patch| {
                    (
                        patch.id.clone(),
                        Ok(PatchResult::SkippedVersion {
                            reason: reason.clone(),
                        }),
                    )
                })
                .collect()
        }
        Err(e) => config
            .patches
            .iter()
            .map(|patch| (patch.id.clone(), Err(ApplicationError::Version(e.clone()))))
            .collect(),
    }
}

/// Report what [`apply_patches`] would do without touching `stream`.
pub fn check_patches(
    config: &PatchConfig,
    method: &str,
    stream: &InstructionStream,
    host_version: &str,
) -> PatchReport {
    let mut scratch = stream.clone();
    apply_patches(config, method, &mut scratch, host_version)
}

fn apply_patch(
    set_name: &str,
    patch: &PatchDefinition,
    method: &str,
    stream: &mut InstructionStream,
) -> Result<PatchResult, ApplicationError> {
    if patch.method != method {
        return Ok(PatchResult::SkippedMethod {
            method: patch.method.clone(),
        });
    }

    let spec = patch.to_spec().map_err(|source| ApplicationError::Sequence {
        patch_id: patch.id.clone(),
        source,
    })?;

    let context = Context::with_caller(&patch.id, format!("{set_name} -> {method}"));
    let patcher = SequencePatcher::new()
        .verbose(patch.verbose)
        .context(&context);

    let occurrences = if patch.all_occurrences {
        patcher.apply_all(stream, &spec).len()
    } else {
        match patcher.apply(stream, &spec) {
            PatchOutcome::Applied { .. } => 1,
            PatchOutcome::NotFound => 0,
        }
    };

    if occurrences == 0 {
        return if patch.required {
            Err(ApplicationError::NotFound {
                patch_id: patch.id.clone(),
                method: method.to_string(),
            })
        } else {
            Ok(PatchResult::NotFound {
                method: method.to_string(),
            })
        };
    }

    debug!(
        "Applied patch '{}' to {} ({} occurrence(s))",
        patch.id, method, occurrences
    );

    Ok(PatchResult::Applied {
        method: method.to_string(),
        occurrences,
        len_delta: spec.len_delta() * occurrences as isize,
    })
}
