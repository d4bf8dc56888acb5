use crate::ir::Instruction;
use crate::seq::{CheckMode, PatchMode, PatchSpec, Pattern, SequenceError};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct PatchConfig {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub patches: Vec<PatchDefinition>,
}

impl PatchConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.patches.is_empty() {
            issues.push(ValidationIssue::EmptyPatchList);
        }

        let mut seen_ids = HashSet::new();

        for patch in &self.patches {
            let patch_id = if patch.id.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    patch_id: None,
                    field: "id",
                });
                None
            } else {
                if !seen_ids.insert(patch.id.as_str()) {
                    issues.push(ValidationIssue::DuplicateId {
                        patch_id: patch.id.clone(),
                    });
                }
                Some(patch.id.clone())
            };

            if patch.method.trim().is_empty() {
                issues.push(ValidationIssue::MissingField {
                    patch_id: patch_id.clone(),
                    field: "method",
                });
            }
            if patch.target.is_empty() {
                issues.push(ValidationIssue::MalformedPattern {
                    patch_id: patch_id.clone(),
                    field: "target",
                });
            }
            if patch.patch.is_empty() {
                issues.push(ValidationIssue::MalformedPattern {
                    patch_id: patch_id.clone(),
                    field: "patch",
                });
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    /// Definitions that cannot form a patch spec, with the reason.
    ///
    /// These still load; each fails on its own when applied.
    pub fn unusable_patches(&self) -> impl Iterator<Item = (&str, SequenceError)> + '_ {
        self.patches
            .iter()
            .filter_map(|p| p.to_spec().err().map(|e| (p.id.as_str(), e)))
    }

    /// Definitions that target `method`, in file order.
    pub fn patches_for<'a>(&'a self, method: &'a str) -> impl Iterator<Item = &'a PatchDefinition> {
        self.patches.iter().filter(move |p| p.method == method)
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Host versions this patch set was written against, as a semver requirement.
    #[serde(default)]
    pub version_range: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PatchDefinition {
    pub id: String,
    /// Method whose body this rule rewrites.
    pub method: String,
    pub target: Vec<Instruction>,
    pub patch: Vec<Instruction>,
    /// Kept as written; parsed per patch in [`to_spec`](Self::to_spec) so an
    /// unsupported value fails only this definition.
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default = "default_check")]
    pub check: String,
    #[serde(default)]
    pub verbose: bool,
    /// A missing target is an error instead of an informational skip.
    #[serde(default)]
    pub required: bool,
    /// Rewrite every occurrence instead of only the first.
    #[serde(default)]
    pub all_occurrences: bool,
}

fn default_mode() -> String {
    PatchMode::default().to_string()
}

fn default_check() -> String {
    CheckMode::default().to_string()
}

impl PatchDefinition {
    /// Build the patch spec, failing with `InvalidArgument` for an unsupported
    /// mode or check and `MalformedPattern` for an empty sequence.
    pub fn to_spec(&self) -> Result<PatchSpec, SequenceError> {
        let mode: PatchMode = self.mode.parse()?;
        let check: CheckMode = self.check.parse()?;
        let target = Pattern::new(self.target.clone())?;
        let patch = Pattern::new(self.patch.clone())?;
        Ok(PatchSpec::new(target, patch, mode).with_check(check))
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyPatchList,
    MissingField {
        patch_id: Option<String>,
        field: &'static str,
    },
    MalformedPattern {
        patch_id: Option<String>,
        field: &'static str,
    },
    DuplicateId {
        patch_id: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyPatchList => write!(f, "patch config contains no patches"),
            ValidationIssue::MissingField { patch_id, field } => match patch_id {
                Some(id) => write!(f, "patch '{id}' missing required field '{field}'"),
                None => write!(f, "patch missing required field '{field}'"),
            },
            ValidationIssue::MalformedPattern { patch_id, field } => match patch_id {
                Some(id) => write!(f, "patch '{id}' has an empty '{field}' sequence"),
                None => write!(f, "patch has an empty '{field}' sequence"),
            },
            ValidationIssue::DuplicateId { patch_id } => {
                write!(f, "patch id '{patch_id}' is defined more than once")
            }
        }
    }
}
