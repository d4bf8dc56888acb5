use crate::diagnostics::{Context, DiagnosticsReporter, Operation};
use crate::ir::InstructionStream;
use crate::seq::errors::SequenceError;
use crate::seq::matcher::{CheckMode, SequenceMatcher};
use crate::seq::pattern::Pattern;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

/// Where patch instructions go relative to a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum PatchMode {
    Before,
    #[default]
    After,
    Replace,
}

impl fmt::Display for PatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PatchMode::Before => "before",
            PatchMode::After => "after",
            PatchMode::Replace => "replace",
        };
        f.write_str(s)
    }
}

impl FromStr for PatchMode {
    type Err = SequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "before" => Ok(PatchMode::Before),
            "after" => Ok(PatchMode::After),
            "replace" => Ok(PatchMode::Replace),
            _ => Err(SequenceError::InvalidArgument {
                argument: "patch_mode",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for PatchMode {
    type Error = SequenceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Raw mode codes as passed by hosts across an FFI-style boundary.
impl TryFrom<u8> for PatchMode {
    type Error = SequenceError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(PatchMode::Before),
            1 => Ok(PatchMode::After),
            2 => Ok(PatchMode::Replace),
            other => Err(SequenceError::InvalidArgument {
                argument: "patch_mode",
                value: other.to_string(),
            }),
        }
    }
}

/// A complete rewrite rule: what to look for, what to insert, and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSpec {
    pub target: Pattern,
    pub patch: Pattern,
    pub mode: PatchMode,
    pub check: CheckMode,
}

impl PatchSpec {
    pub fn new(target: Pattern, patch: Pattern, mode: PatchMode) -> Self {
        Self {
            target,
            patch,
            mode,
            check: CheckMode::default(),
        }
    }

    pub fn with_check(mut self, check: CheckMode) -> Self {
        self.check = check;
        self
    }

    /// Change in stream length caused by one successful application.
    pub fn len_delta(&self) -> isize {
        match self.mode {
            PatchMode::Before | PatchMode::After => self.patch.len() as isize,
            PatchMode::Replace => self.patch.len() as isize - self.target.len() as isize,
        }
    }
}

/// Result of a single `apply`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchOutcome reports whether the target was found"]
pub enum PatchOutcome {
    Applied {
        /// Start of the matched window in the original stream.
        matched_at: usize,
        /// Indices now occupied by the inserted clones.
        inserted: Range<usize>,
        /// Number of instructions removed (non-zero only for `Replace`).
        removed: usize,
        /// First index after both the match and the inserted clones.
        resume_at: usize,
    },
    NotFound,
}

impl PatchOutcome {
    pub fn matched(&self) -> bool {
        matches!(self, PatchOutcome::Applied { .. })
    }

    /// Where a follow-up scan should begin to reach the next occurrence.
    pub fn resume_at(&self) -> Option<usize> {
        match self {
            PatchOutcome::Applied { resume_at, .. } => Some(*resume_at),
            PatchOutcome::NotFound => None,
        }
    }
}

/// Applies a [`PatchSpec`] at the first match of its target.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequencePatcher<'a> {
    reporter: DiagnosticsReporter,
    context: Option<&'a Context>,
}

impl<'a> SequencePatcher<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.reporter = DiagnosticsReporter::new(verbose);
        self
    }

    pub fn context(mut self, context: &'a Context) -> Self {
        self.context = Some(context);
        self
    }

    /// Rewrite the first occurrence of `spec.target`.
    ///
    /// On a miss the stream is left untouched and a not-found diagnostic is
    /// logged; this is not an error.
    pub fn apply(&self, stream: &mut InstructionStream, spec: &PatchSpec) -> PatchOutcome {
        self.apply_from(stream, spec, 0)
    }

    /// Like [`apply`](Self::apply), ignoring matches that start before `start`.
    pub fn apply_from(
        &self,
        stream: &mut InstructionStream,
        spec: &PatchSpec,
        start: usize,
    ) -> PatchOutcome {
        let outcome = self.rewrite_first(stream, spec, start);
        if !outcome.matched() {
            self.reporter.not_found(Operation::Patch, self.context);
        }
        outcome
    }

    /// Rewrite every non-overlapping occurrence, left to right.
    ///
    /// Inserted instructions are never re-scanned, so a patch containing its
    /// own target cannot loop.
    pub fn apply_all(&self, stream: &mut InstructionStream, spec: &PatchSpec) -> Vec<PatchOutcome> {
        let mut outcomes = Vec::new();
        let mut from = 0;
        loop {
            let outcome = self.rewrite_first(stream, spec, from);
            match outcome.resume_at() {
                Some(next) => {
                    from = next;
                    outcomes.push(outcome);
                }
                None => break,
            }
        }
        if outcomes.is_empty() {
            self.reporter.not_found(Operation::Patch, self.context);
        }
        outcomes
    }

    fn rewrite_first(
        &self,
        stream: &mut InstructionStream,
        spec: &PatchSpec,
        start: usize,
    ) -> PatchOutcome {
        let found = SequenceMatcher::new(stream.as_slice())
            .check_mode(spec.check)
            .verbose(self.reporter.is_verbose())
            .scan(&spec.target, start);
        let Some(i) = found else {
            return PatchOutcome::NotFound;
        };

        let target_len = spec.target.len();
        let patch_len = spec.patch.len();

        let (at, removed) = match spec.mode {
            PatchMode::Before => {
                stream.insert_range(i, spec.patch.instantiate());
                (i, 0)
            }
            PatchMode::After => {
                stream.insert_range(i + target_len, spec.patch.instantiate());
                (i + target_len, 0)
            }
            PatchMode::Replace => {
                stream.splice(i..i + target_len, spec.patch.instantiate());
                (i, target_len)
            }
        };

        let resume_at = match spec.mode {
            PatchMode::Before | PatchMode::After => i + target_len + patch_len,
            PatchMode::Replace => i + patch_len,
        };

        PatchOutcome::Applied {
            matched_at: i,
            inserted: at..at + patch_len,
            removed,
            resume_at,
        }
    }
}

/// Owned form: rewrite the first match and hand the stream back with a
/// matched flag.
pub fn patch_by_sequence(mut stream: InstructionStream, spec: &PatchSpec) -> (InstructionStream, bool) {
    let outcome = SequencePatcher::new().apply(&mut stream, spec);
    (stream, outcome.matched())
}
