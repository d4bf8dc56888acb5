use crate::diagnostics::{Context, DiagnosticsReporter, Operation};
use crate::ir::{Instruction, Operand};
use crate::seq::errors::SequenceError;
use crate::seq::pattern::Pattern;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How operands take part in matching. Opcodes must always be equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum CheckMode {
    /// An absent target operand only matches an absent operand; a present one
    /// must be equal.
    #[default]
    Always,
    /// An absent target operand is a wildcard; a present one must be equal.
    NonNull,
    /// Operands are ignored.
    Never,
}

impl CheckMode {
    pub fn operands_match(self, target: &Operand, candidate: &Operand) -> bool {
        match self {
            CheckMode::Never => true,
            CheckMode::NonNull if target.is_absent() => true,
            CheckMode::NonNull | CheckMode::Always => target.matches(candidate),
        }
    }
}

impl fmt::Display for CheckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CheckMode::Always => "always",
            CheckMode::NonNull => "non_null",
            CheckMode::Never => "never",
        };
        f.write_str(s)
    }
}

impl FromStr for CheckMode {
    type Err = SequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(CheckMode::Always),
            "non_null" | "nonnull" => Ok(CheckMode::NonNull),
            "never" => Ok(CheckMode::Never),
            _ => Err(SequenceError::InvalidArgument {
                argument: "check_mode",
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for CheckMode {
    type Error = SequenceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Whether `candidate` satisfies the `target` template under `check`.
pub fn instruction_matches(check: CheckMode, target: &Instruction, candidate: &Instruction) -> bool {
    target.opcode == candidate.opcode && check.operands_match(&target.operand, &candidate.operand)
}

/// Leftmost-first sequence search over a borrowed stream.
///
/// Only the first matching window is ever reported; later windows are not
/// considered once one matches.
pub struct SequenceMatcher<'a> {
    haystack: &'a [Instruction],
    check: CheckMode,
    reporter: DiagnosticsReporter,
    context: Option<&'a Context>,
}

impl<'a> SequenceMatcher<'a> {
    pub fn new(haystack: &'a [Instruction]) -> Self {
        Self {
            haystack,
            check: CheckMode::default(),
            reporter: DiagnosticsReporter::default(),
            context: None,
        }
    }

    pub fn check_mode(mut self, check: CheckMode) -> Self {
        self.check = check;
        self
    }

    /// Log each element of a confirmed match with its position.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.reporter = DiagnosticsReporter::new(verbose);
        self
    }

    pub fn context(mut self, context: &'a Context) -> Self {
        self.context = Some(context);
        self
    }

    /// Start index of the first match, or `None` (reported at info level).
    pub fn find(&self, target: &Pattern) -> Option<usize> {
        self.find_from(target, 0)
    }

    /// Like [`find`](Self::find), ignoring windows that start before `start`.
    pub fn find_from(&self, target: &Pattern, start: usize) -> Option<usize> {
        let found = self.scan(target, start);
        if found.is_none() {
            self.reporter.not_found(Operation::Find, self.context);
        }
        found
    }

    /// Index just past the first match.
    pub fn find_end(&self, target: &Pattern) -> Option<usize> {
        self.find(target).map(|start| start + target.len())
    }

    /// Like [`find`](Self::find) but a miss is an error naming the rule.
    pub fn find_required(&self, target: &Pattern) -> Result<usize, SequenceError> {
        self.find(target).ok_or_else(|| SequenceError::NotFound {
            rule: self.context.map(|ctx| ctx.rule().to_string()),
        })
    }

    /// Start indices of all non-overlapping matches, left to right.
    ///
    /// Does not emit not-found diagnostics.
    pub fn find_all(&self, target: &Pattern) -> Vec<usize> {
        let mut starts = Vec::new();
        let mut from = 0;
        while let Some(start) = self.scan(target, from) {
            starts.push(start);
            from = start + target.len();
        }
        starts
    }

    /// Whether any window matches. Does not emit diagnostics.
    pub fn has_match(&self, target: &Pattern) -> bool {
        self.window_starts(target, 0)
            .any(|i| self.window_matches(target, i))
    }

    pub(crate) fn scan(&self, target: &Pattern, start: usize) -> Option<usize> {
        let found = self
            .window_starts(target, start)
            .find(|&i| self.window_matches(target, i))?;
        self.reporter
            .matched_window(found, target.iter().map(|ins| ins.opcode));
        Some(found)
    }

    fn window_starts(&self, target: &Pattern, start: usize) -> std::ops::Range<usize> {
        match self.haystack.len().checked_sub(target.len()) {
            Some(last) if start <= last => start..last + 1,
            _ => 0..0,
        }
    }

    fn window_matches(&self, target: &Pattern, start: usize) -> bool {
        self.haystack[start..start + target.len()]
            .iter()
            .zip(target.iter())
            .all(|(candidate, expected)| instruction_matches(self.check, expected, candidate))
    }
}

/// Start index of the first match of `target` in `haystack`.
pub fn find_sequence(haystack: &[Instruction], target: &Pattern, check: CheckMode) -> Option<usize> {
    SequenceMatcher::new(haystack).check_mode(check).find(target)
}

/// Index just past the first match of `target` in `haystack`.
pub fn find_sequence_end(
    haystack: &[Instruction],
    target: &Pattern,
    check: CheckMode,
) -> Option<usize> {
    SequenceMatcher::new(haystack)
        .check_mode(check)
        .find_end(target)
}
