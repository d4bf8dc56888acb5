use crate::ir::Instruction;
use crate::seq::errors::SequenceError;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// A validated, non-empty instruction sequence.
///
/// Used both as a match key (target) and as a template whose elements are
/// cloned into a stream (patch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Instruction>", into = "Vec<Instruction>")]
pub struct Pattern {
    instructions: Vec<Instruction>,
}

impl Pattern {
    pub fn new(instructions: impl Into<Vec<Instruction>>) -> Result<Self, SequenceError> {
        let instructions = instructions.into();
        if instructions.is_empty() {
            return Err(SequenceError::MalformedPattern {
                message: "pattern must contain at least one instruction".to_string(),
            });
        }
        Ok(Self { instructions })
    }

    pub fn as_slice(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Fresh deep copies of every instruction, in order.
    pub fn instantiate(&self) -> impl Iterator<Item = Instruction> + '_ {
        self.instructions.iter().cloned()
    }
}

impl Deref for Pattern {
    type Target = [Instruction];

    fn deref(&self) -> &Self::Target {
        &self.instructions
    }
}

impl TryFrom<Vec<Instruction>> for Pattern {
    type Error = SequenceError;

    fn try_from(instructions: Vec<Instruction>) -> Result<Self, Self::Error> {
        Pattern::new(instructions)
    }
}

impl From<Pattern> for Vec<Instruction> {
    fn from(pattern: Pattern) -> Self {
        pattern.instructions
    }
}
