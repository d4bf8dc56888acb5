use crate::ir::opcode::Opcode;
use crate::ir::operand::{Label, Operand, TypeRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Boundary kind of an exception region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    TryBegin,
    TryEnd,
    CatchBegin,
    FilterBegin,
    FinallyBegin,
    FinallyEnd,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BlockKind::TryBegin => "try-begin",
            BlockKind::TryEnd => "try-end",
            BlockKind::CatchBegin => "catch-begin",
            BlockKind::FilterBegin => "filter-begin",
            BlockKind::FinallyBegin => "finally-begin",
            BlockKind::FinallyEnd => "finally-end",
        };
        f.write_str(s)
    }
}

/// Exception-region descriptor associated with an instruction position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExceptionBlock {
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catch_type: Option<TypeRef>,
}

impl ExceptionBlock {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            catch_type: None,
        }
    }

    pub fn catching(ty: TypeRef) -> Self {
        Self {
            kind: BlockKind::CatchBegin,
            catch_type: Some(ty),
        }
    }
}

impl fmt::Display for ExceptionBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.catch_type {
            Some(ty) => write!(f, "{}({})", self.kind, ty),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// A single decoded instruction.
///
/// Labels and exception blocks are owned per instruction, so `clone()` is a
/// full deep copy: editing a clone's labels or blocks never shows through the
/// original or any sibling clone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    #[serde(default, skip_serializing_if = "Operand::is_absent")]
    pub operand: Operand,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub labels: BTreeSet<Label>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<ExceptionBlock>,
}

impl Instruction {
    /// Instruction with an absent operand.
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            operand: Operand::None,
            labels: BTreeSet::new(),
            blocks: Vec::new(),
        }
    }

    pub fn with_operand(opcode: Opcode, operand: impl Into<Operand>) -> Self {
        Self {
            operand: operand.into(),
            ..Self::new(opcode)
        }
    }

    pub fn labeled(mut self, label: Label) -> Self {
        self.labels.insert(label);
        self
    }

    pub fn in_block(mut self, block: ExceptionBlock) -> Self {
        self.blocks.push(block);
        self
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        if !self.operand.is_absent() {
            write!(f, " {}", self.operand)?;
        }
        if !self.labels.is_empty() {
            let labels: Vec<String> = self.labels.iter().map(Label::to_string).collect();
            write!(f, " [{}]", labels.join(", "))?;
        }
        for block in &self.blocks {
            write!(f, " {{{block}}}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_owns_labels_and_blocks() {
        let template = Instruction::new(Opcode::Nop)
            .labeled(Label(1))
            .in_block(ExceptionBlock::new(BlockKind::TryBegin));

        let mut copy = template.clone();
        copy.labels.insert(Label(2));
        copy.blocks[0].kind = BlockKind::FinallyBegin;
        copy.blocks.push(ExceptionBlock::new(BlockKind::TryEnd));

        assert_eq!(template.labels.len(), 1);
        assert_eq!(template.blocks, vec![ExceptionBlock::new(BlockKind::TryBegin)]);
    }

    #[test]
    fn listing_format() {
        let ins = Instruction::with_operand(Opcode::LoadString, "hello")
            .labeled(Label(3))
            .in_block(ExceptionBlock::catching(TypeRef::new("System.Exception")));
        assert_eq!(
            ins.to_string(),
            "ldstr \"hello\" [L3] {catch-begin(System.Exception)}"
        );
        assert_eq!(Instruction::new(Opcode::Return).to_string(), "ret");
    }

    #[test]
    fn deserialize_minimal_instruction() {
        let ins: Instruction = serde_json::from_str(r#"{"opcode":"pop"}"#).unwrap();
        assert_eq!(ins, Instruction::new(Opcode::Pop));
    }

    #[test]
    fn deserialize_full_instruction() {
        let ins: Instruction = serde_json::from_str(
            r#"{"opcode":"leave","operand":{"label":9},"labels":[2],"blocks":[{"kind":"try-end"}]}"#,
        )
        .unwrap();
        assert_eq!(ins.operand, Operand::Label(Label(9)));
        assert!(ins.labels.contains(&Label(2)));
        assert_eq!(ins.blocks[0].kind, BlockKind::TryEnd);
    }
}
