use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum edit distance for which an unknown mnemonic gets a suggestion.
const SUGGESTION_DISTANCE: usize = 2;

macro_rules! opcodes {
    ($($variant:ident => $mnemonic:literal,)+) => {
        /// Closed set of operation kinds an [`Instruction`](crate::ir::Instruction) can carry.
        ///
        /// The set is independent of any concrete bytecode format; decoders map
        /// their native opcodes onto these kinds before handing a stream over.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum Opcode {
            $($variant,)+
        }

        impl Opcode {
            /// Every opcode, in declaration order.
            pub const ALL: &'static [Opcode] = &[$(Opcode::$variant,)+];

            /// Textual mnemonic used in listings and patch files.
            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $mnemonic,)+
                }
            }
        }
    };
}

opcodes! {
    Nop => "nop",
    LoadArg => "ldarg",
    StoreArg => "starg",
    LoadLocal => "ldloc",
    StoreLocal => "stloc",
    LoadConst => "ldc",
    LoadString => "ldstr",
    LoadNull => "ldnull",
    LoadField => "ldfld",
    StoreField => "stfld",
    LoadStaticField => "ldsfld",
    StoreStaticField => "stsfld",
    Call => "call",
    CallVirtual => "callvirt",
    NewObject => "newobj",
    Branch => "br",
    BranchTrue => "brtrue",
    BranchFalse => "brfalse",
    BranchEqual => "beq",
    BranchNotEqual => "bne",
    CompareEqual => "ceq",
    CompareLess => "clt",
    CompareGreater => "cgt",
    Add => "add",
    Sub => "sub",
    Mul => "mul",
    Div => "div",
    Pop => "pop",
    Dup => "dup",
    Box => "box",
    Unbox => "unbox",
    CastClass => "castclass",
    IsInstance => "isinst",
    Throw => "throw",
    Leave => "leave",
    EndFinally => "endfinally",
    Return => "ret",
}

impl Opcode {
    /// Closest known mnemonic to `input`, if any is close enough to be a typo.
    pub fn suggest(input: &str) -> Option<Opcode> {
        let input = input.to_ascii_lowercase();
        Opcode::ALL
            .iter()
            .map(|op| (*op, strsim::levenshtein(&input, op.mnemonic())))
            .filter(|(_, distance)| *distance <= SUGGESTION_DISTANCE)
            .min_by_key(|(_, distance)| *distance)
            .map(|(op, _)| op)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// An unrecognized mnemonic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOpcode {
    pub mnemonic: String,
    pub suggestion: Option<Opcode>,
}

impl fmt::Display for UnknownOpcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown opcode '{}'", self.mnemonic)?;
        if let Some(op) = self.suggestion {
            write!(f, " (did you mean '{op}'?)")?;
        }
        Ok(())
    }
}

impl std::error::Error for UnknownOpcode {}

impl FromStr for Opcode {
    type Err = UnknownOpcode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Opcode::ALL
            .iter()
            .copied()
            .find(|op| op.mnemonic().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownOpcode {
                mnemonic: trimmed.to_string(),
                suggestion: Opcode::suggest(trimmed),
            })
    }
}

impl TryFrom<String> for Opcode {
    type Error = UnknownOpcode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Opcode> for String {
    fn from(op: Opcode) -> Self {
        op.mnemonic().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonics_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for op in Opcode::ALL {
            assert!(seen.insert(op.mnemonic()), "duplicate mnemonic {op}");
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("LDSTR".parse::<Opcode>().unwrap(), Opcode::LoadString);
        assert_eq!(" callvirt ".parse::<Opcode>().unwrap(), Opcode::CallVirtual);
    }

    #[test]
    fn unknown_mnemonic_suggests_closest() {
        let err = "calvirt".parse::<Opcode>().unwrap_err();
        assert_eq!(err.suggestion, Some(Opcode::CallVirtual));
        assert!(err.to_string().contains("did you mean 'callvirt'"));
    }

    #[test]
    fn unknown_mnemonic_without_suggestion() {
        let err = "frobnicate".parse::<Opcode>().unwrap_err();
        assert_eq!(err.suggestion, None);
    }

    #[test]
    fn serde_uses_mnemonic() {
        let json = serde_json::to_string(&Opcode::BranchTrue).unwrap();
        assert_eq!(json, "\"brtrue\"");
        let back: Opcode = serde_json::from_str("\"brtrue\"").unwrap();
        assert_eq!(back, Opcode::BranchTrue);
    }
}
