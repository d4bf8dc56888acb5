use serde::{Deserialize, Serialize};
use std::fmt;

/// Branch-target marker attached to an instruction position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// Reference to a type by its fully qualified name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRef(pub String);

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference to a method or field resolved by the host.
///
/// `handle` is the host's identity for the member; `name` is only carried for
/// listings and never takes part in matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberRef {
    pub handle: u32,
    #[serde(default)]
    pub name: String,
}

impl MemberRef {
    pub fn new(handle: u32, name: impl Into<String>) -> Self {
        Self {
            handle,
            name: name.into(),
        }
    }
}

/// How two operands of the same kind are compared when matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandEquality {
    /// Full payload equality.
    Value,
    /// Host identity only (no meaningful value equality exists).
    Identity,
}

/// Payload attached to an instruction.
///
/// `None` is a real value: it is the wildcard in patterns matched with
/// [`CheckMode::NonNull`](crate::seq::CheckMode::NonNull), and only matches
/// another `None` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    #[default]
    None,
    Int(i64),
    Str(String),
    Type(TypeRef),
    Label(Label),
    Member(MemberRef),
}

impl Operand {
    pub fn is_absent(&self) -> bool {
        matches!(self, Operand::None)
    }

    /// Kind name used in listings and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Operand::None => "none",
            Operand::Int(_) => "int",
            Operand::Str(_) => "str",
            Operand::Type(_) => "type",
            Operand::Label(_) => "label",
            Operand::Member(_) => "member",
        }
    }

    /// Equality policy for this operand's kind.
    pub fn equality(&self) -> OperandEquality {
        match self {
            Operand::Member(_) => OperandEquality::Identity,
            _ => OperandEquality::Value,
        }
    }

    /// Host identity of an operand, for kinds compared by identity.
    fn identity(&self) -> Option<u32> {
        match self {
            Operand::Member(member) => Some(member.handle),
            _ => None,
        }
    }

    /// Compare two operands under the kind's equality policy.
    ///
    /// Operands of different kinds never match.
    pub fn matches(&self, other: &Operand) -> bool {
        if self.kind() != other.kind() {
            return false;
        }
        match self.equality() {
            OperandEquality::Identity => match (self.identity(), other.identity()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            OperandEquality::Value => self == other,
        }
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Self {
        Operand::Int(value)
    }
}

impl From<&str> for Operand {
    fn from(value: &str) -> Self {
        Operand::Str(value.to_string())
    }
}

impl From<Label> for Operand {
    fn from(label: Label) -> Self {
        Operand::Label(label)
    }
}

impl From<TypeRef> for Operand {
    fn from(ty: TypeRef) -> Self {
        Operand::Type(ty)
    }
}

impl From<MemberRef> for Operand {
    fn from(member: MemberRef) -> Self {
        Operand::Member(member)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::None => Ok(()),
            Operand::Int(v) => write!(f, "{v}"),
            Operand::Str(s) => write!(f, "{s:?}"),
            Operand::Type(t) => write!(f, "{t}"),
            Operand::Label(l) => write!(f, "{l}"),
            Operand::Member(m) if m.name.is_empty() => write!(f, "#{:08X}", m.handle),
            Operand::Member(m) => write!(f, "{}", m.name),
        }
    }
}
