//! Format-neutral instruction model.
//!
//! Decoders for a concrete virtual machine translate their bytecode into
//! [`Instruction`] values; everything else in the crate works on these types.

pub mod instruction;
pub mod opcode;
pub mod operand;
pub mod stream;

pub use instruction::{BlockKind, ExceptionBlock, Instruction};
pub use opcode::{Opcode, UnknownOpcode};
pub use operand::{Label, MemberRef, Operand, OperandEquality, TypeRef};
pub use stream::{InstructionStream, MethodBody, StreamFileError};
