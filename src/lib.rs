//! seqpatch: transpiler-style rewriting of instruction streams
//!
//! Locates a short target sequence inside a decoded method body and inserts
//! or replaces instructions at that location. Decoding and re-encoding of a
//! concrete bytecode format is left to the host; this crate works on the
//! format-neutral [`ir`] model.
//!
//! # Architecture
//!
//! - [`seq::SequenceMatcher`] finds the leftmost window matching a
//!   [`seq::Pattern`] under a [`seq::CheckMode`].
//! - [`seq::SequencePatcher`] rewrites the first match with fresh clones of
//!   the patch template, so labels and exception blocks are never shared.
//! - [`config`] loads TOML patch sets and applies them per method.
//! - [`session::PatchSession`] owns the load-once lifecycle.
//!
//! A missing target is an expected outcome, reported at info level through
//! [`diagnostics`], never a panic or hard error.
//!
//! # Example
//!
//! ```
//! use seqpatch::ir::{Instruction, InstructionStream, Opcode};
//! use seqpatch::seq::{patch_by_sequence, PatchMode, PatchSpec, Pattern};
//!
//! let stream: InstructionStream = vec![
//!     Instruction::new(Opcode::LoadArg),
//!     Instruction::new(Opcode::Call),
//!     Instruction::new(Opcode::Pop),
//!     Instruction::new(Opcode::Return),
//! ]
//! .into();
//!
//! let spec = PatchSpec::new(
//!     Pattern::new(vec![Instruction::new(Opcode::Call), Instruction::new(Opcode::Pop)]).unwrap(),
//!     Pattern::new(vec![Instruction::new(Opcode::Nop)]).unwrap(),
//!     PatchMode::Replace,
//! );
//!
//! let (patched, matched) = patch_by_sequence(stream, &spec);
//! assert!(matched);
//! assert_eq!(patched.len(), 3);
//! ```

pub mod config;
pub mod diagnostics;
pub mod ir;
pub mod logging;
pub mod seq;
pub mod session;

// Re-exports
pub use config::{
    apply_patches, check_patches, load_from_path, load_from_str, ApplicationError, ConfigError,
    PatchConfig, PatchResult, VersionError,
};
pub use diagnostics::{log_sequence, Context, DiagnosticsReporter};
pub use ir::{Instruction, InstructionStream, Opcode, Operand};
pub use seq::{
    find_sequence, find_sequence_end, patch_by_sequence, CheckMode, PatchMode, PatchOutcome,
    PatchSpec, Pattern, SequenceError, SequenceMatcher, SequencePatcher,
};
pub use session::{PatchSession, SessionError, SessionState, SessionStats};
