//! Sequence matching and rewriting over instruction streams.
//!
//! [`SequenceMatcher`] locates the leftmost occurrence of a [`Pattern`];
//! [`SequencePatcher`] inserts or replaces instructions at that occurrence
//! using fresh clones of the patch template.

pub mod errors;
pub mod matcher;
pub mod patcher;
pub mod pattern;

pub use errors::SequenceError;
pub use matcher::{
    find_sequence, find_sequence_end, instruction_matches, CheckMode, SequenceMatcher,
};
pub use patcher::{patch_by_sequence, PatchMode, PatchOutcome, PatchSpec, SequencePatcher};
pub use pattern::Pattern;
