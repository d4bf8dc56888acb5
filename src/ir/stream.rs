use crate::ir::instruction::Instruction;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::ops::{Deref, Range};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Ordered, index-addressable sequence of instructions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstructionStream {
    instructions: Vec<Instruction>,
}

impl InstructionStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Instruction> {
        self.instructions.get_mut(index)
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Insert `items` so that the first lands at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert_range<I>(&mut self, index: usize, items: I)
    where
        I: IntoIterator<Item = Instruction>,
    {
        self.instructions.splice(index..index, items);
    }

    /// Remove and return the instructions in `range`.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds.
    pub fn remove_range(&mut self, range: Range<usize>) -> Vec<Instruction> {
        self.instructions.drain(range).collect()
    }

    /// Replace `range` with `items`, returning the removed instructions.
    pub fn splice<I>(&mut self, range: Range<usize>, items: I) -> Vec<Instruction>
    where
        I: IntoIterator<Item = Instruction>,
    {
        self.instructions.splice(range, items).collect()
    }

    pub fn into_vec(self) -> Vec<Instruction> {
        self.instructions
    }

    /// Listing with one instruction per line, prefixed by its index.
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for (index, instruction) in self.instructions.iter().enumerate() {
            out.push_str(&format!("IL_{index:04}: {instruction}\n"));
        }
        out
    }
}

impl Deref for InstructionStream {
    type Target = [Instruction];

    fn deref(&self) -> &Self::Target {
        &self.instructions
    }
}

impl From<Vec<Instruction>> for InstructionStream {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }
}

impl FromIterator<Instruction> for InstructionStream {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Self {
            instructions: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for InstructionStream {
    type Item = Instruction;
    type IntoIter = std::vec::IntoIter<Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.into_iter()
    }
}

impl<'a> IntoIterator for &'a InstructionStream {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

#[derive(Error, Debug)]
pub enum StreamFileError {
    #[error("failed to access stream file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed stream file {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// A decoded method body as exchanged with the host's decoder and encoder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodBody {
    pub method: String,
    pub instructions: InstructionStream,
}

impl MethodBody {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StreamFileError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| StreamFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| StreamFileError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the body as pretty JSON, atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StreamFileError> {
        let path = path.as_ref();
        let json = serde_json::to_vec_pretty(self).map_err(|source| StreamFileError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        atomic_write(path, &json).map_err(|source| StreamFileError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// tempfile in the same directory + fsync + rename.
fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
