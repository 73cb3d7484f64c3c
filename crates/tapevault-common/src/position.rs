//! Tape-style device position.

use serde::{Deserialize, Serialize};

/// Position of a tape-emulating device, as a (file, block) pair.
///
/// Legacy tape addressing orders positions first by file and then by
/// block within the file. The pair packs into a single 64-bit block
/// number (`file << 32 | block`) and that conversion is bijective, so
/// the derived ordering and the packed ordering agree.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Position {
    /// File number on the emulated medium.
    pub file: u32,
    /// Block number within the file (0-indexed).
    pub block: u32,
}

impl Position {
    /// Beginning of the medium.
    pub const START: Position = Position { file: 0, block: 0 };

    /// Creates a new position.
    pub fn new(file: u32, block: u32) -> Self {
        Self { file, block }
    }

    /// Returns the absolute block number this position addresses.
    pub fn as_block_number(&self) -> u64 {
        ((self.file as u64) << 32) | (self.block as u64)
    }

    /// Recovers a position from an absolute block number.
    pub fn from_block_number(value: u64) -> Self {
        Self {
            file: (value >> 32) as u32,
            block: value as u32,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.file, self.block)
    }
}
