//! Error types for TapeVault.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using VaultError.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Errors that can occur in TapeVault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Malformed input (fatal for the current scatter/gather call)
    #[error("Block of {size} bytes exceeds the 32-bit size limit")]
    BlockTooLarge { size: usize },

    #[error("Block of {size} bytes is too small to hold a block header")]
    BlockTooSmall { size: usize },

    #[error("Incomplete block: {given} bytes given, {needed} bytes declared")]
    IncompleteBlock { given: usize, needed: u32 },

    #[error("Record header at offset {offset} does not fit in its block")]
    MalformedRecord { offset: usize },

    #[error("Output buffer too small: block needs {needed} bytes, capacity is {capacity}")]
    BufferTooSmall { needed: u32, capacity: usize },

    // Protocol violations (rejected immediately, no state mutated)
    #[error("Block {block_number} does not exist")]
    BlockNotFound { block_number: u64 },

    #[error("Write at block {position} rejected: volume ends at block {size}")]
    NotAtEnd { position: u64, size: u64 },

    #[error("No volume is open")]
    NoOpenVolume,

    #[error("A volume is already open")]
    VolumeAlreadyOpen,

    #[error("Handle {handle} is not the active device handle")]
    StaleHandle { handle: u64 },

    #[error("Illegal mode given to open the device")]
    InvalidOpenMode,

    // Configuration errors (fatal at open time)
    #[error("No device options specified, cannot continue")]
    MissingOptions,

    #[error("Invalid device option: {name} = {value}")]
    InvalidOption { name: String, value: String },

    // Storage failures propagated from the volume
    #[error("Volume corrupted: {reason}")]
    VolumeCorrupted { reason: String },

    // Filesystem failures during secure truncate
    #[error("Unexpected directory inside volume: {path}")]
    NestedDirectory { path: PathBuf },

    // Operations the device does not support
    #[error("Operation not supported: {op}")]
    Unsupported { op: &'static str },
}
