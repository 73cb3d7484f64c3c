//! Binary header codecs for TapeVault.
//!
//! The wire headers are interchange structures shared with the backup
//! protocol; the index entries are the storage-side augmented headers
//! persisted by a volume. Layout compatibility is mandatory, so every
//! struct here carries an explicit encoded size and byte-exact
//! encode/decode routines. Validation beyond length checks lives in
//! the callers, which know the surrounding context.

pub mod index;
pub mod wire;

pub use index::{BlockEntry, DataLocation, RecordEntry};
pub use wire::{WireBlockHeader, WireRecordHeader};
