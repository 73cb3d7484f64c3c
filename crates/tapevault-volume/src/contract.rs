//! The storage contract the device core requires from a volume.

use std::path::Path;
use tapevault_codec::{BlockEntry, DataLocation, RecordEntry, WireBlockHeader, WireRecordHeader};
use tapevault_common::{Result, VaultError};

/// Access mode requested when opening a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Create the volume if missing, then open read-write.
    CreateReadWrite,
    /// Open an existing volume read-write.
    ReadWrite,
    /// Open an existing volume read-only.
    ReadOnly,
    /// Open an existing volume write-only.
    WriteOnly,
}

impl OpenMode {
    /// Converts a raw mode value from the device lifecycle collaborator.
    ///
    /// Anything outside the four recognized modes is a fatal
    /// configuration error.
    pub fn from_raw(raw: i32) -> Result<Self> {
        match raw {
            0 => Ok(OpenMode::CreateReadWrite),
            1 => Ok(OpenMode::ReadWrite),
            2 => Ok(OpenMode::ReadOnly),
            3 => Ok(OpenMode::WriteOnly),
            _ => Err(VaultError::InvalidOpenMode),
        }
    }
}

/// Append/read surface of the underlying dedup storage engine.
///
/// Block numbers are dense and monotonically assigned starting at 0;
/// `size` doubles as the next writable block number. All appends are
/// durable once their call returns `Ok` and `flush` has succeeded.
pub trait Volume {
    /// Durably stores one payload fragment and reports where it landed.
    fn append_data(
        &mut self,
        block: &WireBlockHeader,
        record: &WireRecordHeader,
        payload: &[u8],
    ) -> Result<DataLocation>;

    /// Durably stores a contiguous run of record entries as one index
    /// transaction; returns the starting offset of the run.
    fn append_records(&mut self, entries: &[RecordEntry]) -> Result<u64>;

    /// Durably commits one block entry, advancing the volume's size by
    /// exactly one block.
    fn append_block(&mut self, entry: &BlockEntry) -> Result<()>;

    /// Random-access read of one committed block's entry.
    fn read_block(&self, block_number: u64) -> Result<BlockEntry>;

    /// Reads `count` record entries beginning at `start`. The caller
    /// guarantees the range was previously committed.
    fn read_records(&self, start: u64, count: u32) -> Result<Vec<RecordEntry>>;

    /// Copies a previously stored payload fragment into `dest`.
    fn read_data(&self, file_index: u32, start: u64, len: u64, dest: &mut [u8]) -> Result<()>;

    /// Number of committed blocks.
    fn size(&self) -> u64;

    /// Truncates the volume to empty, discarding every committed
    /// block, record, and payload fragment.
    fn reset(&mut self) -> Result<()>;

    /// Forces durability of everything written so far.
    fn flush(&mut self) -> Result<()>;

    /// True if the volume opened successfully and has no unrecoverable
    /// internal error.
    fn is_ok(&self) -> bool;

    /// Storage path identity, used for volume re-creation.
    fn path(&self) -> &Path;

    /// Permission bits the volume was created with, used for volume
    /// re-creation.
    fn permissions(&self) -> u32;
}

/// Factory handing out volumes at device open and at the rebuild step
/// of a secure truncate.
pub trait VolumeOpener {
    type Vol: Volume;

    fn open_volume(
        &self,
        path: &Path,
        mode: OpenMode,
        permissions: u32,
        block_size: usize,
    ) -> Result<Self::Vol>;
}
