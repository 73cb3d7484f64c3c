//! In-memory fake volume for tests.

use crate::contract::{OpenMode, Volume, VolumeOpener};
use std::path::{Path, PathBuf};
use tapevault_codec::{BlockEntry, DataLocation, RecordEntry, WireBlockHeader, WireRecordHeader};
use tapevault_common::{Result, VaultError};

/// Vec-backed volume with failure-injection switches.
///
/// Used by the device and framing tests to exercise the
/// storage-failure paths without touching the filesystem.
#[derive(Debug, Default)]
pub struct MemVolume {
    path: PathBuf,
    permissions: u32,
    data: Vec<u8>,
    records: Vec<RecordEntry>,
    blocks: Vec<BlockEntry>,

    pub fail_append_data: bool,
    pub fail_append_records: bool,
    pub fail_append_block: bool,
    pub fail_read_data: bool,
    pub unhealthy: bool,
}

impl MemVolume {
    /// Creates an empty in-memory volume.
    pub fn new(path: impl Into<PathBuf>, permissions: u32) -> Self {
        Self {
            path: path.into(),
            permissions,
            ..Default::default()
        }
    }

    /// Number of payload bytes stored so far.
    pub fn data_len(&self) -> usize {
        self.data.len()
    }

    /// Number of record entries stored so far.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

impl Volume for MemVolume {
    fn append_data(
        &mut self,
        _block: &WireBlockHeader,
        _record: &WireRecordHeader,
        payload: &[u8],
    ) -> Result<DataLocation> {
        if self.fail_append_data {
            return Err(VaultError::VolumeCorrupted {
                reason: "injected append_data failure".to_string(),
            });
        }

        let start = self.data.len() as u64;
        self.data.extend_from_slice(payload);
        Ok(DataLocation {
            start,
            file_index: 0,
        })
    }

    fn append_records(&mut self, entries: &[RecordEntry]) -> Result<u64> {
        if self.fail_append_records {
            return Err(VaultError::VolumeCorrupted {
                reason: "injected append_records failure".to_string(),
            });
        }

        let start = self.records.len() as u64;
        self.records.extend_from_slice(entries);
        Ok(start)
    }

    fn append_block(&mut self, entry: &BlockEntry) -> Result<()> {
        if self.fail_append_block {
            return Err(VaultError::VolumeCorrupted {
                reason: "injected append_block failure".to_string(),
            });
        }

        self.blocks.push(*entry);
        Ok(())
    }

    fn read_block(&self, block_number: u64) -> Result<BlockEntry> {
        self.blocks
            .get(block_number as usize)
            .copied()
            .ok_or(VaultError::BlockNotFound { block_number })
    }

    fn read_records(&self, start: u64, count: u32) -> Result<Vec<RecordEntry>> {
        let start = start as usize;
        let end = start + count as usize;
        if end > self.records.len() {
            return Err(VaultError::VolumeCorrupted {
                reason: format!(
                    "record range {}..{} outside committed {} entries",
                    start,
                    end,
                    self.records.len()
                ),
            });
        }
        Ok(self.records[start..end].to_vec())
    }

    fn read_data(&self, file_index: u32, start: u64, len: u64, dest: &mut [u8]) -> Result<()> {
        if self.fail_read_data {
            return Err(VaultError::VolumeCorrupted {
                reason: "injected read_data failure".to_string(),
            });
        }

        if file_index != 0 {
            return Err(VaultError::VolumeCorrupted {
                reason: format!("unknown payload segment {}", file_index),
            });
        }

        let start = start as usize;
        let len = len as usize;
        if start + len > self.data.len() || len > dest.len() {
            return Err(VaultError::VolumeCorrupted {
                reason: format!("data range {}+{} out of bounds", start, len),
            });
        }

        dest[..len].copy_from_slice(&self.data[start..start + len]);
        Ok(())
    }

    fn size(&self) -> u64 {
        self.blocks.len() as u64
    }

    fn reset(&mut self) -> Result<()> {
        self.data.clear();
        self.records.clear();
        self.blocks.clear();
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_ok(&self) -> bool {
        !self.unhealthy
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn permissions(&self) -> u32 {
        self.permissions
    }
}

/// Opener that always hands out a fresh empty in-memory volume.
#[derive(Debug, Default)]
pub struct MemVolumeOpener;

impl VolumeOpener for MemVolumeOpener {
    type Vol = MemVolume;

    fn open_volume(
        &self,
        path: &Path,
        _mode: OpenMode,
        permissions: u32,
        _block_size: usize,
    ) -> Result<MemVolume> {
        Ok(MemVolume::new(path, permissions))
    }
}
