//! Directory-backed stub volume.
//!
//! A volume is a flat directory holding two index files and one or
//! more payload segment files:
//!
//! - `blocks.idx`: fixed-size `BlockEntry` records, one per committed
//!   block; its length defines the volume size
//! - `records.idx`: fixed-size `RecordEntry` records
//! - `data_NNNN.dat`: payload fragments, rotated at a configurable
//!   segment size; the segment number is the `file_index` reported to
//!   callers
//!
//! This stub honors the append/read contract without any
//! content-addressing; a real dedup engine would slot in behind the
//! same trait.

use crate::contract::{OpenMode, Volume, VolumeOpener};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tapevault_codec::{BlockEntry, DataLocation, RecordEntry, WireBlockHeader, WireRecordHeader};
use tapevault_common::{Result, VaultError};

/// Configuration for directory-backed volumes.
#[derive(Debug, Clone)]
pub struct DirVolumeConfig {
    /// Enable fsync after appends.
    pub fsync_enabled: bool,
    /// Maximum payload segment size before rotating to a new data file.
    pub data_segment_size: u64,
}

impl Default for DirVolumeConfig {
    fn default() -> Self {
        Self {
            fsync_enabled: true,
            data_segment_size: 1024 * 1024 * 1024, // 1 GB
        }
    }
}

/// Directory-backed volume.
#[derive(Debug)]
pub struct DirVolume {
    path: PathBuf,
    permissions: u32,
    config: DirVolumeConfig,
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    blocks: File,
    block_count: u64,
    records: File,
    record_count: u64,
    /// Payload segments, indexed by file_index; the last one is active.
    data: Vec<File>,
    active_len: u64,
}

impl DirVolume {
    /// Opens or creates the volume at `path`.
    pub fn open(
        path: &Path,
        mode: OpenMode,
        permissions: u32,
        config: DirVolumeConfig,
    ) -> Result<Self> {
        if mode == OpenMode::CreateReadWrite {
            std::fs::create_dir_all(path)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(path, std::fs::Permissions::from_mode(permissions))?;
            }
        } else if !path.is_dir() {
            return Err(VaultError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("volume directory {} does not exist", path.display()),
            )));
        }

        let blocks = open_index(&path.join("blocks.idx"))?;
        let block_count = index_count(&blocks, BlockEntry::ENCODED_SIZE, "blocks.idx")?;

        let records = open_index(&path.join("records.idx"))?;
        let record_count = index_count(&records, RecordEntry::ENCODED_SIZE, "records.idx")?;

        let mut data = Vec::new();
        loop {
            let segment = path.join(segment_name(data.len() as u32));
            if !segment.is_file() {
                break;
            }
            data.push(open_index(&segment)?);
        }
        if data.is_empty() {
            data.push(open_index(&path.join(segment_name(0)))?);
        }
        let active_len = data.last().unwrap().metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            permissions,
            config,
            inner: Mutex::new(Inner {
                blocks,
                block_count,
                records,
                record_count,
                data,
                active_len,
            }),
        })
    }

    fn segment_path(&self, file_index: u32) -> PathBuf {
        self.path.join(segment_name(file_index))
    }

    fn sync(&self, file: &File) -> Result<()> {
        if self.config.fsync_enabled {
            file.sync_all()?;
        }
        Ok(())
    }
}

fn segment_name(file_index: u32) -> String {
    format!("data_{:04}.dat", file_index)
}

fn open_index(path: &Path) -> Result<File> {
    Ok(OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)?)
}

fn index_count(file: &File, entry_size: usize, name: &str) -> Result<u64> {
    let len = file.metadata()?.len();
    if len % entry_size as u64 != 0 {
        return Err(VaultError::VolumeCorrupted {
            reason: format!("{} length {} is not a multiple of {}", name, len, entry_size),
        });
    }
    Ok(len / entry_size as u64)
}

impl Volume for DirVolume {
    fn append_data(
        &mut self,
        _block: &WireBlockHeader,
        _record: &WireRecordHeader,
        payload: &[u8],
    ) -> Result<DataLocation> {
        let mut inner = self.inner.lock();

        // Rotate to a fresh segment when the active one is full.
        if inner.active_len > 0
            && inner.active_len + payload.len() as u64 > self.config.data_segment_size
        {
            let next = self.segment_path(inner.data.len() as u32);
            inner.data.push(open_index(&next)?);
            inner.active_len = 0;
        }

        let file_index = (inner.data.len() - 1) as u32;
        let start = inner.active_len;

        let active = inner.data.last_mut().unwrap();
        active.seek(SeekFrom::Start(start))?;
        active.write_all(payload)?;
        inner.active_len += payload.len() as u64;
        self.sync(inner.data.last().unwrap())?;

        Ok(DataLocation { start, file_index })
    }

    fn append_records(&mut self, entries: &[RecordEntry]) -> Result<u64> {
        let mut inner = self.inner.lock();
        let start = inner.record_count;

        inner
            .records
            .seek(SeekFrom::Start(start * RecordEntry::ENCODED_SIZE as u64))?;
        for entry in entries {
            inner.records.write_all(&entry.to_bytes())?;
        }
        inner.record_count += entries.len() as u64;
        self.sync(&inner.records)?;

        Ok(start)
    }

    fn append_block(&mut self, entry: &BlockEntry) -> Result<()> {
        let mut inner = self.inner.lock();

        let offset = inner.block_count * BlockEntry::ENCODED_SIZE as u64;
        inner.blocks.seek(SeekFrom::Start(offset))?;
        inner.blocks.write_all(&entry.to_bytes())?;
        inner.block_count += 1;
        self.sync(&inner.blocks)?;

        Ok(())
    }

    fn read_block(&self, block_number: u64) -> Result<BlockEntry> {
        let mut inner = self.inner.lock();
        if block_number >= inner.block_count {
            return Err(VaultError::BlockNotFound { block_number });
        }

        let mut buf = [0u8; BlockEntry::ENCODED_SIZE];
        inner.blocks.seek(SeekFrom::Start(
            block_number * BlockEntry::ENCODED_SIZE as u64,
        ))?;
        inner.blocks.read_exact(&mut buf)?;
        BlockEntry::decode(&buf)
    }

    fn read_records(&self, start: u64, count: u32) -> Result<Vec<RecordEntry>> {
        let mut inner = self.inner.lock();
        if start + count as u64 > inner.record_count {
            return Err(VaultError::VolumeCorrupted {
                reason: format!(
                    "record range {}..{} outside committed {} entries",
                    start,
                    start + count as u64,
                    inner.record_count
                ),
            });
        }

        let mut buf = vec![0u8; count as usize * RecordEntry::ENCODED_SIZE];
        inner
            .records
            .seek(SeekFrom::Start(start * RecordEntry::ENCODED_SIZE as u64))?;
        inner.records.read_exact(&mut buf)?;

        buf.chunks_exact(RecordEntry::ENCODED_SIZE)
            .map(RecordEntry::decode)
            .collect()
    }

    fn read_data(&self, file_index: u32, start: u64, len: u64, dest: &mut [u8]) -> Result<()> {
        let mut inner = self.inner.lock();
        let segment = inner
            .data
            .get_mut(file_index as usize)
            .ok_or_else(|| VaultError::VolumeCorrupted {
                reason: format!("unknown payload segment {}", file_index),
            })?;

        if (len as usize) > dest.len() {
            return Err(VaultError::VolumeCorrupted {
                reason: format!(
                    "fragment of {} bytes does not fit destination of {}",
                    len,
                    dest.len()
                ),
            });
        }

        segment.seek(SeekFrom::Start(start))?;
        segment.read_exact(&mut dest[..len as usize])?;
        Ok(())
    }

    fn size(&self) -> u64 {
        self.inner.lock().block_count
    }

    fn reset(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();

        inner.blocks.set_len(0)?;
        inner.block_count = 0;
        inner.records.set_len(0)?;
        inner.record_count = 0;

        // Drop rotated segments, keep segment 0 truncated.
        while inner.data.len() > 1 {
            inner.data.pop();
            std::fs::remove_file(self.segment_path(inner.data.len() as u32))?;
        }
        inner.data[0].set_len(0)?;
        inner.active_len = 0;

        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.blocks.sync_all()?;
        inner.records.sync_all()?;
        for segment in &inner.data {
            segment.sync_all()?;
        }
        Ok(())
    }

    fn is_ok(&self) -> bool {
        // Construction validates the on-disk layout; later failures
        // surface through Result returns.
        true
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn permissions(&self) -> u32 {
        self.permissions
    }
}

/// Opener for directory-backed volumes.
#[derive(Debug, Clone, Default)]
pub struct DirVolumeOpener {
    pub config: DirVolumeConfig,
}

impl VolumeOpener for DirVolumeOpener {
    type Vol = DirVolume;

    fn open_volume(
        &self,
        path: &Path,
        mode: OpenMode,
        permissions: u32,
        _block_size: usize,
    ) -> Result<DirVolume> {
        DirVolume::open(path, mode, permissions, self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_config() -> DirVolumeConfig {
        DirVolumeConfig {
            fsync_enabled: false,
            data_segment_size: 1024 * 1024 * 1024,
        }
    }

    fn headers() -> (WireBlockHeader, WireRecordHeader) {
        (
            WireBlockHeader {
                block_size: 48,
                magic: *b"TB02",
                ..Default::default()
            },
            WireRecordHeader {
                file_index: 1,
                stream: 2,
                data_size: 16,
            },
        )
    }

    #[test]
    fn test_create_and_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vol1");
        let _vol =
            DirVolume::open(&path, OpenMode::CreateReadWrite, 0o640, test_config()).unwrap();

        assert!(path.join("blocks.idx").is_file());
        assert!(path.join("records.idx").is_file());
        assert!(path.join("data_0000.dat").is_file());
    }

    #[test]
    fn test_open_missing_volume_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent");
        assert!(DirVolume::open(&path, OpenMode::ReadWrite, 0o640, test_config()).is_err());
    }

    #[test]
    fn test_append_and_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vol1");
        let mut vol =
            DirVolume::open(&path, OpenMode::CreateReadWrite, 0o640, test_config()).unwrap();
        let (block, record) = headers();

        let loc = vol.append_data(&block, &record, b"sixteen bytes!!!").unwrap();
        assert_eq!(loc.start, 0);
        assert_eq!(loc.file_index, 0);

        let entry = RecordEntry::new(record, loc, 16);
        let run_start = vol.append_records(&[entry]).unwrap();
        assert_eq!(run_start, 0);

        vol.append_block(&BlockEntry {
            header: block,
            record_start: run_start,
            record_count: 1,
        })
        .unwrap();
        assert_eq!(vol.size(), 1);

        let read_back = vol.read_block(0).unwrap();
        assert_eq!(read_back.header, block);
        assert_eq!(read_back.record_count, 1);

        let records = vol.read_records(0, 1).unwrap();
        assert_eq!(records[0], entry);

        let mut out = [0u8; 16];
        vol.read_data(0, 0, 16, &mut out).unwrap();
        assert_eq!(&out, b"sixteen bytes!!!");
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vol1");
        let (block, record) = headers();

        {
            let mut vol =
                DirVolume::open(&path, OpenMode::CreateReadWrite, 0o640, test_config()).unwrap();
            let loc = vol.append_data(&block, &record, b"persisted payload").unwrap();
            let start = vol
                .append_records(&[RecordEntry::new(record, loc, 17)])
                .unwrap();
            vol.append_block(&BlockEntry {
                header: block,
                record_start: start,
                record_count: 1,
            })
            .unwrap();
            vol.flush().unwrap();
        }

        let vol = DirVolume::open(&path, OpenMode::ReadWrite, 0o640, test_config()).unwrap();
        assert_eq!(vol.size(), 1);

        let entry = vol.read_records(0, 1).unwrap()[0];
        let mut out = vec![0u8; entry.size as usize];
        vol.read_data(entry.file_index, entry.start, entry.size, &mut out)
            .unwrap();
        assert_eq!(&out, b"persisted payload");
    }

    #[test]
    fn test_segment_rotation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vol1");
        let config = DirVolumeConfig {
            fsync_enabled: false,
            data_segment_size: 32,
        };
        let mut vol = DirVolume::open(&path, OpenMode::CreateReadWrite, 0o640, config).unwrap();
        let (block, record) = headers();

        let first = vol.append_data(&block, &record, &[0xAA; 24]).unwrap();
        assert_eq!(first.file_index, 0);

        // 24 + 24 > 32, so this lands in a fresh segment.
        let second = vol.append_data(&block, &record, &[0xBB; 24]).unwrap();
        assert_eq!(second.file_index, 1);
        assert_eq!(second.start, 0);
        assert!(path.join("data_0001.dat").is_file());

        let mut out = [0u8; 24];
        vol.read_data(0, first.start, 24, &mut out).unwrap();
        assert_eq!(out, [0xAA; 24]);
        vol.read_data(1, second.start, 24, &mut out).unwrap();
        assert_eq!(out, [0xBB; 24]);
    }

    #[test]
    fn test_reset_empties_volume() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vol1");
        let config = DirVolumeConfig {
            fsync_enabled: false,
            data_segment_size: 8,
        };
        let mut vol = DirVolume::open(&path, OpenMode::CreateReadWrite, 0o640, config).unwrap();
        let (block, record) = headers();

        vol.append_data(&block, &record, &[1; 8]).unwrap();
        vol.append_data(&block, &record, &[2; 8]).unwrap();
        vol.append_block(&BlockEntry {
            header: block,
            record_start: 0,
            record_count: 2,
        })
        .unwrap();
        assert!(path.join("data_0001.dat").is_file());

        vol.reset().unwrap();
        assert_eq!(vol.size(), 0);
        assert!(!path.join("data_0001.dat").exists());
        assert_eq!(path.join("blocks.idx").metadata().unwrap().len(), 0);

        // The volume stays writable after a reset.
        let loc = vol.append_data(&block, &record, &[3; 4]).unwrap();
        assert_eq!(loc.start, 0);
        assert_eq!(loc.file_index, 0);
    }

    #[test]
    fn test_corrupt_index_length_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vol1");
        {
            let _vol =
                DirVolume::open(&path, OpenMode::CreateReadWrite, 0o640, test_config()).unwrap();
        }
        std::fs::write(path.join("blocks.idx"), [0u8; 7]).unwrap();

        let err = DirVolume::open(&path, OpenMode::ReadWrite, 0o640, test_config()).unwrap_err();
        assert!(matches!(err, VaultError::VolumeCorrupted { .. }));
    }

    #[test]
    fn test_read_missing_block() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vol1");
        let vol =
            DirVolume::open(&path, OpenMode::CreateReadWrite, 0o640, test_config()).unwrap();
        assert!(matches!(
            vol.read_block(3),
            Err(VaultError::BlockNotFound { block_number: 3 })
        ));
    }
}
