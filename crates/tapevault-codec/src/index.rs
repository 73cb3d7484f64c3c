//! Storage-side index entry layouts.
//!
//! A volume persists one `RecordEntry` per record fragment and one
//! `BlockEntry` per committed block. Both embed the corresponding wire
//! header verbatim so a block can be reassembled byte-for-byte.

use crate::wire::{WireBlockHeader, WireRecordHeader};
use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};
use tapevault_common::{Result, VaultError};

/// Where a payload fragment landed inside a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataLocation {
    /// Byte offset of the fragment within its payload segment.
    pub start: u64,
    /// Index of the payload segment holding the fragment.
    pub file_index: u32,
}

/// Per-record index entry.
///
/// Layout (32 bytes):
/// - wire record header: 12 bytes, verbatim
/// - start: 8 bytes (fragment offset within its segment)
/// - size: 8 bytes (fragment length actually stored)
/// - file_index: 4 bytes (payload segment index)
///
/// Created once during scatter, immutable thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    pub header: WireRecordHeader,
    pub start: u64,
    pub size: u64,
    pub file_index: u32,
}

impl RecordEntry {
    /// Encoded size of one entry in bytes.
    pub const ENCODED_SIZE: usize = WireRecordHeader::SIZE + 8 + 8 + 4;

    /// Creates an entry for a fragment stored at `location`.
    pub fn new(header: WireRecordHeader, location: DataLocation, size: u64) -> Self {
        Self {
            header,
            start: location.start,
            size,
            file_index: location.file_index,
        }
    }

    /// Encodes the entry for persistence.
    pub fn to_bytes(&self) -> [u8; Self::ENCODED_SIZE] {
        let mut out = [0u8; Self::ENCODED_SIZE];
        let mut buf = &mut out[..];
        buf.put_slice(&self.header.to_bytes());
        buf.put_u64_le(self.start);
        buf.put_u64_le(self.size);
        buf.put_u32_le(self.file_index);
        out
    }

    /// Decodes an entry from the start of `data`.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::ENCODED_SIZE {
            return Err(VaultError::VolumeCorrupted {
                reason: format!("record entry truncated at {} bytes", data.len()),
            });
        }

        let header = WireRecordHeader::decode(data)?;
        let mut rest = &data[WireRecordHeader::SIZE..];
        Ok(Self {
            header,
            start: rest.get_u64_le(),
            size: rest.get_u64_le(),
            file_index: rest.get_u32_le(),
        })
    }
}

/// Per-block index entry.
///
/// Layout (36 bytes):
/// - wire block header: 24 bytes, verbatim
/// - record_start: 8 bytes (offset of the block's first record entry)
/// - record_count: 4 bytes
///
/// Committed as the last step of scatter; the sequence of these
/// entries defines the volume's size in blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEntry {
    pub header: WireBlockHeader,
    pub record_start: u64,
    pub record_count: u32,
}

impl BlockEntry {
    /// Encoded size of one entry in bytes.
    pub const ENCODED_SIZE: usize = WireBlockHeader::SIZE + 8 + 4;

    /// Encodes the entry for persistence.
    pub fn to_bytes(&self) -> [u8; Self::ENCODED_SIZE] {
        let mut out = [0u8; Self::ENCODED_SIZE];
        let mut buf = &mut out[..];
        buf.put_slice(&self.header.to_bytes());
        buf.put_u64_le(self.record_start);
        buf.put_u32_le(self.record_count);
        out
    }

    /// Decodes an entry from the start of `data`.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < Self::ENCODED_SIZE {
            return Err(VaultError::VolumeCorrupted {
                reason: format!("block entry truncated at {} bytes", data.len()),
            });
        }

        let header = WireBlockHeader::decode(data)?;
        let mut rest = &data[WireBlockHeader::SIZE..];
        Ok(Self {
            header,
            record_start: rest.get_u64_le(),
            record_count: rest.get_u32_le(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_entry_roundtrip() {
        let entry = RecordEntry::new(
            WireRecordHeader {
                file_index: 1,
                stream: 2,
                data_size: 512,
            },
            DataLocation {
                start: 4096,
                file_index: 3,
            },
            512,
        );

        assert_eq!(entry.to_bytes().len(), RecordEntry::ENCODED_SIZE);
        let decoded = RecordEntry::decode(&entry.to_bytes()).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_record_entry_embeds_header_verbatim() {
        let header = WireRecordHeader {
            file_index: -7,
            stream: 99,
            data_size: 1024,
        };
        let entry = RecordEntry::new(
            header,
            DataLocation {
                start: 0,
                file_index: 0,
            },
            1024,
        );
        let bytes = entry.to_bytes();
        assert_eq!(&bytes[..WireRecordHeader::SIZE], &header.to_bytes());
    }

    #[test]
    fn test_record_entry_truncated() {
        let err = RecordEntry::decode(&[0u8; RecordEntry::ENCODED_SIZE - 1]).unwrap_err();
        assert!(matches!(
            err,
            tapevault_common::VaultError::VolumeCorrupted { .. }
        ));
    }

    #[test]
    fn test_block_entry_roundtrip() {
        let entry = BlockEntry {
            header: WireBlockHeader {
                checksum: 1,
                block_size: 48,
                block_number: 0,
                magic: *b"TB02",
                session_id: 5,
                session_time: 6,
            },
            record_start: 12,
            record_count: 3,
        };

        assert_eq!(entry.to_bytes().len(), BlockEntry::ENCODED_SIZE);
        let decoded = BlockEntry::decode(&entry.to_bytes()).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_block_entry_truncated() {
        assert!(BlockEntry::decode(&[0u8; 10]).is_err());
    }

    #[test]
    fn test_encoded_sizes() {
        assert_eq!(RecordEntry::ENCODED_SIZE, 32);
        assert_eq!(BlockEntry::ENCODED_SIZE, 36);
    }
}
