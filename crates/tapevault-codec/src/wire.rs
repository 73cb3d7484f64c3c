//! Wire header layouts for tape-style blocks and records.

use bytes::{Buf, BufMut};
use serde::{Deserialize, Serialize};
use tapevault_common::{Result, VaultError};

/// Header of one tape-style block as transmitted by the backup
/// protocol.
///
/// Layout (24 bytes):
/// - checksum: 4 bytes
/// - block_size: 4 bytes (total block size, header included)
/// - block_number: 4 bytes
/// - magic: 4 bytes
/// - session_id: 4 bytes
/// - session_time: 4 bytes
///
/// Only `block_size` is interpreted by this layer; the remaining
/// fields are copied verbatim between the wire and storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WireBlockHeader {
    pub checksum: u32,
    pub block_size: u32,
    pub block_number: u32,
    pub magic: [u8; 4],
    pub session_id: u32,
    pub session_time: u32,
}

impl WireBlockHeader {
    /// Encoded size of the header in bytes.
    pub const SIZE: usize = 24;

    /// Decodes a header from the start of `data`.
    pub fn decode(mut data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(VaultError::BlockTooSmall { size: data.len() });
        }

        let checksum = data.get_u32_le();
        let block_size = data.get_u32_le();
        let block_number = data.get_u32_le();
        let mut magic = [0u8; 4];
        data.copy_to_slice(&mut magic);
        let session_id = data.get_u32_le();
        let session_time = data.get_u32_le();

        Ok(Self {
            checksum,
            block_size,
            block_number,
            magic,
            session_id,
            session_time,
        })
    }

    /// Encodes the header into its wire form.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        let mut buf = &mut out[..];
        buf.put_u32_le(self.checksum);
        buf.put_u32_le(self.block_size);
        buf.put_u32_le(self.block_number);
        buf.put_slice(&self.magic);
        buf.put_u32_le(self.session_id);
        buf.put_u32_le(self.session_time);
        out
    }
}

/// Header preceding each record's payload inside a block.
///
/// Layout (12 bytes):
/// - file_index: 4 bytes (signed)
/// - stream: 4 bytes (signed)
/// - data_size: 4 bytes (payload length of this record fragment)
///
/// A logical record may span multiple blocks; `data_size` declares the
/// full remaining payload, of which only the bytes present in the
/// containing block form this fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WireRecordHeader {
    pub file_index: i32,
    pub stream: i32,
    pub data_size: u32,
}

impl WireRecordHeader {
    /// Encoded size of the header in bytes.
    pub const SIZE: usize = 12;

    /// Decodes a header from the start of `data`.
    pub fn decode(mut data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(VaultError::MalformedRecord { offset: 0 });
        }

        Ok(Self {
            file_index: data.get_i32_le(),
            stream: data.get_i32_le(),
            data_size: data.get_u32_le(),
        })
    }

    /// Encodes the header into its wire form.
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        let mut buf = &mut out[..];
        buf.put_i32_le(self.file_index);
        buf.put_i32_le(self.stream);
        buf.put_u32_le(self.data_size);
        out
    }
}
