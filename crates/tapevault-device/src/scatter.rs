//! Scatter: decompose one wire block into volume-stored fragments.

use tapevault_codec::{BlockEntry, RecordEntry, WireBlockHeader, WireRecordHeader};
use tapevault_common::{Result, VaultError};
use tapevault_volume::Volume;
use tracing::warn;

/// Persists one complete wire block into `vol`.
///
/// Walks the block from just after the block header to its declared
/// end, storing each record's payload fragment and accumulating one
/// index entry per record. The run of record entries and the block's
/// own entry are committed last, in that order, so a block is only
/// visible once all of its records are durably indexed.
///
/// A payload that would run past the block boundary is clamped to it;
/// the record's remaining bytes continue in a later block and are
/// stored when that block arrives. Returns the number of bytes
/// consumed, which equals the declared block size on success.
pub fn scatter<V: Volume>(vol: &mut V, data: &[u8]) -> Result<usize> {
    if data.len() > u32::MAX as usize {
        return Err(VaultError::BlockTooLarge { size: data.len() });
    }
    if data.len() < WireBlockHeader::SIZE {
        return Err(VaultError::BlockTooSmall { size: data.len() });
    }

    let block = WireBlockHeader::decode(data)?;
    let block_size = block.block_size as usize;

    if block_size < WireBlockHeader::SIZE {
        return Err(VaultError::BlockTooSmall { size: block_size });
    }
    if data.len() < block_size {
        return Err(VaultError::IncompleteBlock {
            given: data.len(),
            needed: block.block_size,
        });
    }
    if block_size != data.len() {
        warn!(
            declared = block_size,
            given = data.len(),
            "block size differs from bytes supplied"
        );
    }

    let end = block_size;
    let mut current = WireBlockHeader::SIZE;
    let mut entries: Vec<RecordEntry> = Vec::new();

    while current != end {
        if current + WireRecordHeader::SIZE > end {
            return Err(VaultError::MalformedRecord { offset: current });
        }
        let record = WireRecordHeader::decode(&data[current..])?;

        let payload_start = current + WireRecordHeader::SIZE;
        let mut payload_end = payload_start + record.data_size as usize;
        if payload_end > end {
            // The payload is split across blocks; store only the part
            // present here.
            payload_end = end;
        }

        let payload = &data[payload_start..payload_end];
        let location = vol.append_data(&block, &record, payload)?;
        entries.push(RecordEntry::new(record, location, payload.len() as u64));

        current = payload_end;
    }

    let run_start = vol.append_records(&entries)?;
    vol.append_block(&BlockEntry {
        header: block,
        record_start: run_start,
        record_count: entries.len() as u32,
    })?;

    Ok(current)
}
