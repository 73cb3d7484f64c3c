//! Gather: reconstruct one wire block from volume-stored fragments.

use tapevault_common::{Result, VaultError};
use tapevault_volume::Volume;

/// Bounds-checked forward cursor over the caller's output buffer.
struct WriteCursor<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> WriteCursor<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Hands out the next `len` bytes for a collaborator to fill.
    fn reserve(&mut self, len: usize) -> Result<&mut [u8]> {
        let end = self.pos + len;
        if end > self.buf.len() {
            return Err(VaultError::BufferTooSmall {
                needed: end as u32,
                capacity: self.buf.len(),
            });
        }
        let dest = &mut self.buf[self.pos..end];
        self.pos = end;
        Ok(dest)
    }

    fn written(&self) -> usize {
        self.pos
    }
}

/// Reassembles the block at `block_number` into `out`, byte for byte
/// as it was originally supplied: block header first, then each
/// record's header followed by its stored payload fragment.
///
/// Fails without writing past `out` if the buffer cannot hold the
/// block's declared size. Returns the number of bytes produced.
pub fn gather<V: Volume>(vol: &V, block_number: u64, out: &mut [u8]) -> Result<usize> {
    let block = vol.read_block(block_number)?;
    if block.header.block_size as usize > out.len() {
        return Err(VaultError::BufferTooSmall {
            needed: block.header.block_size,
            capacity: out.len(),
        });
    }

    let mut cursor = WriteCursor::new(out);
    cursor.write(&block.header.to_bytes())?;

    let records = vol.read_records(block.record_start, block.record_count)?;
    for entry in &records {
        cursor.write(&entry.header.to_bytes())?;
        let dest = cursor.reserve(entry.size as usize)?;
        vol.read_data(entry.file_index, entry.start, entry.size, dest)?;
    }

    Ok(cursor.written())
}
