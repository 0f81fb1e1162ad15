//! Bounded cursor over an in-memory entry block.
//!
//! Every field read during block decoding goes through `BlockCursor`. Reads
//! return `Option`: `None` means fewer bytes remain than the field requires.
//! The decode loop treats that as the end of the block and leaves the final
//! entry-count check to decide whether the block was truncated.

/// Cursor over a block buffer with bounds-checked reads.
#[derive(Debug)]
pub struct BlockCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BlockCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Takes the next `len` bytes, or `None` if fewer remain.
    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let bytes = self.buf.get(self.pos..end)?;
        self.pos = end;
        Some(bytes)
    }

    /// Advances past `len` bytes, or `None` if fewer remain.
    pub fn skip(&mut self, len: usize) -> Option<()> {
        self.read_bytes(len).map(|_| ())
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        let bytes = self.read_bytes(1)?;
        Some(bytes[0])
    }

    pub fn read_u32_le(&mut self) -> Option<u32> {
        let bytes: [u8; 4] = self.read_bytes(4)?.try_into().ok()?;
        Some(u32::from_le_bytes(bytes))
    }

    pub fn read_u64_le(&mut self) -> Option<u64> {
        let bytes: [u8; 8] = self.read_bytes(8)?.try_into().ok()?;
        Some(u64::from_le_bytes(bytes))
    }
}
