//! Shared linear memory
//!
//! The guest and the interpreter see the same contiguous byte buffer; the
//! wire protocol references it by (offset, length). During a commit the
//! buffer is read-only from the interpreter's side.

use crate::error::ChangeError;

/// A contiguous byte buffer shared with the guest
pub trait SharedMemory {
    /// The full backing buffer
    fn buffer(&self) -> &[u8];
}

impl SharedMemory for [u8] {
    fn buffer(&self) -> &[u8] {
        self
    }
}

impl SharedMemory for Vec<u8> {
    fn buffer(&self) -> &[u8] {
        self
    }
}

impl<M: SharedMemory + ?Sized> SharedMemory for &M {
    fn buffer(&self) -> &[u8] {
        (**self).buffer()
    }
}

/// Byte- and word-aligned views over one shared buffer, held for the
/// duration of a commit
#[derive(Debug, Clone, Copy)]
pub(crate) struct MemoryView<'a> {
    bytes: &'a [u8],
}

impl<'a> MemoryView<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Size of the backing buffer in bytes
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Read the little-endian 32-bit word at the given word index.
    /// The caller has already bounds-checked the enclosing range.
    pub fn word(&self, index: usize) -> u32 {
        let at = index * 4;
        u32::from_le_bytes([
            self.bytes[at],
            self.bytes[at + 1],
            self.bytes[at + 2],
            self.bytes[at + 3],
        ])
    }

    /// Decode a text operand. Invalid UTF-8 follows the replacement
    /// character policy rather than failing the frame.
    pub fn text(&self, pointer: u32, length: u32) -> Result<String, ChangeError> {
        let start = pointer as usize;
        let end = start
            .checked_add(length as usize)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(ChangeError::TextOutOfBounds {
                pointer,
                length,
                size: self.bytes.len(),
            })?;
        Ok(String::from_utf8_lossy(&self.bytes[start..end]).into_owned())
    }
}
