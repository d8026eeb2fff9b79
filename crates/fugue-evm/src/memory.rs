//! Frame memory
//!
//! Memory only grows through [`Memory::resize`], which the interpreter calls
//! after pricing the expansion. Every accessor is bounds-checked against the
//! current size; nothing grows implicitly.

use crate::error::{EvmError, EvmResult};
use fugue_primitives::{word_to_bytes, U256};

/// Byte-addressable, word-aligned frame memory
#[derive(Clone, Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create new empty memory
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Size in bytes (always a multiple of 32)
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if no memory has been touched
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size in 32-byte words
    pub fn words(&self) -> u64 {
        (self.data.len() / 32) as u64
    }

    /// Grow to `words` words, zero-filling. Never shrinks.
    pub fn resize(&mut self, words: u64) {
        let bytes = words as usize * 32;
        if bytes > self.data.len() {
            self.data.resize(bytes, 0);
        }
    }

    fn range(&self, offset: usize, len: usize) -> EvmResult<std::ops::Range<usize>> {
        let end = offset
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or(EvmError::InvalidMemoryAccess)?;
        Ok(offset..end)
    }

    /// Borrow `len` bytes starting at `offset`
    pub fn slice(&self, offset: usize, len: usize) -> EvmResult<&[u8]> {
        if len == 0 {
            return Ok(&[]);
        }
        let range = self.range(offset, len)?;
        Ok(&self.data[range])
    }

    /// Read the 32-byte big-endian word at `offset`
    pub fn word(&self, offset: usize) -> EvmResult<U256> {
        Ok(U256::from_big_endian(self.slice(offset, 32)?))
    }

    /// Write bytes at `offset`
    pub fn set(&mut self, offset: usize, bytes: &[u8]) -> EvmResult<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let range = self.range(offset, bytes.len())?;
        self.data[range].copy_from_slice(bytes);
        Ok(())
    }

    /// Write a 32-byte big-endian word at `offset`
    pub fn set_word(&mut self, offset: usize, value: U256) -> EvmResult<()> {
        self.set(offset, &word_to_bytes(value))
    }

    /// Write a single byte at `offset`
    pub fn set_byte(&mut self, offset: usize, value: u8) -> EvmResult<()> {
        let range = self.range(offset, 1)?;
        self.data[range.start] = value;
        Ok(())
    }

    /// Copy `len` bytes of `src` starting at `src_offset` into memory,
    /// zero-filling whatever lies past the end of `src`.
    pub fn set_padded(
        &mut self,
        offset: usize,
        src: &[u8],
        src_offset: U256,
        len: usize,
    ) -> EvmResult<()> {
        if len == 0 {
            return Ok(());
        }
        let range = self.range(offset, len)?;
        let dst = &mut self.data[range];
        let start = if src_offset.bits() > 64 {
            src.len()
        } else {
            (src_offset.low_u64() as usize).min(src.len())
        };
        let available = (src.len() - start).min(len);
        dst[..available].copy_from_slice(&src[start..start + available]);
        dst[available..].fill(0);
        Ok(())
    }

    /// Raw contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
