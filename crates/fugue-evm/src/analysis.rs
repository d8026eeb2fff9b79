//! Jump destination analysis
//!
//! A code blob's valid jump targets are a pure function of its bytes, so the
//! bitmap is computed once per code hash and shared read-only between frames.

use crate::opcode::{Opcode, JUMPDEST};
use dashmap::DashMap;
use fugue_primitives::H256;
use std::sync::Arc;

/// One bit per code offset, set where a JUMPDEST sits on an instruction boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JumpDests {
    bits: Vec<u64>,
    len: usize,
}

impl JumpDests {
    /// Scan `code`, skipping PUSH immediates.
    pub fn analyze(code: &[u8]) -> Self {
        let mut bits = vec![0u64; code.len().div_ceil(64)];
        let mut pc = 0;
        while pc < code.len() {
            let byte = code[pc];
            if byte == JUMPDEST {
                bits[pc / 64] |= 1 << (pc % 64);
            }
            let skip = Opcode::from_byte(byte).map_or(0, Opcode::immediate_size);
            pc += 1 + skip;
        }
        Self {
            bits,
            len: code.len(),
        }
    }

    /// Whether `offset` is a valid jump target
    pub fn is_valid(&self, offset: usize) -> bool {
        offset < self.len && self.bits[offset / 64] & (1 << (offset % 64)) != 0
    }

    /// Length of the analysed code
    pub fn code_len(&self) -> usize {
        self.len
    }
}

/// Shared code-hash -> bitmap cache.
///
/// Two frames analysing the same code concurrently may both compute the
/// bitmap; the first insert wins and both results are identical.
///
/// Entries are never evicted. A cache shared between contexts through
/// `Evm::with_jump_cache` lives as long as its owner keeps it, who decides
/// when to [`clear`](Self::clear) or replace it.
#[derive(Debug, Default)]
pub struct JumpDestCache {
    entries: DashMap<H256, Arc<JumpDests>>,
}

impl JumpDestCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached bitmap for `hash`, analysing `code` on a miss.
    pub fn get_or_analyze(&self, hash: H256, code: &[u8]) -> Arc<JumpDests> {
        if let Some(hit) = self.entries.get(&hash) {
            return Arc::clone(hit.value());
        }
        let fresh = Arc::new(JumpDests::analyze(code));
        let entry = self.entries.entry(hash).or_insert(fresh);
        Arc::clone(entry.value())
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached entry. Bitmaps already handed out stay valid.
    pub fn clear(&self) {
        self.entries.clear();
    }
}
