//! # fugue-primitives
//!
//! Fixed-width values shared by every Fugue crate.
//!
//! - [`Address`]: 20-byte account identifier
//! - [`H256`]: 32-byte hash / storage key
//! - [`U256`]: 256-bit machine word (re-exported from `primitive-types`)
//!
//! Conversions between the three follow the usual word layout: an address
//! occupies the low 20 bytes of a big-endian word.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod hash;

pub use address::{Address, AddressError};
pub use hash::{HashError, H256};

pub use primitive_types::U256;

/// Big-endian 32-byte encoding of a word.
pub fn word_to_bytes(word: U256) -> [u8; 32] {
    let mut out = [0u8; 32];
    word.to_big_endian(&mut out);
    out
}
