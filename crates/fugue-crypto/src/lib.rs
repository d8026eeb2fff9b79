//! # fugue-crypto
//!
//! Cryptographic primitives used by the execution core.
//!
//! - Keccak-256 and SHA-256 hashing
//! - CREATE / CREATE2 contract address derivation
//! - secp256k1 signer recovery (backs the ECRECOVER precompile)

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod error;
mod hash;
mod recover;

pub use address::{create2_address, create_address};
pub use error::CryptoError;
pub use hash::{keccak256, sha256, EMPTY_KECCAK};
pub use recover::{ecrecover, public_key_to_address};
