//! Precompiled contracts
//!
//! Looked up by address before the interpreter runs. A precompile consumes
//! its input and returns output without touching the operand stack.

use crate::error::{EvmError, EvmResult};
use bytes::Bytes;
use fugue_crypto::{ecrecover, sha256};
use fugue_primitives::{Address, H256};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A native contract
pub trait Precompile: Send + Sync {
    /// Gas charged for running on `input`
    fn required_gas(&self, input: &[u8]) -> u64;

    /// Execute on `input`
    fn run(&self, input: &[u8]) -> EvmResult<Bytes>;
}

fn word_count(len: usize) -> u64 {
    (len as u64).div_ceil(32)
}

/// 0x01: secp256k1 signer recovery
#[derive(Debug, Clone, Copy)]
pub struct EcRecover;

impl Precompile for EcRecover {
    fn required_gas(&self, _input: &[u8]) -> u64 {
        3000
    }

    fn run(&self, input: &[u8]) -> EvmResult<Bytes> {
        let mut padded = [0u8; 128];
        let len = input.len().min(128);
        padded[..len].copy_from_slice(&input[..len]);

        // v is a full word holding 27 or 28
        if padded[32..63].iter().any(|b| *b != 0) || !matches!(padded[63], 27 | 28) {
            return Ok(Bytes::new());
        }
        let mut hash = [0u8; 32];
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        hash.copy_from_slice(&padded[..32]);
        r.copy_from_slice(&padded[64..96]);
        s.copy_from_slice(&padded[96..128]);

        match ecrecover(&H256::from_bytes(hash), padded[63], &r, &s) {
            Ok(signer) => {
                let mut out = vec![0u8; 32];
                out[12..].copy_from_slice(signer.as_bytes());
                Ok(Bytes::from(out))
            }
            Err(_) => Ok(Bytes::new()),
        }
    }
}

/// 0x02: SHA-256
#[derive(Debug, Clone, Copy)]
pub struct Sha256Hash;

impl Precompile for Sha256Hash {
    fn required_gas(&self, input: &[u8]) -> u64 {
        60 + 12 * word_count(input.len())
    }

    fn run(&self, input: &[u8]) -> EvmResult<Bytes> {
        Ok(Bytes::copy_from_slice(sha256(input).as_bytes()))
    }
}

/// 0x04: identity
#[derive(Debug, Clone, Copy)]
pub struct Identity;

impl Precompile for Identity {
    fn required_gas(&self, input: &[u8]) -> u64 {
        15 + 3 * word_count(input.len())
    }

    fn run(&self, input: &[u8]) -> EvmResult<Bytes> {
        Ok(Bytes::copy_from_slice(input))
    }
}

/// Address-keyed precompile table
#[derive(Clone, Default)]
pub struct PrecompileSet {
    contracts: HashMap<Address, Arc<dyn Precompile>>,
}

impl PrecompileSet {
    /// Table with no precompiles
    pub fn empty() -> Self {
        Self::default()
    }

    /// ECRECOVER, SHA256 and IDENTITY at their usual addresses
    pub fn standard() -> Self {
        let mut set = Self::empty();
        set.insert(Address::from_low_u8(1), Arc::new(EcRecover));
        set.insert(Address::from_low_u8(2), Arc::new(Sha256Hash));
        set.insert(Address::from_low_u8(4), Arc::new(Identity));
        set
    }

    /// Register `contract` at `address`, replacing any previous entry
    pub fn insert(&mut self, address: Address, contract: Arc<dyn Precompile>) {
        self.contracts.insert(address, contract);
    }

    /// Precompile at `address`
    pub fn get(&self, address: &Address) -> Option<&Arc<dyn Precompile>> {
        self.contracts.get(address)
    }

    /// Check if `address` is a precompile
    pub fn contains(&self, address: &Address) -> bool {
        self.contracts.contains_key(address)
    }

    /// Number of registered precompiles
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }
}

impl fmt::Debug for PrecompileSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut addresses: Vec<_> = self.contracts.keys().collect();
        addresses.sort();
        f.debug_struct("PrecompileSet")
            .field("addresses", &addresses)
            .finish()
    }
}

/// Charge and run `contract`, returning `(output, gas_left)`.
pub fn run_precompile(
    contract: &dyn Precompile,
    input: &[u8],
    gas: u64,
) -> EvmResult<(Bytes, u64)> {
    let cost = contract.required_gas(input);
    if cost > gas {
        return Err(EvmError::OutOfGas);
    }
    let output = contract.run(input)?;
    Ok((output, gas - cost))
}
