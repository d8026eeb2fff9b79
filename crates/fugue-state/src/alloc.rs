//! Pre-funded account allocations loaded from JSON

use crate::error::{StateError, StateResult};
use crate::journal::JournaledState;
use crate::traits::StateWriter;
use bytes::Bytes;
use fugue_primitives::{Address, H256, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single allocated account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocAccount {
    /// Balance as a hex (`0x..`) or decimal string
    #[serde(default)]
    pub balance: String,
    /// Account nonce
    #[serde(default)]
    pub nonce: u64,
    /// Contract code (hex string)
    #[serde(default)]
    pub code: Option<String>,
    /// Storage (slot -> value, both hex)
    #[serde(default)]
    pub storage: BTreeMap<String, String>,
}

/// Address (hex string) -> account allocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenesisAlloc(pub BTreeMap<String, AllocAccount>);

impl AllocAccount {
    fn parse_balance(&self) -> StateResult<U256> {
        let s = self.balance.trim();
        if s.is_empty() {
            return Ok(U256::zero());
        }
        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => U256::from_str_radix(hex, 16).ok(),
            None => U256::from_dec_str(s).ok(),
        };
        parsed.ok_or_else(|| StateError::InvalidHex {
            field: "balance",
            value: s.to_string(),
        })
    }

    fn parse_code(&self) -> StateResult<Bytes> {
        match &self.code {
            Some(code) => decode_hex("code", code).map(Bytes::from),
            None => Ok(Bytes::new()),
        }
    }

    fn parse_storage(&self) -> StateResult<Vec<(H256, H256)>> {
        self.storage
            .iter()
            .map(|(k, v)| Ok((parse_word("storage key", k)?, parse_word("storage value", v)?)))
            .collect()
    }
}

impl GenesisAlloc {
    /// Parse an allocation document
    pub fn from_json(json: &str) -> StateResult<Self> {
        serde_json::from_str(json).map_err(|e| StateError::Parse(e.to_string()))
    }

    /// Build a fresh state holding every allocated account.
    pub fn into_state(self) -> StateResult<JournaledState> {
        let mut state = JournaledState::new();
        for (addr_str, account) in &self.0 {
            let address = Address::from_hex(addr_str.trim())
                .map_err(|_| StateError::InvalidAddress(addr_str.clone()))?;
            let balance = account.parse_balance()?;
            state.insert_account(address, balance, account.nonce, account.parse_code()?);
            for (key, value) in account.parse_storage()? {
                state.set_storage(&address, key, value);
            }
            tracing::debug!(%address, %balance, nonce = account.nonce, "alloc account");
        }
        state.finalize();
        Ok(state)
    }
}

fn decode_hex(field: &'static str, value: &str) -> StateResult<Vec<u8>> {
    let trimmed = value.trim();
    hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed)).map_err(|_| StateError::InvalidHex {
        field,
        value: value.to_string(),
    })
}

/// Left-pads short values so `"0x01"` is accepted as a slot.
fn parse_word(field: &'static str, value: &str) -> StateResult<H256> {
    let bytes = decode_hex(field, value)?;
    if bytes.len() > 32 {
        return Err(StateError::InvalidHex {
            field,
            value: value.to_string(),
        });
    }
    Ok(H256::from_word(U256::from_big_endian(&bytes)))
}
