//! Account and log records

use bytes::Bytes;
use fugue_primitives::{Address, H256, U256};

/// Code hash of an account without code (keccak256 of the empty string)
pub const EMPTY_CODE_HASH: H256 = fugue_crypto::EMPTY_KECCAK;

/// Account data
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    /// Account nonce
    pub nonce: u64,
    /// Account balance
    pub balance: U256,
    /// Code hash (keccak256 of code, or EMPTY_CODE_HASH if no code)
    pub code_hash: H256,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: U256::zero(),
            code_hash: EMPTY_CODE_HASH,
        }
    }
}

impl Account {
    /// Create an empty account
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty in the EIP-161 sense: no nonce, no balance, no code.
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code_hash == EMPTY_CODE_HASH
    }

    /// Check if account has code
    pub fn has_code(&self) -> bool {
        self.code_hash != EMPTY_CODE_HASH
    }
}

/// Event emitted by LOG0..LOG4
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    /// Emitting contract
    pub address: Address,
    /// Indexed topics (at most four)
    pub topics: Vec<H256>,
    /// Unindexed payload
    pub data: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_account_is_empty() {
        let acc = Account::new();
        assert!(acc.is_empty());
        assert!(!acc.has_code());
    }

    #[test]
    fn test_account_with_nonce_not_empty() {
        let acc = Account {
            nonce: 1,
            ..Account::default()
        };
        assert!(!acc.is_empty());
    }

    #[test]
    fn test_account_with_code() {
        let acc = Account {
            code_hash: H256::from_bytes([1u8; 32]),
            ..Account::default()
        };
        assert!(acc.has_code());
        assert!(!acc.is_empty());
    }
}
