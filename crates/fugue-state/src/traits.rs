//! State access traits consumed by the execution core

use crate::account::Log;
use bytes::Bytes;
use fugue_primitives::{Address, H256, U256};

/// Opaque revision marker returned by [`StateWriter::snapshot`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Snapshot(pub(crate) usize);

/// Read access to state
pub trait StateReader {
    /// Whether the account is present (possibly empty)
    fn exists(&self, address: &Address) -> bool;

    /// Whether the account is absent or EIP-161 empty
    fn is_empty(&self, address: &Address) -> bool;

    /// Account balance, zero when absent
    fn balance(&self, address: &Address) -> U256;

    /// Account nonce, zero when absent
    fn nonce(&self, address: &Address) -> u64;

    /// Account code, empty when absent
    fn code(&self, address: &Address) -> Bytes;

    /// Code hash; `H256::ZERO` for an absent account
    fn code_hash(&self, address: &Address) -> H256;

    /// Storage slot value, zero when unset
    fn storage(&self, address: &Address, key: &H256) -> H256;

    /// Whether the account was self-destructed in this transaction
    fn has_suicided(&self, address: &Address) -> bool;

    /// Accumulated gas refund counter
    fn refund(&self) -> u64;

    /// Code length in bytes
    fn code_size(&self, address: &Address) -> usize {
        self.code(address).len()
    }
}

/// Write access to state
pub trait StateWriter {
    /// Materialize an account. An existing balance is carried over.
    fn create_account(&mut self, address: Address);

    /// Credit balance, creating the account if needed
    fn add_balance(&mut self, address: &Address, amount: U256);

    /// Debit balance. Callers check affordability first.
    fn sub_balance(&mut self, address: &Address, amount: U256);

    /// Set account nonce
    fn set_nonce(&mut self, address: &Address, nonce: u64);

    /// Set account code
    fn set_code(&mut self, address: &Address, code: Bytes);

    /// Write a storage slot
    fn set_storage(&mut self, address: &Address, key: H256, value: H256);

    /// Append a log record
    fn add_log(&mut self, log: Log);

    /// Mark the account as self-destructed and clear its balance.
    /// Returns false when the account does not exist.
    fn suicide(&mut self, address: &Address) -> bool;

    /// Increase the refund counter
    fn add_refund(&mut self, gas: u64);

    /// Take a revision marker
    fn snapshot(&mut self) -> Snapshot;

    /// Undo every change made after `snapshot` was taken.
    /// Snapshots taken after it become invalid.
    fn revert_to_snapshot(&mut self, snapshot: Snapshot);
}

/// Full state access, implemented for every reader + writer
pub trait StateDb: StateReader + StateWriter {}

impl<T: StateReader + StateWriter + ?Sized> StateDb for T {}
