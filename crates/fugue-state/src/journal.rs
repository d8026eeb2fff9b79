//! In-memory journaled state

use crate::account::{Account, Log, EMPTY_CODE_HASH};
use crate::traits::{Snapshot, StateReader, StateWriter};
use bytes::Bytes;
use fugue_crypto::keccak256;
use fugue_primitives::{Address, H256, U256};
use std::collections::{HashMap, HashSet};

/// Reversible change recorded for every mutation
#[derive(Debug, Clone)]
enum JournalEntry {
    /// Account record replaced; `None` means it did not exist
    Account {
        address: Address,
        prev: Option<Account>,
    },
    Storage {
        address: Address,
        key: H256,
        prev: H256,
    },
    Suicide {
        address: Address,
        was_suicided: bool,
    },
    Refund {
        prev: u64,
    },
    Log,
}

/// State held entirely in memory, with snapshot/revert backed by an undo journal.
#[derive(Debug, Default)]
pub struct JournaledState {
    accounts: HashMap<Address, Account>,
    storage: HashMap<(Address, H256), H256>,
    code: HashMap<H256, Bytes>,
    logs: Vec<Log>,
    refund: u64,
    suicided: HashSet<Address>,
    journal: Vec<JournalEntry>,
    /// (revision id, journal length at the time it was taken)
    revisions: Vec<(usize, usize)>,
    next_revision: usize,
}

impl JournaledState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an account directly, bypassing the journal.
    pub fn insert_account(&mut self, address: Address, balance: U256, nonce: u64, code: Bytes) {
        let code_hash = self.store_code(code);
        self.accounts.insert(
            address,
            Account {
                nonce,
                balance,
                code_hash,
            },
        );
    }

    /// Account record, if present
    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Logs emitted so far
    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Number of accounts currently present
    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Forget all revisions; the current state becomes the new baseline.
    pub fn finalize(&mut self) {
        self.journal.clear();
        self.revisions.clear();
    }

    fn store_code(&mut self, code: Bytes) -> H256 {
        if code.is_empty() {
            return EMPTY_CODE_HASH;
        }
        let hash = keccak256(&code);
        self.code.insert(hash, code);
        hash
    }

    /// Apply `f` to the account, journaling its previous value.
    fn modify(&mut self, address: &Address, f: impl FnOnce(&mut Account)) {
        let prev = self.accounts.get(address).cloned();
        let mut account = prev.clone().unwrap_or_default();
        f(&mut account);
        self.journal.push(JournalEntry::Account {
            address: *address,
            prev,
        });
        self.accounts.insert(*address, account);
    }

    fn undo(&mut self, entry: JournalEntry) {
        match entry {
            JournalEntry::Account { address, prev } => match prev {
                Some(account) => {
                    self.accounts.insert(address, account);
                }
                None => {
                    self.accounts.remove(&address);
                }
            },
            JournalEntry::Storage { address, key, prev } => {
                if prev.is_zero() {
                    self.storage.remove(&(address, key));
                } else {
                    self.storage.insert((address, key), prev);
                }
            }
            JournalEntry::Suicide {
                address,
                was_suicided,
            } => {
                if !was_suicided {
                    self.suicided.remove(&address);
                }
            }
            JournalEntry::Refund { prev } => self.refund = prev,
            JournalEntry::Log => {
                self.logs.pop();
            }
        }
    }
}

impl StateReader for JournaledState {
    fn exists(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    fn is_empty(&self, address: &Address) -> bool {
        self.accounts.get(address).map_or(true, Account::is_empty)
    }

    fn balance(&self, address: &Address) -> U256 {
        self.accounts
            .get(address)
            .map(|a| a.balance)
            .unwrap_or_default()
    }

    fn nonce(&self, address: &Address) -> u64 {
        self.accounts.get(address).map_or(0, |a| a.nonce)
    }

    fn code(&self, address: &Address) -> Bytes {
        self.accounts
            .get(address)
            .and_then(|a| self.code.get(&a.code_hash))
            .cloned()
            .unwrap_or_default()
    }

    fn code_hash(&self, address: &Address) -> H256 {
        self.accounts
            .get(address)
            .map_or(H256::ZERO, |a| a.code_hash)
    }

    fn storage(&self, address: &Address, key: &H256) -> H256 {
        self.storage
            .get(&(*address, *key))
            .copied()
            .unwrap_or_default()
    }

    fn has_suicided(&self, address: &Address) -> bool {
        self.suicided.contains(address)
    }

    fn refund(&self) -> u64 {
        self.refund
    }
}

impl StateWriter for JournaledState {
    fn create_account(&mut self, address: Address) {
        let balance = self.balance(&address);
        self.modify(&address, |account| {
            *account = Account {
                balance,
                ..Account::default()
            };
        });
    }

    fn add_balance(&mut self, address: &Address, amount: U256) {
        self.modify(address, |account| {
            account.balance = account.balance.overflowing_add(amount).0;
        });
    }

    fn sub_balance(&mut self, address: &Address, amount: U256) {
        self.modify(address, |account| {
            account.balance = account.balance.saturating_sub(amount);
        });
    }

    fn set_nonce(&mut self, address: &Address, nonce: u64) {
        self.modify(address, |account| account.nonce = nonce);
    }

    fn set_code(&mut self, address: &Address, code: Bytes) {
        let code_hash = self.store_code(code);
        self.modify(address, |account| account.code_hash = code_hash);
    }

    fn set_storage(&mut self, address: &Address, key: H256, value: H256) {
        let prev = self.storage(address, &key);
        self.journal.push(JournalEntry::Storage {
            address: *address,
            key,
            prev,
        });
        if value.is_zero() {
            self.storage.remove(&(*address, key));
        } else {
            self.storage.insert((*address, key), value);
        }
    }

    fn add_log(&mut self, log: Log) {
        self.journal.push(JournalEntry::Log);
        self.logs.push(log);
    }

    fn suicide(&mut self, address: &Address) -> bool {
        if !self.exists(address) {
            return false;
        }
        let was_suicided = !self.suicided.insert(*address);
        self.journal.push(JournalEntry::Suicide {
            address: *address,
            was_suicided,
        });
        self.modify(address, |account| account.balance = U256::zero());
        true
    }

    fn add_refund(&mut self, gas: u64) {
        self.journal.push(JournalEntry::Refund { prev: self.refund });
        self.refund = self.refund.saturating_add(gas);
    }

    fn snapshot(&mut self) -> Snapshot {
        let id = self.next_revision;
        self.next_revision += 1;
        self.revisions.push((id, self.journal.len()));
        Snapshot(id)
    }

    fn revert_to_snapshot(&mut self, snapshot: Snapshot) {
        let Ok(idx) = self
            .revisions
            .binary_search_by_key(&snapshot.0, |(id, _)| *id)
        else {
            tracing::warn!(revision = snapshot.0, "revert to unknown snapshot ignored");
            return;
        };
        let journal_len = self.revisions[idx].1;
        while self.journal.len() > journal_len {
            if let Some(entry) = self.journal.pop() {
                self.undo(entry);
            }
        }
        self.revisions.truncate(idx);
    }
}
