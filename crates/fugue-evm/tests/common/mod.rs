//! Shared fixtures for fugue-evm integration tests.
//!
//! Contracts are hand-assembled; offsets of jump targets are listed next to
//! each program.

#![allow(dead_code)]

use bytes::Bytes;
use fugue_evm::{Environment, Evm};
use fugue_primitives::{Address, U256};
use fugue_state::JournaledState;

/// Externally owned account funding most tests
pub const ALICE: Address = Address::from_low_u8(0xa1);
/// Second externally owned account
pub const BOB: Address = Address::from_low_u8(0xb0);

/// Default gas budget
pub const GAS: u64 = 1_000_000;

/// Install a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// State with ALICE funded
pub fn funded_state() -> JournaledState {
    init_tracing();
    let mut state = JournaledState::new();
    state.insert_account(ALICE, U256::from(10u64.pow(18)), 0, Bytes::new());
    state
}

/// Install `code` at `address`
pub fn with_code(state: &mut JournaledState, address: Address, code: &[u8]) {
    state.insert_account(address, U256::zero(), 1, Bytes::copy_from_slice(code));
}

/// Execution context over `state` with defaults
pub fn evm(state: &mut JournaledState) -> Evm<'_, JournaledState> {
    Evm::new(state, Environment::default())
}

/// 32-byte big-endian word
pub fn word(value: impl Into<U256>) -> [u8; 32] {
    fugue_primitives::word_to_bytes(value.into())
}

/// Concatenate 32-byte words into call data
pub fn calldata(words: &[U256]) -> Bytes {
    let mut out = Vec::with_capacity(words.len() * 32);
    for w in words {
        out.extend_from_slice(&fugue_primitives::word_to_bytes(*w));
    }
    Bytes::from(out)
}

/// Init code that deploys `runtime` verbatim.
///
/// ```text
/// PUSH2 len  DUP1  PUSH1 0x0c  PUSH1 0  CODECOPY  PUSH1 0  RETURN
/// ```
pub fn deployer(runtime: &[u8]) -> Bytes {
    let len = runtime.len() as u16;
    let mut code = vec![
        0x61,
        (len >> 8) as u8,
        len as u8,
        0x80,
        0x60,
        0x0c,
        0x60,
        0x00,
        0x39,
        0x60,
        0x00,
        0xf3,
    ];
    code.extend_from_slice(runtime);
    Bytes::from(code)
}

/// Code that returns the top stack word: `PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN`
pub const RETURN_TOP: [u8; 8] = [0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3];

/// Token contract keyed by account word.
///
/// Call data is three words: selector, account, amount.
/// - `1` mint: `balance[account] += amount`
/// - `2` transfer: moves `amount` from CALLER to `account`, reverting
///   when the caller's balance is short
/// - `3` balance: returns `balance[account]`
///
/// Jump targets: mint 0x1b, transfer 0x29, fail 0x44, balance 0x49.
pub const TOKEN_RUNTIME: [u8; 86] = [
    // dispatch
    0x60, 0x00, 0x35, // 00 PUSH1 0 CALLDATALOAD
    0x80, 0x60, 0x01, 0x14, 0x60, 0x1b, 0x57, // 03 DUP1 PUSH1 1 EQ PUSH1 mint JUMPI
    0x80, 0x60, 0x02, 0x14, 0x60, 0x29, 0x57, // 0a DUP1 PUSH1 2 EQ PUSH1 transfer JUMPI
    0x60, 0x03, 0x14, 0x60, 0x49, 0x57, // 11 PUSH1 3 EQ PUSH1 balance JUMPI
    0x60, 0x00, 0x80, 0xfd, // 17 PUSH1 0 DUP1 REVERT
    // mint
    0x5b, // 1b JUMPDEST
    0x60, 0x40, 0x35, // 1c amount
    0x60, 0x20, 0x35, // 1f account
    0x80, 0x54, // 22 DUP1 SLOAD
    0x82, 0x01, // 24 DUP3 ADD
    0x90, 0x55, // 26 SWAP1 SSTORE
    0x00, // 28 STOP
    // transfer
    0x5b, // 29 JUMPDEST
    0x60, 0x40, 0x35, // 2a amount
    0x33, 0x54, // 2d CALLER SLOAD
    0x81, 0x81, 0x10, // 2f DUP2 DUP2 LT
    0x60, 0x44, 0x57, // 32 PUSH1 fail JUMPI
    0x81, 0x90, 0x03, // 35 DUP2 SWAP1 SUB
    0x33, 0x55, // 38 CALLER SSTORE
    0x60, 0x20, 0x35, // 3a account
    0x80, 0x54, // 3d DUP1 SLOAD
    0x82, 0x01, // 3f DUP3 ADD
    0x90, 0x55, // 41 SWAP1 SSTORE
    0x00, // 43 STOP
    // fail
    0x5b, 0x60, 0x00, 0x80, 0xfd, // 44 JUMPDEST PUSH1 0 DUP1 REVERT
    // balance
    0x5b, // 49 JUMPDEST
    0x60, 0x20, 0x35, 0x54, // 4a account SLOAD
    0x60, 0x00, 0x52, // 4e PUSH1 0 MSTORE
    0x60, 0x20, 0x60, 0x00, 0xf3, // 51 PUSH1 32 PUSH1 0 RETURN
];

/// `SSTORE(0, 2)` then revert with the word 0xdead
pub const REVERTING_CHILD: [u8; 16] = [
    0x60, 0x02, 0x60, 0x00, 0x55, // SSTORE(0, 2)
    0x61, 0xde, 0xad, 0x60, 0x00, 0x52, // MSTORE(0, 0xdead)
    0x60, 0x20, 0x60, 0x00, 0xfd, // REVERT(0, 32)
];

/// `CALL(GAS, target, 0, 0, 0, 0, 32)` leaving the success flag on the stack
pub fn call_into(target: u8) -> Vec<u8> {
    vec![
        0x60, 0x20, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, target, 0x5a, 0xf1,
    ]
}
