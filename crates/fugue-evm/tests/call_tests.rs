//! Call-family integration tests for fugue-evm
//!
//! Covers the success, revert and failure paths of the four call variants
//! and how they settle gas and state.

mod common;

use bytes::Bytes;
use common::*;
use fugue_evm::{EvmError, ExitStatus};
use fugue_primitives::{Address, H256, U256};
use fugue_state::{StateReader, StateWriter};

const PARENT: Address = Address::from_low_u8(0x50);
const CHILD: Address = Address::from_low_u8(0xc1);

fn slot(n: u64) -> H256 {
    H256::from_word(U256::from(n))
}

// ==================== Return Values ====================

#[test]
fn test_add_program_returns_five() {
    let mut state = funded_state();
    // PUSH1 2 PUSH1 3 ADD, then return the top word
    let mut code = vec![0x60, 0x02, 0x60, 0x03, 0x01];
    code.extend_from_slice(&RETURN_TOP);
    with_code(&mut state, PARENT, &code);

    let result = evm(&mut state).call(ALICE, PARENT, Bytes::new(), GAS, U256::zero());
    assert!(result.is_success());
    assert_eq!(&result.output[..], &word(5u64));
}

#[test]
fn test_call_with_value_reaches_contract() {
    let mut state = funded_state();
    // CALLVALUE, then return it
    let mut code = vec![0x34];
    code.extend_from_slice(&RETURN_TOP);
    with_code(&mut state, PARENT, &code);

    let mut vm = evm(&mut state);
    let result = vm.call(ALICE, PARENT, Bytes::new(), GAS, U256::from(1234));
    assert_eq!(&result.output[..], &word(1234u64));
    drop(vm);
    assert_eq!(state.balance(&PARENT), U256::from(1234));
}

// ==================== Revert Isolation ====================

#[test]
fn test_reverting_subcall_keeps_parent_writes() {
    let mut state = funded_state();
    with_code(&mut state, CHILD, &REVERTING_CHILD);

    // SSTORE(0, 1); CALL child; SSTORE(1, flag); RETURN(0, 32)
    let mut code = vec![0x60, 0x01, 0x60, 0x00, 0x55];
    code.extend(call_into(0xc1));
    code.extend_from_slice(&[0x60, 0x01, 0x55, 0x60, 0x20, 0x60, 0x00, 0xf3]);
    with_code(&mut state, PARENT, &code);

    let mut vm = evm(&mut state);
    let result = vm.call(ALICE, PARENT, Bytes::new(), GAS, U256::zero());
    assert!(result.is_success());
    // Revert payload lands in the parent's output range
    assert_eq!(&result.output[..], &word(0xdeadu64));
    drop(vm);

    assert_eq!(state.storage(&PARENT, &slot(0)), slot(1));
    assert_eq!(state.storage(&PARENT, &slot(1)), H256::ZERO);
    assert_eq!(state.storage(&CHILD, &slot(0)), H256::ZERO);
}

#[test]
fn test_direct_revert_returns_gas_and_payload() {
    let mut state = funded_state();
    with_code(&mut state, CHILD, &REVERTING_CHILD);

    let mut vm = evm(&mut state);
    let result = vm.call(ALICE, CHILD, Bytes::new(), GAS, U256::from(7));
    assert!(result.is_revert());
    assert_eq!(&result.output[..], &word(0xdeadu64));
    assert!(result.gas_left > 0 && result.gas_left < GAS);
    drop(vm);

    assert_eq!(state.storage(&CHILD, &slot(0)), H256::ZERO);
    assert_eq!(state.balance(&CHILD), U256::zero());
}

#[test]
fn test_failing_subcall_consumes_only_its_gas() {
    let mut state = funded_state();
    // PUSH1 0x04 JUMP PUSH1 0x5b: jump into push data
    with_code(&mut state, CHILD, &[0x60, 0x04, 0x56, 0x60, 0x5b]);

    let mut code = call_into(0xc1);
    code.extend_from_slice(&RETURN_TOP);
    with_code(&mut state, PARENT, &code);

    let result = evm(&mut state).call(ALICE, PARENT, Bytes::new(), GAS, U256::zero());
    assert!(result.is_success());
    assert_eq!(&result.output[..], &word(0u64));
    // The child kept at most 1/64 of the parent's gas back
    assert!(result.gas_left > 0);
    assert!(result.gas_left < GAS / 32);
}

#[test]
fn test_invalid_jump_consumes_all_gas() {
    let mut state = funded_state();
    with_code(&mut state, CHILD, &[0x60, 0x04, 0x56, 0x60, 0x5b]);

    let result = evm(&mut state).call(ALICE, CHILD, Bytes::new(), GAS, U256::zero());
    assert_eq!(
        result.status,
        ExitStatus::Failed(EvmError::InvalidJump(U256::from(4)))
    );
    assert_eq!(result.gas_left, 0);
}

// ==================== Empty Accounts ====================

#[test]
fn test_zero_value_call_to_missing_account() {
    let mut state = funded_state();
    let ghost = Address::from_low_u8(0x99);

    let mut vm = evm(&mut state);
    let result = vm.call(ALICE, ghost, Bytes::from_static(b"hi"), 5_000, U256::zero());
    assert!(result.is_success());
    assert!(result.output.is_empty());
    assert_eq!(result.gas_left, 5_000);
    drop(vm);
    assert!(!state.exists(&ghost));
}

#[test]
fn test_call_instruction_to_missing_account_succeeds() {
    let mut state = funded_state();
    let mut code = call_into(0x99);
    code.extend_from_slice(&RETURN_TOP);
    with_code(&mut state, PARENT, &code);

    let mut vm = evm(&mut state);
    let result = vm.call(ALICE, PARENT, Bytes::new(), GAS, U256::zero());
    assert_eq!(&result.output[..], &word(1u64));
    drop(vm);
    assert!(!state.exists(&Address::from_low_u8(0x99)));
}

// ==================== Variants ====================

#[test]
fn test_callcode_writes_callers_storage() {
    let mut state = funded_state();
    // SSTORE(0, 9)
    with_code(&mut state, CHILD, &[0x60, 0x09, 0x60, 0x00, 0x55, 0x00]);

    let mut vm = evm(&mut state);
    let result = vm.call_code(PARENT, CHILD, Bytes::new(), GAS, U256::zero());
    assert!(result.is_success());
    drop(vm);

    assert_eq!(state.storage(&PARENT, &slot(0)), slot(9));
    assert_eq!(state.storage(&CHILD, &slot(0)), H256::ZERO);
}

#[test]
fn test_delegatecall_forwards_caller_and_value() {
    let mut state = funded_state();
    // Library returns CALLER and CALLVALUE as two words
    let library = [
        0x33, 0x60, 0x00, 0x52, // MSTORE(0, CALLER)
        0x34, 0x60, 0x20, 0x52, // MSTORE(32, CALLVALUE)
        0x60, 0x40, 0x60, 0x00, 0xf3, // RETURN(0, 64)
    ];
    with_code(&mut state, CHILD, &library);

    // DELEGATECALL(GAS, child, 0, 0, 0, 64) then RETURN(0, 64)
    let proxy = [
        0x60, 0x40, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0xc1, 0x5a, 0xf4, 0x50, 0x60, 0x40,
        0x60, 0x00, 0xf3,
    ];
    with_code(&mut state, PARENT, &proxy);

    let result = evm(&mut state).call(ALICE, PARENT, Bytes::new(), GAS, U256::from(42));
    assert!(result.is_success());
    assert_eq!(&result.output[..32], &word(ALICE.to_word()));
    assert_eq!(&result.output[32..], &word(42u64));
}

#[test]
fn test_static_call_rejects_writes() {
    let mut state = funded_state();
    with_code(&mut state, CHILD, &[0x60, 0x01, 0x60, 0x00, 0x55, 0x00]);

    let mut vm = evm(&mut state);
    let result = vm.static_call(ALICE, CHILD, Bytes::new(), GAS);
    assert_eq!(result.error(), Some(&EvmError::WriteProtection));
    assert_eq!(result.gas_left, 0);
    drop(vm);
    assert_eq!(state.storage(&CHILD, &slot(0)), H256::ZERO);
}

#[test]
fn test_staticcall_instruction_blocks_nested_writes() {
    let mut state = funded_state();
    with_code(&mut state, CHILD, &[0x60, 0x01, 0x60, 0x00, 0x55, 0x00]);

    // STATICCALL(GAS, child, 0, 0, 0, 0), return the flag
    let mut code = vec![
        0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0x00, 0x60, 0xc1, 0x5a, 0xfa,
    ];
    code.extend_from_slice(&RETURN_TOP);
    with_code(&mut state, PARENT, &code);

    let result = evm(&mut state).call(ALICE, PARENT, Bytes::new(), GAS, U256::zero());
    assert!(result.is_success());
    assert_eq!(&result.output[..], &word(0u64));
}

#[test]
fn test_static_frame_allows_reads() {
    let mut state = funded_state();
    with_code(&mut state, CHILD, &[0x60, 0x00, 0x54, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3]);
    state.set_storage(&CHILD, slot(0), slot(77));

    let result = evm(&mut state).static_call(ALICE, CHILD, Bytes::new(), GAS);
    assert!(result.is_success());
    assert_eq!(&result.output[..], &word(77u64));
}

// ==================== Precompiles ====================

#[test]
fn test_identity_precompile_via_call_instruction() {
    let mut state = funded_state();
    // MSTORE(0, 0xbeef); CALL(GAS, 0x04, 0, 0, 32, 32, 32); RETURN(32, 32)
    let code = [
        0x61, 0xbe, 0xef, 0x60, 0x00, 0x52, // MSTORE(0, 0xbeef)
        0x60, 0x20, 0x60, 0x20, 0x60, 0x20, 0x60, 0x00, 0x60, 0x00, 0x60, 0x04, 0x5a, 0xf1,
        0x50, // POP flag
        0x60, 0x20, 0x60, 0x20, 0xf3, // RETURN(32, 32)
    ];
    with_code(&mut state, PARENT, &code);

    let result = evm(&mut state).call(ALICE, PARENT, Bytes::new(), GAS, U256::zero());
    assert!(result.is_success());
    assert_eq!(&result.output[..], &word(0xbeefu64));
}

#[test]
fn test_sha256_precompile() {
    let mut state = funded_state();
    let result = evm(&mut state).call(
        ALICE,
        Address::from_low_u8(2),
        Bytes::from_static(b"abc"),
        GAS,
        U256::zero(),
    );
    assert!(result.is_success());
    assert_eq!(
        hex::encode(&result.output),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert_eq!(result.gas_left, GAS - 72);
}

// ==================== Preconditions ====================

#[test]
fn test_insufficient_balance_is_rejected_without_gas_loss() {
    let mut state = funded_state();
    with_code(&mut state, CHILD, &[0x00]);

    let result = evm(&mut state).call(BOB, CHILD, Bytes::new(), 9_000, U256::one());
    assert_eq!(result.error(), Some(&EvmError::InsufficientBalance));
    assert_eq!(result.gas_left, 9_000);
}

#[test]
fn test_returndatasize_after_subcall() {
    let mut state = funded_state();
    with_code(&mut state, CHILD, &REVERTING_CHILD);

    let mut code = call_into(0xc1);
    code.extend_from_slice(&[0x50, 0x3d]); // POP, RETURNDATASIZE
    code.extend_from_slice(&RETURN_TOP);
    with_code(&mut state, PARENT, &code);

    let result = evm(&mut state).call(ALICE, PARENT, Bytes::new(), GAS, U256::zero());
    assert_eq!(&result.output[..], &word(32u64));
}
