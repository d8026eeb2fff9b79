//! Memory sizing
//!
//! Pure functions computing, from operands still on the stack, how many
//! words of memory an instruction needs. The interpreter prices the
//! expansion and resizes memory before the handler runs.

use crate::error::{EvmError, EvmResult};
use crate::opcode::Opcode;
use crate::stack::Stack;
use fugue_primitives::U256;

/// Words needed to cover `[offset, offset + len)`. A zero length needs
/// nothing regardless of the offset.
pub fn words_for(offset: U256, len: U256) -> EvmResult<u64> {
    if len.is_zero() {
        return Ok(0);
    }
    if offset.bits() > 64 || len.bits() > 64 {
        return Err(EvmError::GasUintOverflow);
    }
    let end = offset
        .low_u64()
        .checked_add(len.low_u64())
        .ok_or(EvmError::GasUintOverflow)?;
    Ok(end.div_ceil(32))
}

fn fixed(stack: &Stack, offset: usize, len: u64) -> EvmResult<u64> {
    words_for(stack.peek(offset)?, U256::from(len))
}

fn ranged(stack: &Stack, offset: usize, len: usize) -> EvmResult<u64> {
    words_for(stack.peek(offset)?, stack.peek(len)?)
}

/// MLOAD / MSTORE
pub fn mload(stack: &Stack) -> EvmResult<u64> {
    fixed(stack, 0, 32)
}

/// MSTORE8
pub fn mstore8(stack: &Stack) -> EvmResult<u64> {
    fixed(stack, 0, 1)
}

/// SHA3, RETURN, REVERT and LOGn: `offset, len` on top
pub fn offset_len(stack: &Stack) -> EvmResult<u64> {
    ranged(stack, 0, 1)
}

/// CALLDATACOPY, CODECOPY, RETURNDATACOPY: `dest, src, len`
pub fn data_copy(stack: &Stack) -> EvmResult<u64> {
    ranged(stack, 0, 2)
}

/// EXTCODECOPY: `addr, dest, src, len`
pub fn ext_code_copy(stack: &Stack) -> EvmResult<u64> {
    ranged(stack, 1, 3)
}

/// CREATE and CREATE2: `value, offset, len, ..`
pub fn create(stack: &Stack) -> EvmResult<u64> {
    ranged(stack, 1, 2)
}

/// CALL and CALLCODE: larger of the input and output ranges
pub fn call(stack: &Stack) -> EvmResult<u64> {
    Ok(ranged(stack, 3, 4)?.max(ranged(stack, 5, 6)?))
}

/// DELEGATECALL and STATICCALL (no value operand)
pub fn delegate_call(stack: &Stack) -> EvmResult<u64> {
    Ok(ranged(stack, 2, 3)?.max(ranged(stack, 4, 5)?))
}

/// Memory requirement of `op`, or `None` if it does not touch memory.
pub fn required_words(op: Opcode, stack: &Stack) -> EvmResult<Option<u64>> {
    use Opcode::*;
    let words = match op {
        MLoad | MStore => mload(stack)?,
        MStore8 => mstore8(stack)?,
        Keccak256 | Return | Revert | Log(_) => offset_len(stack)?,
        CallDataCopy | CodeCopy | ReturnDataCopy => data_copy(stack)?,
        ExtCodeCopy => ext_code_copy(stack)?,
        Create | Create2 => create(stack)?,
        Call | CallCode => call(stack)?,
        DelegateCall | StaticCall => delegate_call(stack)?,
        _ => return Ok(None),
    };
    Ok(Some(words))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a stack from operands listed top first.
    fn stack_of(top_first: &[u64]) -> Stack {
        let mut stack = Stack::new();
        for v in top_first.iter().rev() {
            stack.push(U256::from(*v)).unwrap();
        }
        stack
    }

    #[test]
    fn test_words_for() {
        assert_eq!(words_for(U256::from(0), U256::from(0)).unwrap(), 0);
        assert_eq!(words_for(U256::MAX, U256::zero()).unwrap(), 0);
        assert_eq!(words_for(U256::from(0), U256::from(1)).unwrap(), 1);
        assert_eq!(words_for(U256::from(31), U256::from(2)).unwrap(), 2);
        assert_eq!(words_for(U256::from(32), U256::from(32)).unwrap(), 2);
    }

    #[test]
    fn test_words_for_overflow() {
        assert_eq!(
            words_for(U256::MAX, U256::one()),
            Err(EvmError::GasUintOverflow)
        );
        assert_eq!(
            words_for(U256::from(u64::MAX), U256::one()),
            Err(EvmError::GasUintOverflow)
        );
    }

    #[test]
    fn test_mstore_and_mstore8() {
        let stack = stack_of(&[40, 7]);
        assert_eq!(required_words(Opcode::MStore, &stack).unwrap(), Some(3));
        assert_eq!(required_words(Opcode::MStore8, &stack).unwrap(), Some(2));
    }

    #[test]
    fn test_call_takes_larger_range() {
        // gas, addr, value, in_off, in_len, out_off, out_len
        let stack = stack_of(&[0, 0, 0, 0, 32, 64, 64]);
        assert_eq!(required_words(Opcode::Call, &stack).unwrap(), Some(4));

        // gas, addr, in_off, in_len, out_off, out_len
        let stack = stack_of(&[0, 0, 256, 1, 0, 0]);
        assert_eq!(required_words(Opcode::StaticCall, &stack).unwrap(), Some(9));
    }

    #[test]
    fn test_ext_code_copy_skips_address() {
        // addr, dest, src, len
        let stack = stack_of(&[u64::MAX, 64, 0, 1]);
        assert_eq!(required_words(Opcode::ExtCodeCopy, &stack).unwrap(), Some(3));
    }

    #[test]
    fn test_non_memory_opcode() {
        let stack = stack_of(&[1, 2]);
        assert_eq!(required_words(Opcode::Add, &stack).unwrap(), None);
    }

    #[test]
    fn test_does_not_pop() {
        let stack = stack_of(&[0, 32]);
        required_words(Opcode::Return, &stack).unwrap();
        assert_eq!(stack.len(), 2);
    }
}
