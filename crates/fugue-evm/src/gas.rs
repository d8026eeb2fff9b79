//! Gas table
//!
//! Base costs per opcode plus the dynamic pieces charged by individual
//! handlers. Memory expansion is priced here but sized by [`crate::memory_cost`].

use crate::error::{EvmError, EvmResult};
use crate::opcode::Opcode;
use fugue_primitives::{H256, U256};

/// Gas costs for EVM operations
pub mod cost {
    /// Zero gas
    pub const ZERO: u64 = 0;
    /// Base gas
    pub const BASE: u64 = 2;
    /// Very low gas
    pub const VERYLOW: u64 = 3;
    /// Low gas
    pub const LOW: u64 = 5;
    /// Mid gas
    pub const MID: u64 = 8;
    /// High gas
    pub const HIGH: u64 = 10;

    /// Jump dest gas
    pub const JUMPDEST: u64 = 1;
    /// Exp gas
    pub const EXP: u64 = 10;
    /// Exp gas per exponent byte
    pub const EXP_BYTE: u64 = 50;
    /// SHA3 base gas
    pub const SHA3: u64 = 30;
    /// SHA3 gas per word
    pub const SHA3_WORD: u64 = 6;

    /// BALANCE, EXTCODESIZE, EXTCODECOPY, EXTCODEHASH
    pub const EXT_ACCOUNT: u64 = 100;
    /// BLOCKHASH
    pub const BLOCKHASH: u64 = 20;

    /// SLOAD
    pub const SLOAD: u64 = 100;
    /// SSTORE of a fresh non-zero value
    pub const SSTORE_SET: u64 = 20000;
    /// SSTORE overwriting a non-zero value
    pub const SSTORE_RESET: u64 = 2900;
    /// Refund for clearing a slot
    pub const SSTORE_CLEAR_REFUND: u64 = 4800;

    /// Log gas
    pub const LOG: u64 = 375;
    /// Log gas per topic
    pub const LOG_TOPIC: u64 = 375;
    /// Log gas per data byte
    pub const LOG_DATA: u64 = 8;

    /// Create gas
    pub const CREATE: u64 = 32000;
    /// Code deposit gas per byte
    pub const CREATE_DATA: u64 = 200;
    /// Call family base gas
    pub const CALL: u64 = 100;
    /// Surcharge for transferring value
    pub const CALL_VALUE: u64 = 9000;
    /// Surcharge for calling into a new account
    pub const CALL_NEW_ACCOUNT: u64 = 25000;
    /// Free gas given to a callee receiving value
    pub const CALL_STIPEND: u64 = 2300;

    /// Memory gas per word
    pub const MEMORY: u64 = 3;
    /// Copy gas per word
    pub const COPY: u64 = 3;

    /// Selfdestruct gas
    pub const SELFDESTRUCT: u64 = 5000;
    /// Selfdestruct refund (removed by London)
    pub const SELFDESTRUCT_REFUND: u64 = 24000;

    /// Max call depth
    pub const MAX_CALL_DEPTH: usize = 1024;
    /// Max stack size
    pub const MAX_STACK_SIZE: usize = 1024;
    /// Default max deployed code size (EIP-170)
    pub const MAX_CODE_SIZE: usize = 24576;
    /// Largest memory size, in words, that can be priced without overflow
    pub const MAX_MEMORY_WORDS: u64 = 0x1FFF_FFFF_E0 / 32;
}

/// Base cost of an opcode, charged before the handler runs.
pub fn static_gas(opcode: Opcode) -> u64 {
    use Opcode::*;
    match opcode {
        Stop | Return | Revert | Invalid | SStore => cost::ZERO,

        Address | Origin | Caller | CallValue | CallDataSize | CodeSize | GasPrice
        | Coinbase | Timestamp | Number | PrevRandao | GasLimit | ChainId | ReturnDataSize
        | Pop | Pc | MSize | Gas | BaseFee | Push(0) => cost::BASE,

        Add | Sub | Not | Lt | Gt | SLt | SGt | Eq | IsZero | And | Or | Xor | Byte | Shl
        | Shr | Sar | CallDataLoad | MLoad | MStore | MStore8 | Push(_) | Dup(_) | Swap(_)
        | CallDataCopy | CodeCopy | ReturnDataCopy => cost::VERYLOW,

        Mul | Div | SDiv | Mod | SMod | SignExtend | SelfBalance => cost::LOW,

        AddMod | MulMod | Jump => cost::MID,

        JumpI => cost::HIGH,

        JumpDest => cost::JUMPDEST,

        Exp => cost::EXP,
        Keccak256 => cost::SHA3,
        Balance | ExtCodeSize | ExtCodeCopy | ExtCodeHash => cost::EXT_ACCOUNT,
        BlockHash => cost::BLOCKHASH,
        SLoad => cost::SLOAD,
        Log(n) => cost::LOG + cost::LOG_TOPIC * n as u64,
        Create | Create2 => cost::CREATE,
        Call | CallCode | DelegateCall | StaticCall => cost::CALL,
        SelfDestruct => cost::SELFDESTRUCT,
    }
}

fn memory_word_cost(words: u64) -> u64 {
    cost::MEMORY * words + words * words / 512
}

/// Cost of growing memory from `current_words` to `new_words`.
pub fn memory_expansion(current_words: u64, new_words: u64) -> EvmResult<u64> {
    if new_words <= current_words {
        return Ok(0);
    }
    if new_words > cost::MAX_MEMORY_WORDS {
        return Err(EvmError::GasUintOverflow);
    }
    Ok(memory_word_cost(new_words) - memory_word_cost(current_words))
}

fn words(len: u64) -> u64 {
    len.div_ceil(32)
}

/// Per-word copy cost (CALLDATACOPY, CODECOPY, ...)
pub fn copy_gas(len: u64) -> u64 {
    cost::COPY * words(len)
}

/// Dynamic part of EXP: per significant exponent byte
pub fn exp_gas(exponent: U256) -> u64 {
    let bytes = (exponent.bits() as u64).div_ceil(8);
    cost::EXP_BYTE * bytes
}

/// Dynamic part of SHA3 and of CREATE2's init code hashing
pub fn sha3_gas(len: u64) -> u64 {
    cost::SHA3_WORD * words(len)
}

/// Dynamic part of LOGn: per data byte
pub fn log_data_gas(len: u64) -> EvmResult<u64> {
    len.checked_mul(cost::LOG_DATA).ok_or(EvmError::GasUintOverflow)
}

/// SSTORE cost and refund delta for writing `new` over `current`.
pub fn sstore_gas(current: H256, new: H256) -> (u64, u64) {
    if current == new {
        (cost::SLOAD, 0)
    } else if current.is_zero() {
        (cost::SSTORE_SET, 0)
    } else if new.is_zero() {
        (cost::SSTORE_RESET, cost::SSTORE_CLEAR_REFUND)
    } else {
        (cost::SSTORE_RESET, 0)
    }
}

/// Gas forwarded to a sub-call.
///
/// With the 63/64 rule the request is capped at `available - available / 64`;
/// without it the full request must be representable as u64.
pub fn call_gas(available: u64, requested: U256, all_but_one_64th: bool) -> EvmResult<u64> {
    if all_but_one_64th {
        let cap = available - available / 64;
        if requested.bits() > 64 || requested.low_u64() > cap {
            return Ok(cap);
        }
        return Ok(requested.low_u64());
    }
    if requested.bits() > 64 {
        return Err(EvmError::GasUintOverflow);
    }
    Ok(requested.low_u64())
}
