//! Contract frame: code, input and gas of one call or create

use crate::analysis::{JumpDestCache, JumpDests};
use crate::error::{EvmError, EvmResult};
use crate::opcode::{Opcode, JUMPDEST};
use bytes::Bytes;
use fugue_primitives::{Address, H256, U256};
use std::sync::Arc;

/// Caller identity forwarded by DELEGATECALL
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scope {
    /// Caller of the frame
    pub caller: Address,
    /// Address whose storage and balance the frame acts on
    pub address: Address,
    /// Value the frame was called with
    pub value: U256,
}

/// Execution state of one frame
#[derive(Clone, Debug)]
pub struct Contract {
    /// Caller of this frame
    pub caller: Address,
    /// Account acting as "self" for storage and balance
    pub address: Address,
    /// Account the code was loaded from
    pub code_address: Address,
    /// Value carried by the call
    pub value: U256,
    /// Call data
    pub input: Bytes,
    /// Code to run (selector byte already stripped)
    pub code: Bytes,
    /// Hash keying the shared jump cache. `None` for init code and
    /// stripped code, which get a frame-local analysis.
    pub code_hash: Option<H256>,
    /// Gas remaining
    pub gas: u64,
    jumpdests: Option<Arc<JumpDests>>,
}

impl Contract {
    /// Build a frame
    pub fn new(
        caller: Address,
        address: Address,
        value: U256,
        gas: u64,
        code: Bytes,
        code_hash: Option<H256>,
    ) -> Self {
        Self {
            caller,
            address,
            code_address: address,
            value,
            input: Bytes::new(),
            code,
            code_hash,
            gas,
            jumpdests: None,
        }
    }

    /// Set the call data
    pub fn with_input(mut self, input: Bytes) -> Self {
        self.input = input;
        self
    }

    /// Load code from a different account than `address`
    pub fn with_code_address(mut self, code_address: Address) -> Self {
        self.code_address = code_address;
        self
    }

    /// Deduct `amount`, failing with [`EvmError::OutOfGas`] if short
    pub fn use_gas(&mut self, amount: u64) -> EvmResult<()> {
        if self.gas < amount {
            return Err(EvmError::OutOfGas);
        }
        self.gas -= amount;
        Ok(())
    }

    /// Return unused gas from a sub-call
    pub fn refund_gas(&mut self, amount: u64) {
        self.gas = self.gas.saturating_add(amount);
    }

    /// Decoded opcode at `pc`; past the end of code reads as STOP.
    pub fn op_at(&self, pc: usize) -> Result<Opcode, u8> {
        match self.code.get(pc) {
            None => Ok(Opcode::Stop),
            Some(byte) => Opcode::from_byte(*byte).ok_or(*byte),
        }
    }

    /// Identity this frame passes on to a DELEGATECALL
    pub fn scope(&self) -> Scope {
        Scope {
            caller: self.caller,
            address: self.address,
            value: self.value,
        }
    }

    /// Whether `dest` is a JUMPDEST on an instruction boundary.
    pub fn valid_jump(&mut self, dest: U256, cache: &JumpDestCache) -> bool {
        if dest.bits() > 63 {
            return false;
        }
        let dest = dest.low_u64() as usize;
        if dest >= self.code.len() || self.code[dest] != JUMPDEST {
            return false;
        }
        self.analysis(cache).is_valid(dest)
    }

    fn analysis(&mut self, cache: &JumpDestCache) -> &JumpDests {
        let code = &self.code;
        let hash = self.code_hash;
        self.jumpdests.get_or_insert_with(|| match hash {
            Some(hash) => cache.get_or_analyze(hash, code),
            None => Arc::new(JumpDests::analyze(code)),
        })
    }
}
