//! Interpreter loop
//!
//! Each step decodes the opcode at the program counter, validates the stack
//! shape, charges static gas, prices and performs any memory expansion, then
//! runs the handler. Handlers never grow memory themselves.

use crate::arithmetic::{self, from_bool, signed_cmp};
use crate::context::lookup_block_hash;
use crate::contract::Contract;
use crate::error::{EvmError, EvmResult, ExitStatus};
use crate::evm::Evm;
use crate::gas::{self, cost};
use crate::memory::Memory;
use crate::memory_cost;
use crate::opcode::Opcode;
use crate::stack::Stack;
use bytes::Bytes;
use fugue_crypto::keccak256;
use fugue_primitives::{Address, H256, U256};
use fugue_state::{Log, StateDb};
use std::cmp::Ordering;
use tracing::trace;

/// What the loop does after a handler
enum Control {
    Continue,
    Jump(usize),
    Stop(Bytes),
}

/// Narrow a word to a size or offset.
fn as_usize(value: U256) -> EvmResult<usize> {
    if value.bits() > 64 {
        return Err(EvmError::GasUintOverflow);
    }
    usize::try_from(value.low_u64()).map_err(|_| EvmError::GasUintOverflow)
}

/// Offset and length of a memory range; offset is ignored when empty.
fn mem_range(offset: U256, len: U256) -> EvmResult<(usize, usize)> {
    if len.is_zero() {
        return Ok((0, 0));
    }
    Ok((as_usize(offset)?, as_usize(len)?))
}

/// A single frame executing on the interpreter
pub(crate) struct Interpreter<'a, 's, S: StateDb> {
    evm: &'a mut Evm<'s, S>,
    contract: Contract,
    stack: Stack,
    memory: Memory,
    return_data: Bytes,
    pc: usize,
}

impl<'a, 's, S: StateDb> Interpreter<'a, 's, S> {
    pub(crate) fn new(evm: &'a mut Evm<'s, S>, contract: Contract) -> Self {
        Self {
            evm,
            contract,
            stack: Stack::new(),
            memory: Memory::new(),
            return_data: Bytes::new(),
            pc: 0,
        }
    }

    /// Run to completion, returning the frame result and unused gas.
    pub(crate) fn run(mut self) -> (EvmResult<Bytes>, u64) {
        trace!(address = %self.contract.address, depth = self.evm.depth, gas = self.contract.gas, "frame start");
        let result = loop {
            if self.evm.aborted() {
                break Err(EvmError::Aborted);
            }
            match self.step() {
                Ok(None) => {}
                Ok(Some(output)) => break Ok(output),
                Err(err) => break Err(err),
            }
        };
        self.evm.scratch().reclaim(self.stack.drain());
        trace!(address = %self.contract.address, pc = self.pc, gas_left = self.contract.gas, "frame stop");
        (result, self.contract.gas)
    }

    fn step(&mut self) -> EvmResult<Option<Bytes>> {
        let op = self.contract.op_at(self.pc).map_err(EvmError::InvalidOpcode)?;
        if !self.evm.config.rules.is_enabled(op) {
            let byte = self.contract.code.get(self.pc).copied().unwrap_or_default();
            return Err(EvmError::InvalidOpcode(byte));
        }

        let (pops, pushes) = op.stack_io();
        self.stack.require(pops, pushes)?;

        if self.evm.read_only
            && (op.is_state_write() || (op == Opcode::Call && !self.stack.peek(2)?.is_zero()))
        {
            return Err(EvmError::WriteProtection);
        }

        self.contract.use_gas(gas::static_gas(op))?;

        if let Some(words) = memory_cost::required_words(op, &self.stack)? {
            let expansion = gas::memory_expansion(self.memory.words(), words)?;
            self.contract.use_gas(expansion)?;
            self.memory.resize(words);
        }

        match self.execute(op)? {
            Control::Continue => self.pc += 1 + op.immediate_size(),
            Control::Jump(dest) => self.pc = dest,
            Control::Stop(output) => return Ok(Some(output)),
        }
        Ok(None)
    }

    fn pop(&mut self) -> EvmResult<U256> {
        self.stack.pop()
    }

    fn pop_address(&mut self) -> EvmResult<Address> {
        Ok(Address::from_word(self.stack.pop()?))
    }

    fn push(&mut self, value: U256) -> EvmResult<Control> {
        self.stack.push(value)?;
        Ok(Control::Continue)
    }

    fn binary(&mut self, f: impl FnOnce(U256, U256) -> U256) -> EvmResult<Control> {
        let a = self.pop()?;
        let b = self.pop()?;
        self.push(f(a, b))
    }

    fn unary(&mut self, f: impl FnOnce(U256) -> U256) -> EvmResult<Control> {
        let a = self.pop()?;
        self.push(f(a))
    }

    fn state(&mut self) -> &mut S {
        self.evm.state_mut()
    }

    fn execute(&mut self, op: Opcode) -> EvmResult<Control> {
        use Opcode::*;
        match op {
            Stop => Ok(Control::Stop(Bytes::new())),

            Add => self.binary(arithmetic::add),
            Mul => self.binary(arithmetic::mul),
            Sub => self.binary(arithmetic::sub),
            Div => self.binary(arithmetic::div),
            SDiv => self.binary(arithmetic::sdiv),
            Mod => self.binary(arithmetic::rem),
            SMod => self.binary(arithmetic::smod),
            AddMod => {
                let a = self.pop()?;
                let b = self.pop()?;
                let n = self.pop()?;
                self.push(arithmetic::addmod(a, b, n))
            }
            MulMod => {
                let a = self.pop()?;
                let b = self.pop()?;
                let n = self.pop()?;
                self.push(arithmetic::mulmod(a, b, n))
            }
            Exp => {
                let base = self.pop()?;
                let exponent = self.pop()?;
                self.contract.use_gas(gas::exp_gas(exponent))?;
                self.push(arithmetic::exp(base, exponent))
            }
            SignExtend => self.binary(arithmetic::signextend),

            Lt => self.binary(|a, b| from_bool(a < b)),
            Gt => self.binary(|a, b| from_bool(a > b)),
            SLt => self.binary(|a, b| from_bool(signed_cmp(a, b) == Ordering::Less)),
            SGt => self.binary(|a, b| from_bool(signed_cmp(a, b) == Ordering::Greater)),
            Eq => self.binary(|a, b| from_bool(a == b)),
            IsZero => self.unary(|a| from_bool(a.is_zero())),
            And => self.binary(|a, b| a & b),
            Or => self.binary(|a, b| a | b),
            Xor => self.binary(|a, b| a ^ b),
            Not => self.unary(|a| !a),
            Byte => self.binary(arithmetic::byte),
            Shl => self.binary(arithmetic::shl),
            Shr => self.binary(arithmetic::shr),
            Sar => self.binary(arithmetic::sar),

            Keccak256 => {
                let (offset, len) = mem_range(self.pop()?, self.pop()?)?;
                self.contract.use_gas(gas::sha3_gas(len as u64))?;
                let hash = keccak256(self.memory.slice(offset, len)?);
                self.push(hash.to_word())
            }

            Address => self.push(self.contract.address.to_word()),
            Balance => {
                let address = self.pop_address()?;
                let balance = self.state().balance(&address);
                self.push(balance)
            }
            Origin => self.push(self.evm.env.tx.origin.to_word()),
            Caller => self.push(self.contract.caller.to_word()),
            CallValue => self.push(self.contract.value),
            CallDataLoad => {
                let offset = self.pop()?;
                let mut word = [0u8; 32];
                if offset.bits() <= 64 {
                    let start = (offset.low_u64() as usize).min(self.contract.input.len());
                    let end = start.saturating_add(32).min(self.contract.input.len());
                    word[..end - start].copy_from_slice(&self.contract.input[start..end]);
                }
                self.push(U256::from_big_endian(&word))
            }
            CallDataSize => self.push(U256::from(self.contract.input.len())),
            CallDataCopy => {
                let input = self.contract.input.clone();
                self.copy_padded(&input)
            }
            CodeSize => self.push(U256::from(self.contract.code.len())),
            CodeCopy => {
                let code = self.contract.code.clone();
                self.copy_padded(&code)
            }
            GasPrice => self.push(self.evm.env.tx.gas_price),
            ExtCodeSize => {
                let address = self.pop_address()?;
                let size = self.state().code_size(&address);
                self.push(U256::from(size))
            }
            ExtCodeCopy => {
                let address = self.pop_address()?;
                let code = self.state().code(&address);
                self.copy_padded(&code)
            }
            ReturnDataSize => self.push(U256::from(self.return_data.len())),
            ReturnDataCopy => {
                let dest = self.pop()?;
                let src = self.pop()?;
                let len = self.pop()?;
                let end = src
                    .checked_add(len)
                    .filter(|end| *end <= U256::from(self.return_data.len()))
                    .ok_or(EvmError::ReturnDataOutOfBounds)?;
                let (dest, len) = mem_range(dest, len)?;
                self.contract.use_gas(gas::copy_gas(len as u64))?;
                let start = end.low_u64() as usize - len;
                self.memory
                    .set(dest, &self.return_data[start..start + len])?;
                Ok(Control::Continue)
            }
            ExtCodeHash => {
                let address = self.pop_address()?;
                let hash = if self.state().is_empty(&address) {
                    H256::ZERO
                } else {
                    self.state().code_hash(&address)
                };
                self.push(hash.to_word())
            }

            BlockHash => {
                let requested = self.pop()?;
                let hash = lookup_block_hash(
                    self.evm.block_hashes.as_deref(),
                    self.evm.env.block.number,
                    requested,
                );
                self.push(hash.to_word())
            }
            Coinbase => self.push(self.evm.env.block.coinbase.to_word()),
            Timestamp => self.push(U256::from(self.evm.env.block.timestamp)),
            Number => self.push(U256::from(self.evm.env.block.number)),
            PrevRandao => self.push(self.evm.env.block.prevrandao.to_word()),
            GasLimit => self.push(U256::from(self.evm.env.block.gas_limit)),
            ChainId => self.push(U256::from(self.evm.env.block.chain_id)),
            SelfBalance => {
                let address = self.contract.address;
                let balance = self.state().balance(&address);
                self.push(balance)
            }
            BaseFee => self.push(self.evm.env.block.base_fee),

            Pop => {
                let value = self.pop()?;
                self.evm.scratch().put(value);
                Ok(Control::Continue)
            }
            MLoad => {
                let offset = as_usize(self.pop()?)?;
                let word = self.memory.word(offset)?;
                self.push(word)
            }
            MStore => {
                let offset = as_usize(self.pop()?)?;
                let value = self.pop()?;
                self.memory.set_word(offset, value)?;
                Ok(Control::Continue)
            }
            MStore8 => {
                let offset = as_usize(self.pop()?)?;
                let value = self.pop()?;
                self.memory.set_byte(offset, value.low_u64() as u8)?;
                Ok(Control::Continue)
            }
            SLoad => {
                let key = H256::from_word(self.pop()?);
                let address = self.contract.address;
                let value = self.state().storage(&address, &key);
                self.push(value.to_word())
            }
            SStore => self.sstore(),
            Jump => {
                let dest = self.pop()?;
                self.jump(dest)
            }
            JumpI => {
                let dest = self.pop()?;
                let condition = self.pop()?;
                if condition.is_zero() {
                    Ok(Control::Continue)
                } else {
                    self.jump(dest)
                }
            }
            Pc => self.push(U256::from(self.pc)),
            MSize => self.push(U256::from(self.memory.len())),
            Gas => self.push(U256::from(self.contract.gas)),
            JumpDest => Ok(Control::Continue),

            Push(0) => self.push(U256::zero()),
            Push(n) => {
                let n = n as usize;
                let start = (self.pc + 1).min(self.contract.code.len());
                let end = (self.pc + 1 + n).min(self.contract.code.len());
                // Missing trailing immediates read as zero
                let mut buf = [0u8; 32];
                buf[32 - n..32 - n + (end - start)].copy_from_slice(&self.contract.code[start..end]);
                let slot = self.evm.scratch().get_zeroed();
                self.push(slot | U256::from_big_endian(&buf))
            }
            Dup(n) => {
                self.stack.dup(n as usize)?;
                Ok(Control::Continue)
            }
            Swap(n) => {
                self.stack.swap(n as usize)?;
                Ok(Control::Continue)
            }
            Log(n) => self.log(n as usize),

            Create => self.create(false),
            Create2 => self.create(true),
            Call | CallCode | DelegateCall | StaticCall => self.call(op),
            Return => {
                let (offset, len) = mem_range(self.pop()?, self.pop()?)?;
                Ok(Control::Stop(Bytes::copy_from_slice(self.memory.slice(offset, len)?)))
            }
            Revert => {
                let (offset, len) = mem_range(self.pop()?, self.pop()?)?;
                let output = Bytes::copy_from_slice(self.memory.slice(offset, len)?);
                Err(EvmError::Revert(output))
            }
            Invalid => Err(EvmError::InvalidOpcode(0xfe)),
            SelfDestruct => self.selfdestruct(),
        }
    }

    /// CALLDATACOPY / CODECOPY / EXTCODECOPY body: `dest, src, len` on top.
    fn copy_padded(&mut self, src: &[u8]) -> EvmResult<Control> {
        let dest = self.pop()?;
        let src_offset = self.pop()?;
        let len = self.pop()?;
        let (dest, len) = mem_range(dest, len)?;
        self.contract.use_gas(gas::copy_gas(len as u64))?;
        self.memory.set_padded(dest, src, src_offset, len)?;
        Ok(Control::Continue)
    }

    fn jump(&mut self, dest: U256) -> EvmResult<Control> {
        if !self.contract.valid_jump(dest, &self.evm.jumpdests) {
            return Err(EvmError::InvalidJump(dest));
        }
        Ok(Control::Jump(dest.low_u64() as usize))
    }

    fn sstore(&mut self) -> EvmResult<Control> {
        if self.evm.config.rules.istanbul && self.contract.gas <= cost::CALL_STIPEND {
            return Err(EvmError::OutOfGas);
        }
        let key = H256::from_word(self.pop()?);
        let value = H256::from_word(self.pop()?);
        let address = self.contract.address;

        let current = self.state().storage(&address, &key);
        let (charge, refund) = gas::sstore_gas(current, value);
        self.contract.use_gas(charge)?;
        if refund > 0 {
            self.state().add_refund(refund);
        }
        self.state().set_storage(&address, key, value);
        Ok(Control::Continue)
    }

    fn log(&mut self, topics: usize) -> EvmResult<Control> {
        let (offset, len) = mem_range(self.pop()?, self.pop()?)?;
        let topics = (0..topics)
            .map(|_| self.pop().map(H256::from_word))
            .collect::<EvmResult<Vec<_>>>()?;
        self.contract.use_gas(gas::log_data_gas(len as u64)?)?;

        let log = Log {
            address: self.contract.address,
            topics,
            data: Bytes::copy_from_slice(self.memory.slice(offset, len)?),
        };
        self.state().add_log(log);
        Ok(Control::Continue)
    }

    fn selfdestruct(&mut self) -> EvmResult<Control> {
        let beneficiary = self.pop_address()?;
        let address = self.contract.address;
        let balance = self.state().balance(&address);
        let rules = self.evm.config.rules;

        if rules.eip150 {
            let new_account = if rules.eip158 {
                self.state().is_empty(&beneficiary) && !balance.is_zero()
            } else {
                !self.state().exists(&beneficiary)
            };
            if new_account {
                self.contract.use_gas(cost::CALL_NEW_ACCOUNT)?;
            }
        }
        if !rules.london && !self.state().has_suicided(&address) {
            self.state().add_refund(cost::SELFDESTRUCT_REFUND);
        }

        self.state().add_balance(&beneficiary, balance);
        self.state().suicide(&address);
        Ok(Control::Stop(Bytes::new()))
    }

    fn create(&mut self, salted: bool) -> EvmResult<Control> {
        let value = self.pop()?;
        let (offset, len) = mem_range(self.pop()?, self.pop()?)?;
        let salt = if salted {
            let salt = H256::from_word(self.pop()?);
            self.contract.use_gas(gas::sha3_gas(len as u64))?;
            Some(salt)
        } else {
            None
        };
        let init_code = Bytes::copy_from_slice(self.memory.slice(offset, len)?);

        let mut forwarded = self.contract.gas;
        if self.evm.config.rules.eip150 {
            forwarded -= forwarded / 64;
        }
        self.contract.use_gas(forwarded)?;

        let caller = self.contract.address;
        let (result, address) = match salt {
            Some(salt) => self.evm.create2(caller, init_code, forwarded, value, salt),
            None => self.evm.create(caller, init_code, forwarded, value),
        };

        let created = match &result.status {
            ExitStatus::Success => true,
            ExitStatus::Failed(EvmError::CodeStoreOutOfGas) => !self.evm.config.rules.homestead,
            _ => false,
        };
        self.stack
            .push(if created { address.to_word() } else { U256::zero() })?;
        self.contract.refund_gas(result.gas_left);
        self.return_data = if result.is_revert() {
            result.output
        } else {
            Bytes::new()
        };
        Ok(Control::Continue)
    }

    fn call(&mut self, op: Opcode) -> EvmResult<Control> {
        let requested = self.pop()?;
        let to = self.pop_address()?;
        let value = match op {
            Opcode::Call | Opcode::CallCode => self.pop()?,
            _ => U256::zero(),
        };
        let (in_offset, in_len) = mem_range(self.pop()?, self.pop()?)?;
        let (out_offset, out_len) = mem_range(self.pop()?, self.pop()?)?;
        let rules = self.evm.config.rules;

        let mut extra = 0;
        if !value.is_zero() {
            extra += cost::CALL_VALUE;
        }
        if op == Opcode::Call {
            let new_account = if rules.eip158 {
                !value.is_zero() && self.state().is_empty(&to)
            } else {
                !self.state().exists(&to)
            };
            if new_account {
                extra += cost::CALL_NEW_ACCOUNT;
            }
        }
        self.contract.use_gas(extra)?;

        let mut forwarded = gas::call_gas(self.contract.gas, requested, rules.eip150)?;
        self.contract.use_gas(forwarded)?;
        if !value.is_zero() {
            forwarded += cost::CALL_STIPEND;
        }

        let input = Bytes::copy_from_slice(self.memory.slice(in_offset, in_len)?);
        let me = self.contract.address;
        let result = match op {
            Opcode::Call => self.evm.call(me, to, input, forwarded, value),
            Opcode::CallCode => self.evm.call_code(me, to, input, forwarded, value),
            Opcode::DelegateCall => {
                let scope = self.contract.scope();
                self.evm.delegate_call(&scope, to, input, forwarded)
            }
            _ => self.evm.static_call(me, to, input, forwarded),
        };

        if result.is_success() || result.is_revert() {
            let copied = out_len.min(result.output.len());
            self.memory.set(out_offset, &result.output[..copied])?;
        }
        self.stack.push(from_bool(result.is_success()))?;
        self.contract.refund_gas(result.gas_left);
        self.return_data = result.output;
        Ok(Control::Continue)
    }
}
