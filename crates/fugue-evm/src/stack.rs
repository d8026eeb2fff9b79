//! Operand stack

use crate::error::{EvmError, EvmResult};
use crate::gas::cost::MAX_STACK_SIZE;
use fugue_primitives::U256;

/// Operand stack of one frame (max 1024 words)
#[derive(Clone, Debug)]
pub struct Stack {
    data: Vec<U256>,
}

impl Stack {
    /// Create a new empty stack
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(MAX_STACK_SIZE),
        }
    }

    /// Fail before any mutation unless `pops` items are present and the
    /// net result stays within the size limit.
    pub fn require(&self, pops: usize, pushes: usize) -> EvmResult<()> {
        if self.data.len() < pops {
            return Err(EvmError::StackUnderflow);
        }
        if self.data.len() - pops + pushes > MAX_STACK_SIZE {
            return Err(EvmError::StackOverflow);
        }
        Ok(())
    }

    /// Push a value onto the stack
    pub fn push(&mut self, value: U256) -> EvmResult<()> {
        if self.data.len() >= MAX_STACK_SIZE {
            return Err(EvmError::StackOverflow);
        }
        self.data.push(value);
        Ok(())
    }

    /// Pop a value from the stack
    pub fn pop(&mut self) -> EvmResult<U256> {
        self.data.pop().ok_or(EvmError::StackUnderflow)
    }

    /// Item at `depth` (0 = top) without removing it
    pub fn peek(&self, depth: usize) -> EvmResult<U256> {
        if depth >= self.data.len() {
            return Err(EvmError::StackUnderflow);
        }
        Ok(self.data[self.data.len() - 1 - depth])
    }

    /// Swap top with item at `depth` (1 = second item)
    pub fn swap(&mut self, depth: usize) -> EvmResult<()> {
        let len = self.data.len();
        if depth == 0 || depth >= len {
            return Err(EvmError::StackUnderflow);
        }
        self.data.swap(len - 1, len - 1 - depth);
        Ok(())
    }

    /// Push a copy of the item at `depth` (1 = top)
    pub fn dup(&mut self, depth: usize) -> EvmResult<()> {
        if depth == 0 || depth > self.data.len() {
            return Err(EvmError::StackUnderflow);
        }
        let value = self.data[self.data.len() - depth];
        self.push(value)
    }

    /// Get current stack size
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if stack is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Remove every item, yielding them top first.
    pub fn drain(&mut self) -> impl Iterator<Item = U256> + '_ {
        self.data.drain(..).rev()
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}
