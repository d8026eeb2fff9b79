//! EVM error and outcome types

use bytes::Bytes;
use fugue_primitives::U256;
use thiserror::Error;

/// Reasons a frame or a call/create operation can stop abnormally
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvmError {
    /// Call depth limit exceeded
    #[error("max call depth exceeded")]
    DepthExceeded,

    /// Caller cannot afford the transferred value
    #[error("insufficient balance for transfer")]
    InsufficientBalance,

    /// Created contract address already in use
    #[error("contract address collision")]
    AddressCollision,

    /// Out of gas
    #[error("out of gas")]
    OutOfGas,

    /// Not enough gas left to store the deployed code
    #[error("contract creation code storage out of gas")]
    CodeStoreOutOfGas,

    /// Deployed code larger than the configured limit
    #[error("max code size exceeded")]
    MaxCodeSizeExceeded,

    /// REVERT executed; carries the revert payload
    #[error("execution reverted")]
    Revert(Bytes),

    /// Jump to an offset that is not a JUMPDEST
    #[error("invalid jump destination: {0}")]
    InvalidJump(U256),

    /// Stack underflow
    #[error("stack underflow")]
    StackUnderflow,

    /// Stack overflow (more than 1024 items)
    #[error("stack overflow")]
    StackOverflow,

    /// Undefined or fork-disabled opcode
    #[error("invalid opcode: 0x{0:02x}")]
    InvalidOpcode(u8),

    /// State modification attempted in a static frame
    #[error("write protection")]
    WriteProtection,

    /// RETURNDATACOPY past the end of the return buffer
    #[error("return data out of bounds")]
    ReturnDataOutOfBounds,

    /// Operand too large to be a size, offset or gas amount
    #[error("gas uint64 overflow")]
    GasUintOverflow,

    /// Memory access outside the expanded region
    #[error("invalid memory access")]
    InvalidMemoryAccess,

    /// Code selected a back end with no registered handler
    #[error("no compatible back end for selector 0x{0:02x}")]
    NoCompatibleBackend(u8),

    /// Abort flag raised by the embedder
    #[error("execution aborted")]
    Aborted,

    /// Precompiled contract failure
    #[error("precompile error: {0}")]
    Precompile(String),
}

/// Result type for EVM operations
pub type EvmResult<T> = Result<T, EvmError>;

/// Configuration and registration errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Malformed configuration document
    #[error("config parse error: {0}")]
    Parse(String),

    /// Semantically invalid value
    #[error("invalid config: {0}")]
    Invalid(String),

    /// A back end failed its registration precondition
    #[error("back end unavailable: {0}")]
    Backend(String),
}

/// How a call or create finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitStatus {
    /// Normal completion
    Success,
    /// REVERT; output holds the reason and unused gas is returned
    Reverted,
    /// Any other error
    Failed(EvmError),
}

/// Outcome of a call or create operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Completion status
    pub status: ExitStatus,
    /// Returned (or revert) data
    pub output: Bytes,
    /// Gas handed back to the caller
    pub gas_left: u64,
}

impl ExecutionResult {
    /// Successful completion
    pub fn success(output: Bytes, gas_left: u64) -> Self {
        Self {
            status: ExitStatus::Success,
            output,
            gas_left,
        }
    }

    /// Explicit revert
    pub fn revert(output: Bytes, gas_left: u64) -> Self {
        Self {
            status: ExitStatus::Reverted,
            output,
            gas_left,
        }
    }

    /// Failure that consumed every unit of gas
    pub fn failure(error: EvmError) -> Self {
        Self::rejected(error, 0)
    }

    /// Failure that hands `gas_left` back, used by precondition checks
    /// that fire before any gas is spent.
    pub fn rejected(error: EvmError, gas_left: u64) -> Self {
        Self {
            status: ExitStatus::Failed(error),
            output: Bytes::new(),
            gas_left,
        }
    }

    /// Check if execution succeeded
    pub fn is_success(&self) -> bool {
        self.status == ExitStatus::Success
    }

    /// Check if execution reverted
    pub fn is_revert(&self) -> bool {
        self.status == ExitStatus::Reverted
    }

    /// The error, if the operation failed outright
    pub fn error(&self) -> Option<&EvmError> {
        match &self.status {
            ExitStatus::Failed(err) => Some(err),
            _ => None,
        }
    }
}
