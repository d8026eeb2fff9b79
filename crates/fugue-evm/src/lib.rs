//! # fugue-evm
//!
//! Deterministic bytecode execution core.
//!
//! This crate provides:
//! - the call/create lifecycle with snapshot rollback ([`Evm`])
//! - a stack-machine interpreter with 256-bit wraparound arithmetic
//! - the memory-cost model and gas table
//! - a shared jump-destination cache and pooled scratch values
//! - back-end selection by a leading code byte
//!
//! ```no_run
//! use bytes::Bytes;
//! use fugue_evm::{Environment, Evm};
//! use fugue_primitives::{Address, U256};
//! use fugue_state::JournaledState;
//!
//! let mut state = JournaledState::new();
//! let mut evm = Evm::new(&mut state, Environment::default());
//! let result = evm.call(
//!     Address::from_low_u8(1),
//!     Address::from_low_u8(2),
//!     Bytes::new(),
//!     100_000,
//!     U256::zero(),
//! );
//! assert!(result.is_success());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod arithmetic;
pub mod config;
pub mod context;
pub mod contract;
pub mod dispatch;
pub mod error;
mod evm;
pub mod gas;
mod interpreter;
pub mod memory;
pub mod memory_cost;
pub mod opcode;
pub mod precompile;
pub mod scratch;
pub mod stack;
pub mod tracer;

pub use analysis::{JumpDestCache, JumpDests};
pub use config::{ChainRules, VmConfig};
pub use context::{BlockContext, BlockHashes, Environment, TxContext};
pub use contract::{Contract, Scope};
pub use dispatch::{BackendKind, BackendRegistry, ForeignBackend, Operation};
pub use error::{ConfigError, EvmError, EvmResult, ExecutionResult, ExitStatus};
pub use evm::Evm;
pub use opcode::Opcode;
pub use precompile::{Precompile, PrecompileSet};
pub use scratch::{PoolRegistry, ValuePool};
pub use tracer::Tracer;
