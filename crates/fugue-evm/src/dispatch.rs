//! Back-end selection
//!
//! Stored code may start with a one-byte selector naming the back end that
//! runs it. The set of back ends is closed; the interpreter is always
//! available and foreign back ends are registered up front in a
//! [`BackendRegistry`] shared by reference.

use crate::context::Environment;
use crate::contract::Contract;
use crate::error::{ConfigError, EvmResult};
use bytes::Bytes;
use fugue_primitives::H256;
use fugue_state::StateDb;
use std::fmt;
use std::sync::Arc;

/// Known execution back ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Built-in stack-machine interpreter
    Interpreter,
    /// WASM back end, supplied externally
    Wasm,
}

impl BackendKind {
    /// Every kind, in selector order
    pub const ALL: [BackendKind; 2] = [BackendKind::Interpreter, BackendKind::Wasm];

    /// Leading code byte naming this back end
    pub const fn selector(self) -> u8 {
        match self {
            BackendKind::Interpreter => 0x01,
            BackendKind::Wasm => 0x02,
        }
    }

    /// Kind named by `byte`, if any
    pub fn from_selector(byte: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.selector() == byte)
    }
}

/// Operation handed to a back end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// CALL
    Call,
    /// CALLCODE
    CallCode,
    /// DELEGATECALL
    DelegateCall,
    /// STATICCALL
    StaticCall,
    /// CREATE
    Create,
    /// CREATE2 with its salt
    Create2 {
        /// Address salt
        salt: H256,
    },
}

/// Code resolved to a back end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Back end that runs the code
    pub kind: BackendKind,
    /// Code with any selector byte removed
    pub code: Bytes,
    /// Whether a selector byte was removed
    pub stripped: bool,
}

/// Resolve `code` to a back end.
///
/// Without multi-back-end mode, or when the first byte names no known back
/// end, the whole blob goes to the interpreter untouched. Empty code goes to
/// the interpreter as a no-op.
pub fn select(code: &Bytes, multi_backend: bool) -> Selection {
    let selected = code
        .first()
        .filter(|_| multi_backend)
        .and_then(|byte| BackendKind::from_selector(*byte));
    match selected {
        Some(kind) => Selection {
            kind,
            code: code.slice(1..),
            stripped: true,
        },
        None => Selection {
            kind: BackendKind::Interpreter,
            code: code.clone(),
            stripped: false,
        },
    }
}

/// An execution back end other than the built-in interpreter.
pub trait ForeignBackend: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &str;

    /// Registration precondition, e.g. presence of a metering contract
    fn validate(&self) -> Result<(), String>;

    /// Run `contract` (code already stripped) for `operation`. On success
    /// the output is returned; gas left is read back from `contract.gas`.
    fn execute(
        &self,
        operation: &Operation,
        contract: &mut Contract,
        state: &mut dyn StateDb,
        env: &Environment,
    ) -> EvmResult<Bytes>;
}

/// Handlers for the foreign back ends, built once and shared via `Arc`.
#[derive(Default, Clone)]
pub struct BackendRegistry {
    wasm: Option<Arc<dyn ForeignBackend>>,
}

impl BackendRegistry {
    /// Registry with only the interpreter
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `backend` for `kind` after validating it.
    pub fn register(
        &mut self,
        kind: BackendKind,
        backend: Arc<dyn ForeignBackend>,
    ) -> Result<(), ConfigError> {
        backend
            .validate()
            .map_err(|reason| ConfigError::Backend(format!("{}: {}", backend.name(), reason)))?;
        match kind {
            BackendKind::Interpreter => Err(ConfigError::Backend(
                "the interpreter back end is built in".into(),
            )),
            BackendKind::Wasm => {
                tracing::debug!(backend = backend.name(), "registered wasm back end");
                self.wasm = Some(backend);
                Ok(())
            }
        }
    }

    /// Handler for a foreign `kind`; `None` for the interpreter or when
    /// nothing is registered.
    pub fn handler(&self, kind: BackendKind) -> Option<&Arc<dyn ForeignBackend>> {
        match kind {
            BackendKind::Interpreter => None,
            BackendKind::Wasm => self.wasm.as_ref(),
        }
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("wasm", &self.wasm.as_ref().map(|b| b.name().to_string()))
            .finish()
    }
}
