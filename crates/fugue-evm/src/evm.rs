//! Execution context: the call and create lifecycle
//!
//! Every public operation checks its preconditions, takes one state
//! snapshot, runs the target (precompile, interpreter or foreign back end)
//! and then settles: success keeps state, a revert restores the snapshot but
//! returns unused gas, and any other error restores the snapshot and
//! consumes the frame's whole gas budget.

use crate::analysis::JumpDestCache;
use crate::config::VmConfig;
use crate::context::{BlockHashes, Environment};
use crate::contract::{Contract, Scope};
use crate::dispatch::{select, BackendKind, BackendRegistry, Operation};
use crate::error::{EvmError, EvmResult, ExecutionResult, ExitStatus};
use crate::gas::cost;
use crate::interpreter::Interpreter;
use crate::precompile::{run_precompile, PrecompileSet};
use crate::scratch::{PoolRegistry, ValuePool};
use crate::tracer::Tracer;
use bytes::Bytes;
use fugue_crypto::{create2_address, create_address};
use fugue_primitives::{Address, H256, U256};
use fugue_state::{Snapshot, StateDb, EMPTY_CODE_HASH};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Remaining native stack below which a nested frame gets a fresh segment
const STACK_RED_ZONE: usize = 256 * 1024;

/// Size of each freshly allocated stack segment
const STACK_SEGMENT: usize = 4 * 1024 * 1024;

/// Executes calls and creates against a state store.
///
/// One `Evm` runs one top-level operation at a time; nested CALL/CREATE
/// instructions recurse through the same instance.
pub struct Evm<'s, S: StateDb> {
    pub(crate) state: &'s mut S,
    pub(crate) env: Environment,
    pub(crate) config: VmConfig,
    pub(crate) jumpdests: Arc<JumpDestCache>,
    pub(crate) block_hashes: Option<Arc<dyn BlockHashes>>,
    pub(crate) depth: usize,
    pub(crate) read_only: bool,
    precompiles: Arc<PrecompileSet>,
    backends: Arc<BackendRegistry>,
    pools: Option<Arc<PoolRegistry>>,
    scratch: Option<ValuePool>,
    abort: Arc<AtomicBool>,
    tracer: Option<Box<dyn Tracer + 's>>,
}

impl<'s, S: StateDb> Evm<'s, S> {
    /// Create an execution context over `state` with default configuration
    /// and the standard precompiles.
    pub fn new(state: &'s mut S, env: Environment) -> Self {
        Self {
            state,
            env,
            config: VmConfig::default(),
            jumpdests: Arc::new(JumpDestCache::new()),
            block_hashes: None,
            depth: 0,
            read_only: false,
            precompiles: Arc::new(PrecompileSet::standard()),
            backends: Arc::new(BackendRegistry::new()),
            pools: None,
            scratch: None,
            abort: Arc::new(AtomicBool::new(false)),
            tracer: None,
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: VmConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the precompile table
    pub fn with_precompiles(mut self, precompiles: Arc<PrecompileSet>) -> Self {
        self.precompiles = precompiles;
        self
    }

    /// Use a shared back-end registry
    pub fn with_backends(mut self, backends: Arc<BackendRegistry>) -> Self {
        self.backends = backends;
        self
    }

    /// Share a jump-destination cache with other contexts
    pub fn with_jump_cache(mut self, cache: Arc<JumpDestCache>) -> Self {
        self.jumpdests = cache;
        self
    }

    /// Borrow scratch pools from `pools` instead of allocating one. Borrowed
    /// pools are sized by [`VmConfig::scratch_capacity`].
    pub fn with_pool_registry(mut self, pools: Arc<PoolRegistry>) -> Self {
        self.pools = Some(pools);
        self
    }

    /// Install a tracer for top-level operations
    pub fn with_tracer(mut self, tracer: Box<dyn Tracer + 's>) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Source for BLOCKHASH
    pub fn with_block_hashes(mut self, hashes: Arc<dyn BlockHashes>) -> Self {
        self.block_hashes = Some(hashes);
        self
    }

    /// Flag that aborts execution at the next instruction boundary
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    /// Underlying state
    pub fn state(&self) -> &S {
        &*self.state
    }

    /// Underlying state, mutably
    pub fn state_mut(&mut self) -> &mut S {
        &mut *self.state
    }

    /// Active configuration
    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Current call depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Scratch pool, once the first frame has borrowed it
    pub fn scratch_pool(&mut self) -> Option<&mut ValuePool> {
        self.scratch.as_mut()
    }

    pub(crate) fn aborted(&self) -> bool {
        self.abort.load(Ordering::Relaxed)
    }

    pub(crate) fn scratch(&mut self) -> &mut ValuePool {
        let verify = self.config.verify_scratch;
        let capacity = self.config.scratch_capacity;
        let pools = &self.pools;
        self.scratch.get_or_insert_with(|| match pools {
            Some(pools) => pools.borrow(capacity, verify),
            None => ValuePool::new(capacity, verify),
        })
    }

    /// Run `to`'s code with `value` transferred from `caller`.
    pub fn call(
        &mut self,
        caller: Address,
        to: Address,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> ExecutionResult {
        let started = self.trace_start(caller, to, false, &input, gas, value);
        let result = self.call_inner(caller, to, input, gas, value);
        self.trace_end(started, gas, &result);
        result
    }

    fn call_inner(
        &mut self,
        caller: Address,
        to: Address,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> ExecutionResult {
        if let Err(err) = self.check_preconditions(caller, value) {
            return ExecutionResult::rejected(err, gas);
        }
        debug!(%caller, %to, gas, %value, depth = self.depth, "call");

        if !self.state.exists(&to) {
            let precompile = self.precompiles.contains(&to);
            if !precompile && self.config.rules.eip158 && value.is_zero() {
                return ExecutionResult::success(Bytes::new(), gas);
            }
        }
        let snapshot = self.state.snapshot();
        if !self.state.exists(&to) {
            self.state.create_account(to);
        }
        self.transfer(caller, to, value);

        let (contract, kind) = self.load(caller, to, to, value, gas, input);
        let (result, gas_left) = self.run(contract, kind, Operation::Call);
        self.settle(snapshot, result, gas_left)
    }

    /// Run `to`'s code in the context of `caller` (CALLCODE).
    pub fn call_code(
        &mut self,
        caller: Address,
        to: Address,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> ExecutionResult {
        let started = self.trace_start(caller, to, false, &input, gas, value);
        let result = match self.check_preconditions(caller, value) {
            Err(err) => ExecutionResult::rejected(err, gas),
            Ok(()) => {
                debug!(%caller, %to, gas, depth = self.depth, "callcode");
                let snapshot = self.state.snapshot();
                let (contract, kind) = self.load(caller, caller, to, value, gas, input);
                let (result, gas_left) = self.run(contract, kind, Operation::CallCode);
                self.settle(snapshot, result, gas_left)
            }
        };
        self.trace_end(started, gas, &result);
        result
    }

    /// Run `to`'s code on behalf of the frame described by `scope`, keeping
    /// its caller and value (DELEGATECALL).
    pub fn delegate_call(
        &mut self,
        scope: &Scope,
        to: Address,
        input: Bytes,
        gas: u64,
    ) -> ExecutionResult {
        let started = self.trace_start(scope.address, to, false, &input, gas, U256::zero());
        let result = match self.check_preconditions(scope.address, U256::zero()) {
            Err(err) => ExecutionResult::rejected(err, gas),
            Ok(()) => {
                debug!(address = %scope.address, %to, gas, depth = self.depth, "delegatecall");
                let snapshot = self.state.snapshot();
                let (contract, kind) =
                    self.load(scope.caller, scope.address, to, scope.value, gas, input);
                let (result, gas_left) = self.run(contract, kind, Operation::DelegateCall);
                self.settle(snapshot, result, gas_left)
            }
        };
        self.trace_end(started, gas, &result);
        result
    }

    /// Run `to`'s code with state modification forbidden (STATICCALL).
    pub fn static_call(
        &mut self,
        caller: Address,
        to: Address,
        input: Bytes,
        gas: u64,
    ) -> ExecutionResult {
        let started = self.trace_start(caller, to, false, &input, gas, U256::zero());
        let result = match self.check_preconditions(caller, U256::zero()) {
            Err(err) => ExecutionResult::rejected(err, gas),
            Ok(()) => {
                debug!(%caller, %to, gas, depth = self.depth, "staticcall");
                let snapshot = self.state.snapshot();
                self.state.add_balance(&to, U256::zero());

                let (contract, kind) = self.load(caller, to, to, U256::zero(), gas, input);
                let was_read_only = std::mem::replace(&mut self.read_only, true);
                let (result, gas_left) = self.run(contract, kind, Operation::StaticCall);
                self.read_only = was_read_only;
                self.settle(snapshot, result, gas_left)
            }
        };
        self.trace_end(started, gas, &result);
        result
    }

    /// Deploy `init_code` at the address derived from `caller` and its nonce.
    pub fn create(
        &mut self,
        caller: Address,
        init_code: Bytes,
        gas: u64,
        value: U256,
    ) -> (ExecutionResult, Address) {
        let address = create_address(&caller, self.state.nonce(&caller));
        self.create_traced(caller, init_code, gas, value, address, Operation::Create)
    }

    /// Deploy `init_code` at the address derived from `caller`, `salt` and
    /// the init code hash.
    pub fn create2(
        &mut self,
        caller: Address,
        init_code: Bytes,
        gas: u64,
        value: U256,
        salt: H256,
    ) -> (ExecutionResult, Address) {
        let address = create2_address(&caller, &salt, &init_code);
        self.create_traced(caller, init_code, gas, value, address, Operation::Create2 { salt })
    }

    fn create_traced(
        &mut self,
        caller: Address,
        init_code: Bytes,
        gas: u64,
        value: U256,
        address: Address,
        operation: Operation,
    ) -> (ExecutionResult, Address) {
        let started = self.trace_start(caller, address, true, &init_code, gas, value);
        let result = self.create_at(caller, init_code, gas, value, address, operation);
        self.trace_end(started, gas, &result);
        (result, address)
    }

    fn create_at(
        &mut self,
        caller: Address,
        init_code: Bytes,
        gas: u64,
        value: U256,
        address: Address,
        operation: Operation,
    ) -> ExecutionResult {
        if let Err(err) = self.check_preconditions(caller, value) {
            return ExecutionResult::rejected(err, gas);
        }
        debug!(%caller, %address, gas, %value, depth = self.depth, "create");

        let nonce = self.state.nonce(&caller);
        self.state.set_nonce(&caller, nonce.saturating_add(1));

        let existing = self.state.code_hash(&address);
        if self.state.nonce(&address) != 0 || (existing != H256::ZERO && existing != EMPTY_CODE_HASH)
        {
            return ExecutionResult::failure(EvmError::AddressCollision);
        }

        let snapshot = self.state.snapshot();
        self.state.create_account(address);
        if self.config.rules.eip158 {
            self.state.set_nonce(&address, 1);
        }
        self.transfer(caller, address, value);

        let selection = select(&init_code, self.config.multi_backend);
        let prefix = selection.stripped.then(|| selection.kind.selector());
        let contract = Contract::new(caller, address, value, gas, selection.code, None);
        let (result, mut gas_left) = self.run(contract, selection.kind, operation);

        let result = result.and_then(|code| self.deposit(address, code, prefix, &mut gas_left));
        match result {
            Err(EvmError::CodeStoreOutOfGas) if !self.config.rules.homestead => {
                ExecutionResult::rejected(EvmError::CodeStoreOutOfGas, gas_left)
            }
            result => self.settle(snapshot, result, gas_left),
        }
    }

    /// Charge for and store the code returned by init code.
    fn deposit(
        &mut self,
        address: Address,
        code: Bytes,
        prefix: Option<u8>,
        gas_left: &mut u64,
    ) -> EvmResult<Bytes> {
        if code.len() > self.config.max_code_size {
            return Err(EvmError::MaxCodeSizeExceeded);
        }
        let cost = cost::CREATE_DATA * code.len() as u64;
        if *gas_left < cost {
            return Err(EvmError::CodeStoreOutOfGas);
        }
        *gas_left -= cost;

        let stored = match prefix {
            Some(selector) => {
                let mut prefixed = Vec::with_capacity(code.len() + 1);
                prefixed.push(selector);
                prefixed.extend_from_slice(&code);
                Bytes::from(prefixed)
            }
            None => code.clone(),
        };
        self.state.set_code(&address, stored);
        Ok(code)
    }

    fn check_preconditions(&self, caller: Address, value: U256) -> EvmResult<()> {
        if self.depth > cost::MAX_CALL_DEPTH {
            return Err(EvmError::DepthExceeded);
        }
        if !value.is_zero() && self.state.balance(&caller) < value {
            return Err(EvmError::InsufficientBalance);
        }
        Ok(())
    }

    fn transfer(&mut self, from: Address, to: Address, value: U256) {
        if value.is_zero() {
            return;
        }
        self.state.sub_balance(&from, value);
        self.state.add_balance(&to, value);
    }

    /// Build a frame running `code_address`'s stored code as `address`.
    fn load(
        &self,
        caller: Address,
        address: Address,
        code_address: Address,
        value: U256,
        gas: u64,
        input: Bytes,
    ) -> (Contract, BackendKind) {
        let code = self.state.code(&code_address);
        let selection = select(&code, self.config.multi_backend);
        let code_hash = (!selection.stripped).then(|| self.state.code_hash(&code_address));
        let contract = Contract::new(caller, address, value, gas, selection.code, code_hash)
            .with_code_address(code_address)
            .with_input(input);
        (contract, selection.kind)
    }

    /// Run a frame and report its result and unused gas.
    fn run(
        &mut self,
        mut contract: Contract,
        kind: BackendKind,
        operation: Operation,
    ) -> (EvmResult<Bytes>, u64) {
        if let Some(precompile) = self.precompiles.get(&contract.code_address).cloned() {
            debug!(address = %contract.code_address, "precompile");
            return match run_precompile(precompile.as_ref(), &contract.input, contract.gas) {
                Ok((output, gas_left)) => (Ok(output), gas_left),
                Err(err) => (Err(err), 0),
            };
        }

        // Nested frames recurse through here; make sure the native stack
        // has room for one more before entering it.
        stacker::maybe_grow(STACK_RED_ZONE, STACK_SEGMENT, || {
            self.depth += 1;
            let outcome = match kind {
                BackendKind::Interpreter => Interpreter::new(self, contract).run(),
                foreign => self.run_foreign(foreign, &operation, &mut contract),
            };
            self.depth -= 1;
            outcome
        })
    }

    fn run_foreign(
        &mut self,
        kind: BackendKind,
        operation: &Operation,
        contract: &mut Contract,
    ) -> (EvmResult<Bytes>, u64) {
        match self.backends.handler(kind).cloned() {
            Some(backend) => {
                let result = backend.execute(operation, contract, &mut *self.state, &self.env);
                (result, contract.gas)
            }
            None => {
                warn!(selector = kind.selector(), "no handler for selected back end");
                (Err(EvmError::NoCompatibleBackend(kind.selector())), 0)
            }
        }
    }

    fn settle(
        &mut self,
        snapshot: Snapshot,
        result: EvmResult<Bytes>,
        gas_left: u64,
    ) -> ExecutionResult {
        match result {
            Ok(output) => ExecutionResult::success(output, gas_left),
            Err(EvmError::Revert(output)) => {
                debug!(depth = self.depth, "reverted, rolling back");
                self.state.revert_to_snapshot(snapshot);
                ExecutionResult::revert(output, gas_left)
            }
            Err(err) => {
                debug!(depth = self.depth, error = %err, "failed, rolling back");
                self.state.revert_to_snapshot(snapshot);
                ExecutionResult::failure(err)
            }
        }
    }

    fn trace_start(
        &mut self,
        from: Address,
        to: Address,
        create: bool,
        input: &[u8],
        gas: u64,
        value: U256,
    ) -> Option<Instant> {
        if self.depth != 0 {
            return None;
        }
        let tracer = self.tracer.as_mut()?;
        tracer.capture_start(from, to, create, input, gas, value);
        Some(Instant::now())
    }

    fn trace_end(&mut self, started: Option<Instant>, gas: u64, result: &ExecutionResult) {
        let (Some(started), Some(tracer)) = (started, self.tracer.as_mut()) else {
            return;
        };
        let error = match &result.status {
            ExitStatus::Success => None,
            ExitStatus::Reverted => Some(EvmError::Revert(result.output.clone())),
            ExitStatus::Failed(err) => Some(err.clone()),
        };
        tracer.capture_end(
            &result.output,
            gas.saturating_sub(result.gas_left),
            started.elapsed(),
            error.as_ref(),
        );
    }
}

impl<S: StateDb> Drop for Evm<'_, S> {
    fn drop(&mut self) {
        if let (Some(pool), Some(pools)) = (self.scratch.take(), &self.pools) {
            pools.give_back(pool);
        }
    }
}
