//! Outermost-call tracing hook

use crate::error::EvmError;
use fugue_primitives::{Address, U256};
use std::time::Duration;

/// Observer of top-level calls and creates. Nested frames are not reported.
pub trait Tracer {
    /// A top-level call or create is about to run
    fn capture_start(
        &mut self,
        from: Address,
        to: Address,
        create: bool,
        input: &[u8],
        gas: u64,
        value: U256,
    );

    /// The top-level call or create finished. `error` is
    /// [`EvmError::Revert`] carrying the output when the operation reverted.
    fn capture_end(
        &mut self,
        output: &[u8],
        gas_used: u64,
        elapsed: Duration,
        error: Option<&EvmError>,
    );
}
