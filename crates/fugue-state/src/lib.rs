//! # fugue-state
//!
//! The account/state store consumed by the execution core.
//!
//! The core only talks to state through [`StateReader`] and [`StateWriter`];
//! snapshots are opaque [`Snapshot`] tokens. [`JournaledState`] is an
//! in-memory implementation backed by an undo journal, suitable for tests
//! and for embedding in front of a persistent store.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod account;
mod alloc;
mod error;
mod journal;
mod traits;

pub use account::{Account, Log, EMPTY_CODE_HASH};
pub use alloc::{AllocAccount, GenesisAlloc};
pub use error::{StateError, StateResult};
pub use journal::JournaledState;
pub use traits::{Snapshot, StateDb, StateReader, StateWriter};
