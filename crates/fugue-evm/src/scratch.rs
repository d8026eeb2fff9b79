//! Scratch value pools
//!
//! Each [`Evm`](crate::Evm) borrows one [`ValuePool`] from a shared
//! [`PoolRegistry`] and hands it back on drop. The pool itself is owned by a
//! single execution context and needs no locking; only the registry is
//! behind a mutex.

use fugue_primitives::U256;
use parking_lot::Mutex;

/// Value written over every returned slot when verification is on.
pub const SENTINEL: U256 = U256([0xdead_beef_dead_beef; 4]);

/// Bounded pool of reusable 256-bit slots.
///
/// [`get`](Self::get) hands out a slot with unspecified residual contents;
/// callers must assign before they read. [`get_zeroed`](Self::get_zeroed)
/// is the safe variant.
#[derive(Debug)]
pub struct ValuePool {
    cells: Vec<U256>,
    capacity: usize,
    verify: bool,
}

impl ValuePool {
    /// Create a pool holding at most `capacity` free slots
    pub fn new(capacity: usize, verify: bool) -> Self {
        Self {
            cells: Vec::with_capacity(capacity),
            capacity,
            verify,
        }
    }

    /// Take a slot. Contents are whatever was last returned, or zero.
    pub fn get(&mut self) -> U256 {
        self.cells.pop().unwrap_or_default()
    }

    /// Take a slot cleared to zero
    pub fn get_zeroed(&mut self) -> U256 {
        self.cells.pop();
        U256::zero()
    }

    /// Return a slot. Dropped once the pool is full.
    pub fn put(&mut self, value: U256) {
        if self.cells.len() >= self.capacity {
            return;
        }
        self.cells.push(if self.verify { SENTINEL } else { value });
    }

    /// Return every value yielded by `values`
    pub fn reclaim(&mut self, values: impl IntoIterator<Item = U256>) {
        for value in values {
            if self.cells.len() >= self.capacity {
                break;
            }
            self.put(value);
        }
    }

    /// Free slots currently held
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the pool holds no free slots
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Maximum number of free slots
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether returned slots are overwritten with [`SENTINEL`]
    pub fn verifying(&self) -> bool {
        self.verify
    }
}

/// Pool of idle [`ValuePool`]s shared between execution contexts.
#[derive(Debug)]
pub struct PoolRegistry {
    idle: Mutex<Vec<ValuePool>>,
    max_idle: usize,
}

impl PoolRegistry {
    /// Create a registry keeping up to `max_idle` pools
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Borrow an idle pool, or allocate a fresh one. The pool is resized to
    /// `capacity` slots whatever it held before.
    pub fn borrow(&self, capacity: usize, verify: bool) -> ValuePool {
        let reused = self.idle.lock().pop();
        match reused {
            Some(mut pool) => {
                pool.capacity = capacity;
                pool.cells.truncate(capacity);
                pool.verify = verify;
                if verify {
                    pool.cells.iter_mut().for_each(|cell| *cell = SENTINEL);
                }
                pool
            }
            None => ValuePool::new(capacity, verify),
        }
    }

    /// Hand a pool back. Dropped if the registry is already full.
    pub fn give_back(&self, pool: ValuePool) {
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(pool);
        }
    }

    /// Pools currently idle
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }
}

impl Default for PoolRegistry {
    fn default() -> Self {
        Self::new(16)
    }
}
