// Copyright (c) Facebook, Inc. and its affiliates.
// Modifications Copyright (c) 2022-2023 Bolt Labs Holdings, Inc
//
// This source code is licensed under both the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree and the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree.

//! An exclusive-use pool for stateful components that must not be shared
//! between threads, such as random number generators.
//!
//! Instances are created lazily by a factory, up to the configured capacity.
//! A borrower gets a [`PooledObject`] guard which returns the instance to the
//! pool when dropped, unless it was [invalidated](PooledObject::invalidate)
//! or is dropped while its thread panics.

use crate::{
    errors::{InternalError, Result},
    parameters::PoolConfig,
};
use parking_lot::{Condvar, Mutex};
use std::{
    fmt::Debug,
    ops::{Deref, DerefMut},
    time::Instant,
};
use tracing::{debug, error, warn};

type Factory<T> = Box<dyn Fn() -> Result<T> + Send + Sync>;

struct PoolState<T> {
    idle: Vec<T>,
    /// Instances in existence, idle or borrowed.
    live: usize,
}

/// A bounded pool of lazily-created instances of `T`.
pub struct ObjectPool<T> {
    factory: Factory<T>,
    config: PoolConfig,
    state: Mutex<PoolState<T>>,
    returned: Condvar,
}

impl<T> Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ObjectPool")
            .field("config", &self.config)
            .field("idle", &state.idle.len())
            .field("live", &state.live)
            .finish()
    }
}

impl<T> ObjectPool<T> {
    pub fn new<F>(config: PoolConfig, factory: F) -> Result<Self>
    where
        F: Fn() -> Result<T> + Send + Sync + 'static,
    {
        if config.capacity == 0 {
            return arg_err!("pool capacity must be positive");
        }
        Ok(Self {
            factory: Box::new(factory),
            config,
            state: Mutex::new(PoolState {
                idle: Vec::new(),
                live: 0,
            }),
            returned: Condvar::new(),
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Number of instances currently waiting in the pool.
    pub fn idle(&self) -> usize {
        self.state.lock().idle.len()
    }

    /// Number of instances in existence, idle or borrowed.
    pub fn live(&self) -> usize {
        self.state.lock().live
    }

    /// Take an instance for exclusive use.
    ///
    /// Reuses an idle instance if there is one, creates a new one if the pool
    /// is below capacity, and otherwise waits up to the borrow timeout for an
    /// instance to come back.
    pub fn borrow(&self) -> Result<PooledObject<'_, T>> {
        let deadline = Instant::now() + self.config.borrow_timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.idle.pop() {
                return Ok(PooledObject {
                    pool: self,
                    item: Some(item),
                });
            }
            if state.live < self.config.capacity {
                state.live += 1;
                drop(state);
                return match (self.factory)() {
                    Ok(item) => {
                        debug!("Created a new pooled instance");
                        Ok(PooledObject {
                            pool: self,
                            item: Some(item),
                        })
                    }
                    Err(e) => {
                        error!("Pool factory failed: {:?}", e);
                        self.release_slot();
                        Err(e)
                    }
                };
            }
            if self.returned.wait_until(&mut state, deadline).timed_out()
                && state.idle.is_empty()
                && state.live >= self.config.capacity
            {
                warn!(
                    "No pooled instance became available within {:?}",
                    self.config.borrow_timeout
                );
                return Err(InternalError::PoolExhausted);
            }
        }
    }

    /// Borrow an instance, run `f` with it and return it to the pool. If `f`
    /// fails or panics the instance is discarded instead.
    pub fn with<U, F>(&self, f: F) -> Result<U>
    where
        F: FnOnce(&mut T) -> Result<U>,
    {
        let mut guard = self.borrow()?;
        match f(&mut *guard) {
            Ok(output) => Ok(output),
            Err(e) => {
                guard.invalidate();
                Err(e)
            }
        }
    }

    fn release_slot(&self) {
        let mut state = self.state.lock();
        state.live -= 1;
        drop(state);
        let _ = self.returned.notify_one();
    }

    fn give_back(&self, item: T) {
        let mut state = self.state.lock();
        state.idle.push(item);
        drop(state);
        let _ = self.returned.notify_one();
    }
}

/// Exclusive access to one instance of an [`ObjectPool`].
pub struct PooledObject<'a, T> {
    pool: &'a ObjectPool<T>,
    item: Option<T>,
}

impl<'a, T> Debug for PooledObject<'a, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledObject")
            .field("item", &"[redacted]")
            .field("held", &self.item.is_some())
            .finish()
    }
}

impl<'a, T> PooledObject<'a, T> {
    /// Discard the instance instead of returning it to the pool.
    pub fn invalidate(mut self) {
        if self.item.take().is_some() {
            debug!("Discarding an invalidated pooled instance");
            self.pool.release_slot();
        }
    }
}

impl<'a, T> Deref for PooledObject<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // `item` is only taken by `invalidate` and `drop`, which consume the
        // guard.
        match &self.item {
            Some(item) => item,
            None => unreachable!("pooled object used after release"),
        }
    }
}

impl<'a, T> DerefMut for PooledObject<'a, T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut self.item {
            Some(item) => item,
            None => unreachable!("pooled object used after release"),
        }
    }
}

impl<'a, T> Drop for PooledObject<'a, T> {
    fn drop(&mut self) {
        if let Some(item) = self.item.take() {
            // A borrower that panicked may have left the instance half-updated.
            if std::thread::panicking() {
                warn!("Discarding a pooled instance released during a panic");
                drop(item);
                self.pool.release_slot();
            } else {
                self.pool.give_back(item);
            }
        }
    }
}
