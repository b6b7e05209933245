// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded lock-free message pool.
//!
//! Keeps up to `capacity` retired message instances for reuse by
//! producers. Instances still shared elsewhere when handed back out are
//! discarded rather than aliased.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam::queue::ArrayQueue;

use super::MessagePool;
use crate::error::{Error, Result};

/// Pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Instances accepted into the free list.
    pub accepted: u64,
    /// Instances returned by `get_or_create` instead of a fresh allocation.
    pub reused: u64,
    /// Instances dropped because the free list was full or still shared.
    pub dropped: u64,
}

/// Free list of retired messages.
pub struct RecyclePool<M> {
    free: ArrayQueue<Arc<M>>,
    accepted: AtomicU64,
    reused: AtomicU64,
    dropped: AtomicU64,
}

impl<M> std::fmt::Debug for RecyclePool<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecyclePool")
            .field("capacity", &self.free.capacity())
            .field("len", &self.free.len())
            .field("stats", &self.stats())
            .finish()
    }
}

impl<M> RecyclePool<M> {
    /// # Errors
    ///
    /// `Error::InvalidCapacity` if `capacity` is 0.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity(capacity));
        }
        Ok(Self {
            free: ArrayQueue::new(capacity),
            accepted: AtomicU64::new(0),
            reused: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.free.capacity()
    }

    /// Take a uniquely owned recycled instance, or build a new one.
    pub fn get_or_create<F>(&self, create: F) -> M
    where
        F: FnOnce() -> M,
    {
        while let Some(candidate) = self.free.pop() {
            match Arc::try_unwrap(candidate) {
                Ok(message) => {
                    self.reused.fetch_add(1, Ordering::Relaxed);
                    return message;
                }
                Err(_shared) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        create()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

impl<M: Send + Sync> MessagePool<M> for RecyclePool<M> {
    fn accept(&self, message: Arc<M>) {
        if self.free.push(message).is_ok() {
            self.accepted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            RecyclePool::<u32>::new(0),
            Err(Error::InvalidCapacity(0))
        ));
    }

    #[test]
    fn test_accept_is_bounded() {
        let pool = RecyclePool::new(2).unwrap();
        for n in 0..5_u32 {
            pool.accept(Arc::new(n));
        }
        assert_eq!(pool.len(), 2);
        let stats = pool.stats();
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.dropped, 3);
    }

    #[test]
    fn test_get_or_create_reuses_unique_instances() {
        let pool = RecyclePool::new(4).unwrap();
        pool.accept(Arc::new(String::from("recycled")));
        let message = pool.get_or_create(|| String::from("fresh"));
        assert_eq!(message, "recycled");
        assert!(pool.is_empty());

        let message = pool.get_or_create(|| String::from("fresh"));
        assert_eq!(message, "fresh");
        assert_eq!(pool.stats().reused, 1);
    }

    #[test]
    fn test_get_or_create_skips_shared_instances() {
        let pool = RecyclePool::new(4).unwrap();
        let still_held = Arc::new(7_u64);
        pool.accept(Arc::clone(&still_held));
        let message = pool.get_or_create(|| 1);
        assert_eq!(message, 1);
        assert_eq!(pool.stats().dropped, 1);
        assert_eq!(Arc::strong_count(&still_held), 1);
    }
}
