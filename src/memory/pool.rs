use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use crossbeam::queue::ArrayQueue;
use crate::core::stats::PoolStats;

/// Values that can be returned to a pool and handed out again.
pub trait Reset {
    /// Restores the value to its freshly constructed state, keeping
    /// allocations where possible.
    fn reset(&mut self);
}

/// Bounded object pool. An empty pool hands out a transient value instead
/// of blocking; returning to a full pool simply drops the value.
pub struct Pool<T: Reset + Default> {
    items: ArrayQueue<T>,
    capacity: usize,
    transient: AtomicUsize,
    checkouts: AtomicUsize,
}

impl<T: Reset + Default> Pool<T> {
    pub fn new(capacity: usize) -> Arc<Self> {
        let capacity = capacity.max(1);
        let items = ArrayQueue::new(capacity);
        for _ in 0..capacity {
            let _ = items.push(T::default());
        }
        Arc::new(Pool {
            items,
            capacity,
            transient: AtomicUsize::new(0),
            checkouts: AtomicUsize::new(0),
        })
    }

    pub fn checkout(self: &Arc<Self>) -> Pooled<T> {
        self.checkouts.fetch_add(1, Ordering::Relaxed);
        let value = match self.items.pop() {
            Some(value) => value,
            None => {
                self.transient.fetch_add(1, Ordering::Relaxed);
                T::default()
            }
        };
        Pooled { value, pool: self.clone() }
    }

    fn release(&self, mut value: T) {
        value.reset();
        let _ = self.items.push(value);
    }

    pub fn available(&self) -> usize {
        self.items.len()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.capacity,
            available: self.items.len(),
            checkouts: self.checkouts.load(Ordering::Relaxed),
            transient: self.transient.load(Ordering::Relaxed),
        }
    }
}

/// A value on loan from a pool. Returned (after `reset`) when dropped.
pub struct Pooled<T: Reset + Default> {
    value: T,
    pool: Arc<Pool<T>>,
}

impl<T: Reset + Default> Pooled<T> {
    /// Returns the value to its pool.
    pub fn close(self) {}
}

impl<T: Reset + Default> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T: Reset + Default> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Reset + Default + fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.value.fmt(f)
    }
}

impl<T: Reset + Default> Drop for Pooled<T> {
    fn drop(&mut self) {
        let value = std::mem::take(&mut self.value);
        self.pool.release(value);
    }
}
