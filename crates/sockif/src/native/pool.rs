//! Connection slot accounting for native backends.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::socket::{Error, Result};

struct PoolInner {
    in_use: AtomicUsize,
    capacity: Option<usize>,
}

/// A bounded (or unbounded) pool of connection slots.
///
/// Slots are returned when the [`PoolSlot`] is dropped, so a backend that
/// stores its slot in the connection state releases it on close and on any
/// failure path alike.
#[derive(Clone)]
pub struct ConnPool {
    inner: Arc<PoolInner>,
}

impl ConnPool {
    /// Create a pool; `None` means unlimited.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                in_use: AtomicUsize::new(0),
                capacity,
            }),
        }
    }

    /// Reserve a slot, or fail with [`Error::OutOfMemory`] when exhausted.
    pub fn try_acquire(&self) -> Result<PoolSlot> {
        let reserved = self
            .inner
            .in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| match self.inner.capacity {
                Some(cap) if n >= cap => None,
                _ => Some(n + 1),
            });

        match reserved {
            Ok(_) => Ok(PoolSlot {
                inner: Arc::clone(&self.inner),
            }),
            Err(_) => Err(Error::OutOfMemory),
        }
    }

    /// Get the number of slots in use.
    pub fn in_use(&self) -> usize {
        self.inner.in_use.load(Ordering::Acquire)
    }

    /// Get the capacity (`None` = unlimited).
    pub fn capacity(&self) -> Option<usize> {
        self.inner.capacity
    }
}

impl fmt::Debug for ConnPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnPool")
            .field("in_use", &self.in_use())
            .field("capacity", &self.inner.capacity)
            .finish()
    }
}

/// A reserved connection slot; released on drop.
pub struct PoolSlot {
    inner: Arc<PoolInner>,
}

impl Drop for PoolSlot {
    fn drop(&mut self) {
        self.inner.in_use.fetch_sub(1, Ordering::AcqRel);
    }
}

impl fmt::Debug for PoolSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PoolSlot")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_pool_exhausts() {
        let pool = ConnPool::new(Some(2));
        let a = pool.try_acquire().unwrap();
        let _b = pool.try_acquire().unwrap();
        assert!(matches!(pool.try_acquire(), Err(Error::OutOfMemory)));
        assert_eq!(pool.in_use(), 2);

        drop(a);
        assert_eq!(pool.in_use(), 1);
        assert!(pool.try_acquire().is_ok());
    }

    #[test]
    fn unbounded_pool() {
        let pool = ConnPool::new(None);
        let slots: Vec<_> = (0..100).map(|_| pool.try_acquire().unwrap()).collect();
        assert_eq!(pool.in_use(), 100);
        drop(slots);
        assert_eq!(pool.in_use(), 0);
        assert_eq!(pool.capacity(), None);
    }
}
