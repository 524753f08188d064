use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A fixed number of interchangeable slots.
///
/// Stands in for the statically sized buffer pools of the target: a decode
/// step takes a slot for as long as it needs a buffer and gives it back when
/// the [`PoolLease`] drops. Acquisition never blocks; an exhausted pool is
/// reported to the caller.
#[derive(Debug, Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    name: &'static str,
    capacity: usize,
    in_use: AtomicUsize,
}

impl BufferPool {
    /// Create a pool with `capacity` slots.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                name,
                capacity,
                in_use: AtomicUsize::new(0),
            }),
        }
    }

    /// Take one slot, or `None` if every slot is leased.
    pub fn acquire(&self) -> Option<PoolLease> {
        self.inner
            .in_use
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < self.inner.capacity).then_some(used + 1)
            })
            .ok()
            .map(|_| PoolLease {
                pool: Arc::clone(&self.inner),
            })
    }

    /// Pool name, used in diagnostics.
    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Total slots.
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Slots currently leased.
    pub fn in_use(&self) -> usize {
        self.inner.in_use.load(Ordering::Acquire)
    }
}

/// One leased slot; returned to its pool on drop.
#[derive(Debug)]
pub struct PoolLease {
    pool: Arc<PoolInner>,
}

impl Drop for PoolLease {
    fn drop(&mut self) {
        self.pool.in_use.fetch_sub(1, Ordering::AcqRel);
    }
}
