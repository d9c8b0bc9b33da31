use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free source of strictly increasing sequence numbers.
///
/// A fresh allocator hands out `1, 2, 3, ...`. After replay the store raises
/// the floor with [`IdAllocator::advance_to`] so no persisted sequence is ever
/// issued twice. Values are never returned to the pool.
#[derive(Debug, Default)]
pub struct IdAllocator {
    counter: AtomicU64,
}

impl IdAllocator {
    /// Creates an allocator whose first issued value is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an allocator whose first issued value is `high_water + 1`.
    pub fn with_high_water(high_water: u64) -> Self {
        Self {
            counter: AtomicU64::new(high_water),
        }
    }

    /// Issues the next sequence number.
    ///
    /// Returns `None` once `u64::MAX` has been issued or replayed; the counter
    /// never wraps.
    pub fn next(&self) -> Option<u64> {
        let mut current = self.counter.load(Ordering::Acquire);
        loop {
            let next = current.checked_add(1)?;
            match self.counter.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(next),
                Err(observed) => current = observed,
            }
        }
    }

    /// Raises the counter so the next issued value exceeds `high_water`.
    ///
    /// Never lowers it.
    pub fn advance_to(&self, high_water: u64) {
        self.counter.fetch_max(high_water, Ordering::AcqRel);
    }

    /// Returns the last issued (or replayed) value.
    pub fn high_water(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }
}
