//! Memory arena for per-query scratch state
//!
//! Every partition engine owns one `Arena`. Temp output tables and operator
//! scratch pools charge their footprint to it through an `ArenaCharge`, and
//! give it back wholesale when the owning query or subquery finishes. There
//! is no per-object deallocation: a charge only grows until it is released
//! in full, and dropping a charge releases whatever it still holds.
//!
//! Accounting is exact, so `Arena::used()` before a fragment and after its
//! cleanup are equal.

mod errors;
mod pool;

pub use errors::{ArenaError, ArenaResult};
pub use pool::ScratchPool;

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Byte accounting for one partition's scratch memory
#[derive(Debug)]
pub struct Arena {
    /// Owner label used in error messages
    name: String,
    /// Byte limit (0 = unlimited)
    limit: usize,
    /// Bytes currently charged
    used: AtomicUsize,
    /// Highest value `used` has reached
    peak: AtomicUsize,
    /// Number of successful reservations
    reservations: AtomicU64,
}

impl Arena {
    /// Creates an arena with a byte limit (0 = unlimited)
    pub fn new(name: impl Into<String>, limit: usize) -> Self {
        Self {
            name: name.into(),
            limit,
            used: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            reservations: AtomicU64::new(0),
        }
    }

    /// Creates an unlimited arena
    pub fn unlimited(name: impl Into<String>) -> Self {
        Self::new(name, 0)
    }

    /// Owner label
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bytes currently charged
    pub fn used(&self) -> usize {
        self.used.load(Ordering::Acquire)
    }

    /// Highest usage observed
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    /// Byte limit (0 = unlimited)
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Number of successful reservations so far
    pub fn reservations(&self) -> u64 {
        self.reservations.load(Ordering::Relaxed)
    }

    /// Opens an empty charge against this arena
    pub fn charge(self: &Arc<Self>) -> ArenaCharge {
        ArenaCharge {
            arena: Arc::clone(self),
            bytes: 0,
        }
    }

    fn reserve(&self, bytes: usize) -> ArenaResult<()> {
        if bytes == 0 {
            return Ok(());
        }
        let mut current = self.used.load(Ordering::Acquire);
        loop {
            let next = current.saturating_add(bytes);
            if self.limit != 0 && next > self.limit {
                return Err(ArenaError::LimitExceeded {
                    arena: self.name.clone(),
                    requested: bytes,
                    used: current,
                    limit: self.limit,
                });
            }
            match self
                .used
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    self.peak.fetch_max(next, Ordering::Relaxed);
                    self.reservations.fetch_add(1, Ordering::Relaxed);
                    return Ok(());
                }
                Err(actual) => current = actual,
            }
        }
    }

    fn release(&self, bytes: usize) {
        if bytes == 0 {
            return;
        }
        let previous = self.used.fetch_sub(bytes, Ordering::AcqRel);
        debug_assert!(previous >= bytes, "arena {} released more than charged", self.name);
    }
}

/// Bytes charged to an arena on behalf of one owner.
///
/// Grows with `grow`, returns everything with `release_all` or on drop.
#[derive(Debug)]
pub struct ArenaCharge {
    arena: Arc<Arena>,
    bytes: usize,
}

impl ArenaCharge {
    /// Charges `bytes` more, failing if the arena limit would be exceeded
    pub fn grow(&mut self, bytes: usize) -> ArenaResult<()> {
        self.arena.reserve(bytes)?;
        self.bytes += bytes;
        Ok(())
    }

    /// Returns every charged byte to the arena
    pub fn release_all(&mut self) {
        self.arena.release(self.bytes);
        self.bytes = 0;
    }

    /// Bytes currently held
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    /// The arena charged
    pub fn arena(&self) -> &Arc<Arena> {
        &self.arena
    }
}

impl Drop for ArenaCharge {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_and_release() {
        let arena = Arc::new(Arena::unlimited("p0"));
        let mut charge = arena.charge();
        charge.grow(100).unwrap();
        charge.grow(28).unwrap();
        assert_eq!(arena.used(), 128);
        charge.release_all();
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.peak(), 128);
    }

    #[test]
    fn test_drop_releases() {
        let arena = Arc::new(Arena::unlimited("p0"));
        {
            let mut charge = arena.charge();
            charge.grow(64).unwrap();
        }
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn test_limit_enforced() {
        let arena = Arc::new(Arena::new("p0", 100));
        let mut charge = arena.charge();
        charge.grow(80).unwrap();
        let err = charge.grow(30).unwrap_err();
        assert!(matches!(err, ArenaError::LimitExceeded { requested: 30, used: 80, .. }));
        assert_eq!(arena.used(), 80);
        assert_eq!(charge.bytes(), 80);
    }

    #[test]
    fn test_concurrent_charges() {
        use std::thread;

        let arena = Arc::new(Arena::unlimited("shared"));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let arena = Arc::clone(&arena);
                thread::spawn(move || {
                    let mut charge = arena.charge();
                    for _ in 0..100 {
                        charge.grow(3).unwrap();
                    }
                    charge.bytes()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 300);
        }
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.reservations(), 800);
    }
}
