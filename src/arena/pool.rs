//! Typed scratch pools
//!
//! A `ScratchPool<T>` holds the per-operator objects created while an
//! operator runs (aggregate states, working tuples) and charges an estimated
//! footprint for each to the arena. Objects are never freed one by one;
//! `purge` drops them all and returns the charge.

use std::sync::Arc;

use super::errors::{ArenaError, ArenaResult};
use super::{Arena, ArenaCharge};

/// Pool of scratch objects freed wholesale
#[derive(Debug)]
pub struct ScratchPool<T> {
    items: Vec<T>,
    charge: Option<ArenaCharge>,
}

impl<T> Default for ScratchPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ScratchPool<T> {
    /// Creates an unbound, empty pool
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            charge: None,
        }
    }

    /// Binds the pool to an arena. Rebinding purges first.
    pub fn bind(&mut self, arena: &Arc<Arena>) {
        self.purge();
        self.charge = Some(arena.charge());
    }

    /// Whether the pool has an arena
    pub fn is_bound(&self) -> bool {
        self.charge.is_some()
    }

    /// Stores `item`, charging `bytes` for it; returns its slot
    pub fn allocate(&mut self, item: T, bytes: usize) -> ArenaResult<usize> {
        let charge = self.charge.as_mut().ok_or(ArenaError::Unbound)?;
        charge.grow(bytes)?;
        self.items.push(item);
        Ok(self.items.len() - 1)
    }

    /// All objects in allocation order, mutably
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.items
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the pool holds nothing
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Bytes charged for the live objects
    pub fn charged_bytes(&self) -> usize {
        self.charge.as_ref().map(ArenaCharge::bytes).unwrap_or(0)
    }

    /// Drops every object and returns the charge to the arena.
    /// The pool stays bound.
    pub fn purge(&mut self) {
        self.items.clear();
        if let Some(charge) = self.charge.as_mut() {
            charge.release_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_pool_rejects_allocation() {
        let mut pool: ScratchPool<u32> = ScratchPool::new();
        assert_eq!(pool.allocate(1, 4), Err(ArenaError::Unbound));
    }

    #[test]
    fn test_purge_returns_charge() {
        let arena = Arc::new(Arena::unlimited("p0"));
        let mut pool = ScratchPool::new();
        pool.bind(&arena);
        let a = pool.allocate("a", 10).unwrap();
        let b = pool.allocate("b", 20).unwrap();
        assert_eq!((a, b), (0, 1));
        assert_eq!(arena.used(), 30);
        pool.purge();
        assert!(pool.is_empty());
        assert!(pool.is_bound());
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn test_failed_allocation_keeps_pool_consistent() {
        let arena = Arc::new(Arena::new("p0", 16));
        let mut pool = ScratchPool::new();
        pool.bind(&arena);
        pool.allocate(1u8, 10).unwrap();
        assert!(pool.allocate(2u8, 10).is_err());
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.charged_bytes(), 10);
    }
}
