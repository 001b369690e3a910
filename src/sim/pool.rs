//! Generic object pool for short-lived entities
//!
//! Entities are toggled between active and inactive instead of being
//! allocated and dropped every time a bullet is fired or an enemy spawns.
//! The backing `Vec` only grows while a level runs; `shrink` trims it back
//! between levels.

use crate::error::{Result, SimError};

/// An entity that can live in an [`ObjectPool`]
pub trait Poolable {
    /// Arguments used to reinitialize the entity on acquire
    type Args;

    fn is_active(&self) -> bool;

    fn set_active(&mut self, active: bool);

    /// Reinitialize every mutable field in place
    fn reset(&mut self, args: Self::Args);
}

/// Index of an entity inside its pool
///
/// Stays valid until the next [`ObjectPool::shrink`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolHandle(usize);

impl PoolHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Pool statistics for debugging
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoolStats {
    pub active: usize,
    pub inactive: usize,
    pub total: usize,
    /// Active / total (0 for an empty pool)
    pub utilization: f32,
}

/// Reusable entity allocator for one concrete entity kind
#[derive(Debug, Clone)]
pub struct ObjectPool<T> {
    name: &'static str,
    items: Vec<T>,
    factory: fn() -> T,
    initial_size: usize,
    /// 0 = unbounded growth
    max_pool_size: usize,
}

impl<T: Poolable> ObjectPool<T> {
    /// Create a pool and pre-allocate `initial_size` inactive entities
    pub fn new(
        name: &'static str,
        factory: fn() -> T,
        initial_size: usize,
        max_pool_size: usize,
    ) -> Self {
        let mut items = Vec::with_capacity(initial_size);
        for _ in 0..initial_size {
            let mut item = factory();
            item.set_active(false);
            items.push(item);
        }

        Self {
            name,
            items,
            factory,
            initial_size,
            max_pool_size,
        }
    }

    /// Acquire an entity, reset with `args`
    ///
    /// Reuses the first inactive entity, otherwise grows the pool while under
    /// `max_pool_size`. Fails with [`SimError::PoolExhausted`] when every
    /// entity is active and the pool is at capacity.
    pub fn acquire(&mut self, args: T::Args) -> Result<PoolHandle> {
        if let Some(index) = self.items.iter().position(|item| !item.is_active()) {
            let item = &mut self.items[index];
            item.set_active(true);
            item.reset(args);
            return Ok(PoolHandle(index));
        }

        if self.max_pool_size == 0 || self.items.len() < self.max_pool_size {
            let mut item = (self.factory)();
            item.set_active(true);
            item.reset(args);
            self.items.push(item);
            return Ok(PoolHandle(self.items.len() - 1));
        }

        Err(SimError::PoolExhausted {
            pool: self.name,
            capacity: self.max_pool_size,
        })
    }

    /// Return an entity to the pool. Releasing an inactive entity is a no-op.
    pub fn release(&mut self, handle: PoolHandle) {
        if let Some(item) = self.items.get_mut(handle.0) {
            if item.is_active() {
                item.set_active(false);
            }
        }
    }

    /// Deactivate every entity
    pub fn clear(&mut self) {
        for item in &mut self.items {
            item.set_active(false);
        }
    }

    /// Trim inactive entities back to `initial_size`, keeping all active ones
    ///
    /// Invalidates outstanding handles; call between levels only.
    pub fn shrink(&mut self) {
        let keep = self.initial_size;
        let mut kept_inactive = 0;
        self.items.retain(|item| {
            if item.is_active() {
                true
            } else if kept_inactive < keep {
                kept_inactive += 1;
                true
            } else {
                false
            }
        });
    }

    /// Active entity behind `handle`
    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        self.items.get(handle.0).filter(|item| item.is_active())
    }

    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.items.get_mut(handle.0).filter(|item| item.is_active())
    }

    /// Iterate active entities in pool order
    pub fn iter_active(&self) -> impl Iterator<Item = (PoolHandle, &T)> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_active())
            .map(|(i, item)| (PoolHandle(i), item))
    }

    pub fn iter_active_mut(&mut self) -> impl Iterator<Item = (PoolHandle, &mut T)> {
        self.items
            .iter_mut()
            .enumerate()
            .filter(|(_, item)| item.is_active())
            .map(|(i, item)| (PoolHandle(i), item))
    }

    /// Handles of all active entities (for loops that mutate the pool)
    pub fn active_handles(&self) -> Vec<PoolHandle> {
        self.iter_active().map(|(handle, _)| handle).collect()
    }

    pub fn active_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_active()).count()
    }

    /// Entities ever allocated (active + inactive)
    pub fn current_size(&self) -> usize {
        self.items.len()
    }

    pub fn initial_size(&self) -> usize {
        self.initial_size
    }

    pub fn max_pool_size(&self) -> usize {
        self.max_pool_size
    }

    pub fn stats(&self) -> PoolStats {
        let active = self.active_count();
        let total = self.items.len();
        PoolStats {
            active,
            inactive: total - active,
            total,
            utilization: if total > 0 {
                active as f32 / total as f32
            } else {
                0.0
            },
        }
    }
}
