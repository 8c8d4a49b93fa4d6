//! Entity handles and their allocation.
//!
//! An [`EntityId`] packs a *generation* counter in the high 32 bits and a slot
//! *index* in the low 32 bits. Ids are handed out the moment an entity is
//! queued for creation, so a caller can hold on to it (for example to destroy
//! a UI button later) before the entity is admitted at the next cleanup
//! boundary. Releasing a slot bumps its generation, which turns every
//! outstanding copy of the old handle into a detectably stale one.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A generational entity handle.
///
/// Layout: `[generation: u32 | index: u32]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Build a handle from a slot index and generation.
    #[inline]
    pub fn new(index: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | index as u64)
    }

    /// Slot index (low 32 bits).
    #[inline]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    /// Generation (high 32 bits).
    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Raw `u64` representation, handy as a map key or log field.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Hands out and recycles [`EntityId`]s.
///
/// A slot is *reserved* from `allocate` until `release`; whether the entity
/// behind it is already live or still pending admission is the scene's
/// business, not the allocator's. Freed slots are reused FIFO so a single hot
/// index does not burn through its generations.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    generations: Vec<u32>,
    reserved: Vec<bool>,
    free: VecDeque<u32>,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh handle, recycling a released slot when one is free.
    pub fn allocate(&mut self) -> EntityId {
        if let Some(index) = self.free.pop_front() {
            // Generation was already bumped on release.
            self.reserved[index as usize] = true;
            EntityId::new(index, self.generations[index as usize])
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            self.reserved.push(true);
            EntityId::new(index, 0)
        }
    }

    /// Release a handle so its slot can be recycled.
    ///
    /// Returns `false` if the handle was stale or already released.
    pub fn release(&mut self, id: EntityId) -> bool {
        if !self.is_reserved(id) {
            return false;
        }
        let idx = id.index() as usize;
        self.reserved[idx] = false;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.free.push_back(id.index());
        true
    }

    /// Whether `id` is the current, unreleased handle for its slot.
    pub fn is_reserved(&self, id: EntityId) -> bool {
        let idx = id.index() as usize;
        idx < self.generations.len()
            && self.reserved[idx]
            && self.generations[idx] == id.generation()
    }

    /// Number of handles currently reserved.
    pub fn reserved_count(&self) -> usize {
        self.reserved.iter().filter(|&&r| r).count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
