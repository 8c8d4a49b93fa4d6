//! Deferred lifecycle queue for entity admission and removal.
//!
//! Nothing touches the live entity list while it is being iterated. Instead,
//! `create` and `destroy` requests are recorded here during the frame and
//! handed to the owner as a single [`Batch`] at the cleanup boundary.
//!
//! # Ordering
//!
//! Both queues are FIFO. A batch always lists admissions before removals, so
//! an entity that was created and destroyed within the same frame is admitted
//! (and activated) first and removed right after.
//!
//! # Example
//!
//! ```
//! use jumpgun_ecs::prelude::*;
//!
//! let mut alloc = EntityAllocator::new();
//! let mut cmds: CommandBuffer<&str> = CommandBuffer::new();
//!
//! let a = alloc.allocate();
//! let b = alloc.allocate();
//! cmds.spawn(a, "player");
//! cmds.spawn(b, "ground");
//! cmds.despawn(a);
//!
//! let batch = cmds.drain();
//! assert_eq!(batch.spawns, vec![(a, "player"), (b, "ground")]);
//! assert_eq!(batch.despawns, vec![a]);
//! assert!(cmds.is_empty());
//! ```

use std::collections::VecDeque;

use tracing::warn;

use crate::entity::EntityId;

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// Everything queued since the previous cleanup boundary, in application
/// order: every spawn first, then every despawn.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    pub spawns: Vec<(EntityId, T)>,
    pub despawns: Vec<EntityId>,
}

impl<T> Batch<T> {
    pub fn is_empty(&self) -> bool {
        self.spawns.is_empty() && self.despawns.is_empty()
    }
}

// ---------------------------------------------------------------------------
// QueueReport
// ---------------------------------------------------------------------------

/// Counters for the requests received since the last [`CommandBuffer::drain`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueReport {
    /// Despawn requests ignored because the same id was already queued.
    pub duplicate_despawns: usize,
    /// Spawn requests ignored because the id was already pending.
    pub duplicate_spawns: usize,
}

// ---------------------------------------------------------------------------
// CommandBuffer
// ---------------------------------------------------------------------------

/// Collects admissions and removals during a frame.
///
/// `T` is whatever the owner needs to admit an entity (the game crate stores
/// the fully built entity here). The buffer never inspects it.
pub struct CommandBuffer<T> {
    spawns: VecDeque<(EntityId, T)>,
    despawns: Vec<EntityId>,
    report: QueueReport,
    last_report: QueueReport,
}

impl<T> Default for CommandBuffer<T> {
    fn default() -> Self {
        Self {
            spawns: VecDeque::new(),
            despawns: Vec::new(),
            report: QueueReport::default(),
            last_report: QueueReport::default(),
        }
    }
}

impl<T> CommandBuffer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `payload` for admission under the already-allocated `id`.
    ///
    /// Returns `false` (and drops the payload) if `id` is already pending.
    pub fn spawn(&mut self, id: EntityId, payload: T) -> bool {
        if self.is_pending_spawn(id) {
            self.report.duplicate_spawns += 1;
            warn!(entity = %id, "spawn ignored: entity already pending admission");
            return false;
        }
        self.spawns.push_back((id, payload));
        true
    }

    /// Queue `id` for removal at the next cleanup boundary.
    ///
    /// Queuing the same id twice in one frame is a no-op that returns `false`.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if self.despawns.contains(&id) {
            self.report.duplicate_despawns += 1;
            warn!(entity = %id, "despawn ignored: entity already queued for removal");
            return false;
        }
        self.despawns.push(id);
        true
    }

    pub fn is_pending_spawn(&self, id: EntityId) -> bool {
        self.spawns.iter().any(|(pending, _)| *pending == id)
    }

    pub fn is_pending_despawn(&self, id: EntityId) -> bool {
        self.despawns.contains(&id)
    }

    /// Payload of a pending spawn, if any.
    pub fn pending(&self, id: EntityId) -> Option<&T> {
        self.spawns
            .iter()
            .find(|(pending, _)| *pending == id)
            .map(|(_, payload)| payload)
    }

    pub fn pending_spawns(&self) -> usize {
        self.spawns.len()
    }

    pub fn pending_despawns(&self) -> usize {
        self.despawns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spawns.is_empty() && self.despawns.is_empty()
    }

    /// Take everything queued so far. The buffer is empty afterwards.
    pub fn drain(&mut self) -> Batch<T> {
        self.last_report = std::mem::take(&mut self.report);
        Batch {
            spawns: self.spawns.drain(..).collect(),
            despawns: std::mem::take(&mut self.despawns),
        }
    }

    /// Counters for the requests covered by the last [`drain`](Self::drain).
    pub fn last_report(&self) -> QueueReport {
        self.last_report
    }

    /// Drop every queued request without applying it.
    pub fn clear(&mut self) {
        self.spawns.clear();
        self.despawns.clear();
        self.report = QueueReport::default();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityAllocator;

    #[test]
    fn spawns_come_out_in_fifo_order() {
        let mut alloc = EntityAllocator::new();
        let mut buf = CommandBuffer::new();
        let ids: Vec<EntityId> = (0..5).map(|_| alloc.allocate()).collect();
        for (n, id) in ids.iter().enumerate() {
            buf.spawn(*id, n);
        }
        let batch = buf.drain();
        let order: Vec<usize> = batch.spawns.iter().map(|(_, n)| *n).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn despawn_of_pending_entity_is_kept_after_its_spawn() {
        let mut alloc = EntityAllocator::new();
        let mut buf = CommandBuffer::new();
        let id = alloc.allocate();
        buf.despawn(id);
        buf.spawn(id, ());
        let batch = buf.drain();
        assert_eq!(batch.spawns.len(), 1);
        assert_eq!(batch.despawns, vec![id]);
    }

    #[test]
    fn duplicate_despawn_is_ignored_and_counted() {
        let mut alloc = EntityAllocator::new();
        let mut buf: CommandBuffer<()> = CommandBuffer::new();
        let id = alloc.allocate();
        assert!(buf.despawn(id));
        assert!(!buf.despawn(id));
        let batch = buf.drain();
        assert_eq!(batch.despawns.len(), 1);
        assert_eq!(buf.last_report().duplicate_despawns, 1);
    }

    #[test]
    fn duplicate_spawn_keeps_first_payload() {
        let mut alloc = EntityAllocator::new();
        let mut buf = CommandBuffer::new();
        let id = alloc.allocate();
        assert!(buf.spawn(id, "first"));
        assert!(!buf.spawn(id, "second"));
        assert_eq!(buf.pending(id), Some(&"first"));
    }

    #[test]
    fn drain_empties_the_buffer() {
        let mut alloc = EntityAllocator::new();
        let mut buf = CommandBuffer::new();
        let id = alloc.allocate();
        buf.spawn(id, 1u8);
        assert!(buf.is_pending_spawn(id));
        let _ = buf.drain();
        assert!(buf.is_empty());
        assert!(!buf.is_pending_spawn(id));
        assert!(buf.drain().is_empty());
    }

    #[test]
    fn clear_discards_without_reporting() {
        let mut alloc = EntityAllocator::new();
        let mut buf = CommandBuffer::new();
        buf.spawn(alloc.allocate(), 0u8);
        buf.despawn(alloc.allocate());
        buf.clear();
        assert_eq!(buf.pending_spawns(), 0);
        assert_eq!(buf.pending_despawns(), 0);
    }
}
