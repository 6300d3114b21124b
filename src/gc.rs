//! Object arena with reference accounting and cycle collection.
//!
//! Objects live in slots addressed by generational handles ([`ObjectId`]).
//! Each slot counts two kinds of references:
//!
//! - roots: handles held by the host (`alloc` hands out one, `retain` adds more)
//! - edges: references stored inside other objects (property values,
//!   accessor functions, prototype links, watchers, timer handlers)
//!
//! An object is destroyed the moment both counts reach zero. When a release
//! leaves an object with edges but no roots it may be part of an orphaned
//! cycle. Such objects are recorded as suspects; the next flush walks the
//! unrooted subgraph below them, subtracts the references found inside it,
//! and tears down whatever no outside reference keeps alive. A full
//! mark-and-sweep from the rooted objects is available through
//! [`Heap::collect`]. Destroying an object bumps its slot generation, so
//! stale handles fail every lookup instead of aliasing a new object.

use std::fmt;

use hashbrown::{HashMap, HashSet};
use rustc_hash::FxBuildHasher;
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::config::RuntimeConfig;
use crate::object::{ObjectData, ObjectKind};
use crate::value::Value;

// ============================================================================
// ObjectId - generational handle
// ============================================================================

/// Handle to a heap object.
///
/// Handles are plain `Copy` data and never keep an object alive by
/// themselves; use [`Heap::retain`]/[`Heap::release`] for that.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Identity set used by teardown traversal
pub(crate) type VisitedSet = HashSet<ObjectId, FxBuildHasher>;

/// Remaining outside references per object during cycle detection
type TrialCounts = HashMap<ObjectId, u32, FxBuildHasher>;

// ============================================================================
// Slot - arena storage
// ============================================================================

struct Slot {
    generation: u32,
    /// Host handles
    roots: u32,
    /// References from other objects
    edges: u32,
    data: Option<ObjectData>,
}

impl Slot {
    fn is_live(&self, id: ObjectId) -> bool {
        self.generation == id.generation && self.data.is_some()
    }
}

// ============================================================================
// Heap
// ============================================================================

/// Arena owning every script object.
pub struct Heap {
    slots: Vec<Slot>,

    /// Vacated slot indices, reused before the arena grows
    free_list: Vec<u32>,

    /// Persistent mark stack, reused between collections to avoid reallocating
    mark_stack: Vec<ObjectId>,

    /// Persistent mark bits, one per slot
    marked: Vec<bool>,

    /// Objects whose counts reached zero, waiting for destruction
    pending: Vec<ObjectId>,

    /// Objects left reachable only through edges, possibly in a dead cycle
    suspects: Vec<ObjectId>,

    /// Objects visited by cycle detection, marking and teardown
    traversed: u64,

    /// Re-entrancy guard for `flush`
    flushing: bool,

    collect_cycles: bool,
}

impl Heap {
    pub fn new() -> Self {
        Self::with_config(&RuntimeConfig::default())
    }

    pub fn with_config(config: &RuntimeConfig) -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            mark_stack: Vec::new(),
            marked: Vec::new(),
            pending: Vec::new(),
            suspects: Vec::new(),
            traversed: 0,
            flushing: false,
            collect_cycles: config.collect_cycles,
        }
    }

    /// Allocate an object of the given kind.
    ///
    /// The returned handle carries one root; pair it with [`Heap::release`].
    pub fn alloc(&mut self, kind: ObjectKind) -> ObjectId {
        let data = ObjectData::new(kind);
        let mut refs = Vec::new();
        data.for_each_ref(|r| refs.push(r));

        let id = if let Some(index) = self.free_list.pop() {
            match self.slots.get_mut(index as usize) {
                Some(slot) => {
                    slot.roots = 1;
                    slot.edges = 0;
                    slot.data = Some(data);
                    ObjectId {
                        index,
                        generation: slot.generation,
                    }
                }
                None => self.push_slot(data),
            }
        } else {
            self.push_slot(data)
        };

        for r in refs {
            self.link(r);
        }
        trace!(object = %id, "alloc");
        id
    }

    fn push_slot(&mut self, data: ObjectData) -> ObjectId {
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            roots: 1,
            edges: 0,
            data: Some(data),
        });
        ObjectId {
            index,
            generation: 0,
        }
    }

    fn slot(&self, id: ObjectId) -> Option<&Slot> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.is_live(id))
    }

    fn slot_mut(&mut self, id: ObjectId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.is_live(id))
    }

    pub(crate) fn data(&self, id: ObjectId) -> Option<&ObjectData> {
        self.slot(id).and_then(|slot| slot.data.as_ref())
    }

    pub(crate) fn data_mut(&mut self, id: ObjectId) -> Option<&mut ObjectData> {
        self.slot_mut(id).and_then(|slot| slot.data.as_mut())
    }

    /// Whether the handle still names a live object
    pub fn is_alive(&self, id: ObjectId) -> bool {
        self.slot(id).is_some()
    }

    /// Number of host handles currently held on `id`
    pub fn root_count(&self, id: ObjectId) -> u32 {
        self.slot(id).map_or(0, |slot| slot.roots)
    }

    /// Add a host handle. Returns false for a dead handle.
    pub fn retain(&mut self, id: ObjectId) -> bool {
        match self.slot_mut(id) {
            Some(slot) => {
                slot.roots += 1;
                true
            }
            None => false,
        }
    }

    /// Drop a host handle; destroys the object if nothing else refers to it.
    pub fn release(&mut self, id: ObjectId) {
        let Some(slot) = self.slot_mut(id) else {
            return;
        };
        if slot.roots == 0 {
            warn!(object = %id, "release of an object with no host handles");
            return;
        }
        slot.roots -= 1;
        if slot.roots == 0 {
            if slot.edges == 0 {
                self.pending.push(id);
            } else {
                self.suspects.push(id);
            }
        }
        self.flush();
    }

    /// Record a new reference from inside some object to `id`
    pub(crate) fn link(&mut self, id: ObjectId) {
        if let Some(slot) = self.slot_mut(id) {
            slot.edges += 1;
        }
    }

    /// Drop a reference from inside some object to `id`.
    ///
    /// Destruction is deferred to the next [`Heap::flush`].
    pub(crate) fn unlink(&mut self, id: ObjectId) {
        let Some(slot) = self.slot_mut(id) else {
            return;
        };
        slot.edges = slot.edges.saturating_sub(1);
        if slot.roots == 0 {
            if slot.edges == 0 {
                self.pending.push(id);
            } else {
                self.suspects.push(id);
            }
        }
    }

    pub(crate) fn link_value(&mut self, value: &Value) {
        value.for_each_ref(|r| self.link(r));
    }

    pub(crate) fn unlink_value(&mut self, value: &Value) {
        value.for_each_ref(|r| self.unlink(r));
    }

    /// Destroy everything whose counts dropped to zero, then collect cycles
    /// if a release may have orphaned one.
    pub(crate) fn flush(&mut self) {
        if self.flushing {
            return;
        }
        self.flushing = true;
        self.drain_pending();
        while !self.suspects.is_empty() {
            if !self.collect_cycles {
                self.suspects.clear();
                break;
            }
            self.collect_suspects();
            self.drain_pending();
        }
        self.flushing = false;
    }

    fn drain_pending(&mut self) {
        while let Some(id) = self.pending.pop() {
            let dead = self
                .slot(id)
                .is_some_and(|slot| slot.roots == 0 && slot.edges == 0);
            if dead {
                // Nothing refers to it, so there is nothing to unhook first
                self.destroy(id);
            }
        }
    }

    /// Free one object and drop the references it held
    fn destroy(&mut self, id: ObjectId) {
        let Some(slot) = self.slot_mut(id) else {
            return;
        };
        let data = slot.data.take();
        slot.generation = slot.generation.wrapping_add(1);
        slot.roots = 0;
        slot.edges = 0;
        self.free_list.push(id.index);
        trace!(object = %id, "destroyed");

        // Clearing the own property map releases what it referenced
        if let Some(data) = data {
            let mut refs = Vec::new();
            data.for_each_ref(|r| refs.push(r));
            drop(data);
            for r in refs {
                self.unlink(r);
            }
        }
    }

    /// Tear down a set of unreachable objects
    fn destroy_garbage(&mut self, garbage: &[ObjectId]) {
        let doomed: VisitedSet = garbage.iter().copied().collect();
        self.clear_refs(garbage, &doomed);
        for id in garbage {
            self.destroy(*id);
        }
    }

    /// Cycle-safe teardown traversal.
    ///
    /// Visits each object of `garbage` once and overwrites every property
    /// that refers into `doomed` with `undefined` in place. Live objects are
    /// never entered: nothing reachable from a root can refer to garbage.
    pub(crate) fn clear_refs(&mut self, garbage: &[ObjectId], doomed: &VisitedSet) {
        for &id in garbage {
            let Some(data) = self.data_mut(id) else {
                continue;
            };
            let mut dropped = Vec::new();
            for (_, property) in data.properties.iter_mut() {
                let mut hit = false;
                property.value.for_each_ref(|r| hit |= doomed.contains(&r));
                if hit {
                    dropped.push(std::mem::take(&mut property.value));
                }
            }
            self.traversed += 1;
            for value in dropped {
                self.unlink_value(&value);
            }
        }
    }

    // ========================================================================
    // Local cycle detection
    // ========================================================================

    /// Trial deletion over the unrooted subgraph reachable from the suspects.
    ///
    /// Every reference found inside the subgraph is subtracted from its
    /// target's edge count. Whatever keeps a positive count is referenced
    /// from outside (a rooted or otherwise live object) and is rescued along
    /// with everything it reaches; the rest is a dead cycle. Rooted objects
    /// bound the walk, so the cost is the size of the subgraph, not the heap.
    fn collect_suspects(&mut self) -> usize {
        let suspects = std::mem::take(&mut self.suspects);
        let mut trial = TrialCounts::default();
        let mut stack = Vec::new();
        for id in suspects {
            if trial.contains_key(&id) {
                continue;
            }
            if let Some(slot) = self.slot(id).filter(|slot| slot.roots == 0 && slot.edges > 0) {
                trial.insert(id, slot.edges);
                stack.push(id);
            }
        }

        let mut members = Vec::new();
        while let Some(id) = stack.pop() {
            members.push(id);
            let Some(data) = self.data(id) else {
                continue;
            };
            data.for_each_ref(|child| {
                if let Some(count) = trial.get_mut(&child) {
                    *count = count.saturating_sub(1);
                } else if let Some(slot) = self.slot(child).filter(|slot| slot.roots == 0) {
                    trial.insert(child, slot.edges.saturating_sub(1));
                    stack.push(child);
                }
            });
        }
        self.traversed += members.len() as u64;

        // Rescue everything an outside reference can still reach
        let mut rescued = VisitedSet::default();
        for &id in &members {
            if trial.get(&id).copied().unwrap_or(0) == 0 || rescued.contains(&id) {
                continue;
            }
            stack.push(id);
            while let Some(current) = stack.pop() {
                if !rescued.insert(current) {
                    continue;
                }
                if let Some(data) = self.data(current) {
                    data.for_each_ref(|child| {
                        if trial.contains_key(&child) {
                            stack.push(child);
                        }
                    });
                }
            }
        }
        self.traversed += rescued.len() as u64;

        let garbage: Vec<ObjectId> = members
            .into_iter()
            .filter(|id| !rescued.contains(id))
            .collect();
        if !garbage.is_empty() {
            self.destroy_garbage(&garbage);
            debug!(collected = garbage.len(), "cycle collection");
        }
        garbage.len()
    }

    // ========================================================================
    // Mark and sweep
    // ========================================================================

    /// Run a full collection: everything not reachable from a rooted object
    /// is torn down. Returns the number of objects destroyed.
    pub fn collect(&mut self) -> usize {
        let was_flushing = self.flushing;
        self.flushing = true;
        self.suspects.clear();
        let collected = self.collect_inner();
        self.drain_pending();
        self.suspects.clear();
        self.flushing = was_flushing;
        collected
    }

    fn mark(&mut self) {
        self.marked.clear();
        self.marked.resize(self.slots.len(), false);

        // Take ownership of the persistent stack to avoid borrow issues
        let mut stack = std::mem::take(&mut self.mark_stack);
        stack.clear();

        for (index, slot) in self.slots.iter().enumerate() {
            if slot.data.is_some() && slot.roots > 0 {
                stack.push(ObjectId {
                    index: index as u32,
                    generation: slot.generation,
                });
            }
        }

        while let Some(id) = stack.pop() {
            let index = id.index as usize;
            let Some(slot) = self.slots.get(index).filter(|slot| slot.is_live(id)) else {
                continue;
            };
            match self.marked.get_mut(index) {
                Some(bit) if !*bit => *bit = true,
                _ => continue,
            }
            self.traversed += 1;
            if let Some(data) = slot.data.as_ref() {
                data.for_each_ref(|child| stack.push(child));
            }
        }

        self.mark_stack = stack;
    }

    fn collect_inner(&mut self) -> usize {
        self.mark();

        let garbage: Vec<ObjectId> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(index, slot)| {
                slot.data.is_some() && !self.marked.get(*index).copied().unwrap_or(false)
            })
            .map(|(index, slot)| ObjectId {
                index: index as u32,
                generation: slot.generation,
            })
            .collect();

        if !garbage.is_empty() {
            self.destroy_garbage(&garbage);
            debug!(collected = garbage.len(), "full collection");
        }
        garbage.len()
    }

    /// Get statistics
    pub fn stats(&self) -> GcStats {
        let live_objects = self.slots.iter().filter(|s| s.data.is_some()).count();
        let rooted_objects = self
            .slots
            .iter()
            .filter(|s| s.data.is_some() && s.roots > 0)
            .count();
        GcStats {
            total_slots: self.slots.len(),
            free_slots: self.free_list.len(),
            live_objects,
            rooted_objects,
            traversed: self.traversed,
        }
    }

    /// Enable or disable synchronous cycle collection on release
    pub fn set_collect_cycles(&mut self, enabled: bool) {
        self.collect_cycles = enabled;
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Heap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Heap").field("stats", &self.stats()).finish()
    }
}

// ============================================================================
// GcStats - statistics about the heap
// ============================================================================

/// Statistics about the heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GcStats {
    /// Slots ever allocated (live plus free)
    pub total_slots: usize,
    /// Vacated slots available for reuse
    pub free_slots: usize,
    /// Live objects
    pub live_objects: usize,
    /// Live objects with at least one host handle
    pub rooted_objects: usize,
    /// Objects visited by cycle detection, marking and teardown so far
    pub traversed: u64,
}

// ============================================================================
// Tests
// ============================================================================
