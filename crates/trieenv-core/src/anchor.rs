//! Anchor chain: keeps every bound value reachable by the host collector.
//!
//! The trie's nodes are opaque to the collector, so the trie stores only an
//! [`AnchorId`] per key. The value itself lives in an [`Anchor`] owned by
//! this chain, and the chain is what the collector traces (see [`GcTrace`]).
//!
//! Anchors are threaded into a doubly-linked list, newest first:
//!
//! ```text
//! head ──older──▶ a3 ──older──▶ a2 ──older──▶ a1 ──older──▶ (root)
//!      (none)◀──newer── a3 ◀──newer── a2 ◀──newer── a1
//! ```
//!
//! Walking `older` from the head visits every live anchor exactly once and
//! stops at the root. Every `older` link has a matching `newer` link, so any
//! anchor can be unlinked in O(1).
//!
//! Anchors are stored in a slot arena with generation counters; an id whose
//! anchor was removed (and whose slot may have been reused) is rejected.

use std::mem;

use hashbrown::HashSet;

use crate::error::{StoreError, StoreResult};
use crate::gc::GcTrace;

/// Handle to an anchor: arena slot plus the generation it was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnchorId {
    index: u32,
    generation: u32,
}

impl AnchorId {
    /// Arena slot index.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Generation the handle was issued for.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    fn stale(&self) -> StoreError {
        StoreError::StaleAnchor { index: self.index, generation: self.generation }
    }
}

/// Wrapper node that keeps one value reachable.
#[derive(Debug, Clone)]
pub struct Anchor<V> {
    /// Anchor inserted after this one; `None` for the head
    newer: Option<AnchorId>,
    /// Anchor inserted before this one; `None` means the root
    older: Option<AnchorId>,
    value: V,
}

impl<V> Anchor<V> {
    pub fn newer(&self) -> Option<AnchorId> {
        self.newer
    }

    pub fn older(&self) -> Option<AnchorId> {
        self.older
    }

    pub fn value(&self) -> &V {
        &self.value
    }
}

enum Slot<V> {
    Occupied { generation: u32, anchor: Anchor<V> },
    Vacant { generation: u32, next_free: Option<u32> },
}

/// Doubly-linked anchor list rooted in a collector-visible object.
pub struct AnchorChain<V> {
    slots: Vec<Slot<V>>,
    /// Most recently vacated slot
    free_head: Option<u32>,
    /// Newest anchor; `None` when the chain is empty
    head: Option<AnchorId>,
    len: usize,
}

impl<V> AnchorChain<V> {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self { slots: Vec::new(), free_head: None, head: None, len: 0 }
    }

    /// Create an empty chain with room for `capacity` anchors.
    pub fn with_capacity(capacity: usize) -> StoreResult<Self> {
        let mut slots = Vec::new();
        slots
            .try_reserve(capacity)
            .map_err(|_| StoreError::oom("anchor", capacity))?;
        Ok(Self { slots, free_head: None, head: None, len: 0 })
    }

    /// Number of live anchors.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no anchors are live.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Newest anchor.
    pub fn head(&self) -> Option<AnchorId> {
        self.head
    }

    /// Look up a live anchor.
    pub fn anchor(&self, id: AnchorId) -> Option<&Anchor<V>> {
        match self.slots.get(id.index as usize)? {
            Slot::Occupied { generation, anchor } if *generation == id.generation => Some(anchor),
            _ => None,
        }
    }

    /// Value held by a live anchor.
    pub fn get(&self, id: AnchorId) -> Option<&V> {
        self.anchor(id).map(|a| &a.value)
    }

    /// Link a new anchor for `value` in as the head.
    pub fn insert(&mut self, value: V) -> StoreResult<AnchorId> {
        let older = self.head;
        if let Some(prev) = older {
            if self.anchor(prev).is_none() {
                return Err(dangling(prev));
            }
        }

        let id = self.alloc(Anchor { newer: None, older, value })?;
        if let Some(prev) = older {
            // The displaced head learns who displaced it.
            self.anchor_mut(prev).ok_or_else(|| dangling(prev))?.newer = Some(id);
        }
        self.head = Some(id);
        self.len += 1;
        Ok(id)
    }

    /// Replace the value of a live anchor, returning the old one.
    /// The anchor keeps its position in the chain.
    pub fn update(&mut self, id: AnchorId, value: V) -> StoreResult<V> {
        let anchor = self.anchor_mut(id).ok_or_else(|| id.stale())?;
        Ok(mem::replace(&mut anchor.value, value))
    }

    /// Unlink and discard an anchor, returning its value.
    pub fn remove(&mut self, id: AnchorId) -> StoreResult<V> {
        let (newer, older) = {
            let anchor = self.anchor(id).ok_or_else(|| id.stale())?;
            (anchor.newer, anchor.older)
        };

        match newer {
            Some(n) => self.anchor_mut(n).ok_or_else(|| dangling(n))?.older = older,
            None => self.head = older,
        }
        if let Some(o) = older {
            self.anchor_mut(o).ok_or_else(|| dangling(o))?.newer = newer;
        }

        let vacated = Slot::Vacant {
            generation: id.generation.wrapping_add(1),
            next_free: self.free_head,
        };
        let Slot::Occupied { anchor, .. } = mem::replace(&mut self.slots[id.index as usize], vacated) else {
            return Err(id.stale());
        };
        self.free_head = Some(id.index);
        self.len -= 1;
        Ok(anchor.value)
    }

    /// Walk from the head towards the root.
    pub fn iter(&self) -> ChainIter<'_, V> {
        ChainIter { chain: self, cursor: self.head, remaining: self.len }
    }

    /// Check the chain's structural invariants:
    ///
    /// - the walk from head via `older` ends at the root without revisiting
    /// - every `older` link is mirrored by a `newer` link, and the head has no `newer`
    /// - the walk visits exactly `len()` anchors and no occupied slot is left out
    pub fn verify(&self) -> StoreResult<()> {
        let mut seen = HashSet::with_capacity(self.len);
        let mut above: Option<AnchorId> = None;
        let mut cursor = self.head;

        while let Some(id) = cursor {
            let anchor = self.anchor(id).ok_or_else(|| dangling(id))?;
            if !seen.insert(id) {
                return Err(corrupted(id.index, "cycle in older links"));
            }
            if anchor.newer != above {
                return Err(corrupted(
                    id.index,
                    format!("newer link is {:?}, expected {:?}", anchor.newer, above),
                ));
            }
            above = Some(id);
            cursor = anchor.older;
        }

        let occupied = self
            .slots
            .iter()
            .filter(|s| matches!(s, Slot::Occupied { .. }))
            .count();
        if seen.len() != self.len || occupied != self.len {
            return Err(corrupted(
                self.head.map_or(0, |h| h.index),
                format!(
                    "walk visited {} anchors, {} slots occupied, chain length {}",
                    seen.len(),
                    occupied,
                    self.len
                ),
            ));
        }
        Ok(())
    }

    /// Discard every anchor.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free_head = None;
        self.head = None;
        self.len = 0;
    }

    /// Approximate heap bytes held by the arena.
    pub fn memory_usage(&self) -> usize {
        self.slots.capacity() * mem::size_of::<Slot<V>>()
    }

    fn anchor_mut(&mut self, id: AnchorId) -> Option<&mut Anchor<V>> {
        match self.slots.get_mut(id.index as usize)? {
            Slot::Occupied { generation, anchor } if *generation == id.generation => Some(anchor),
            _ => None,
        }
    }

    fn alloc(&mut self, anchor: Anchor<V>) -> StoreResult<AnchorId> {
        if let Some(index) = self.free_head {
            let (generation, next_free) = match self.slots[index as usize] {
                Slot::Vacant { generation, next_free } => (generation, next_free),
                Slot::Occupied { .. } => {
                    return Err(corrupted(index, "free list points at an occupied slot"));
                }
            };
            self.slots[index as usize] = Slot::Occupied { generation, anchor };
            self.free_head = next_free;
            return Ok(AnchorId { index, generation });
        }

        if self.slots.len() >= u32::MAX as usize {
            return Err(StoreError::oom("anchor", 1));
        }
        self.slots.try_reserve(1).map_err(|_| StoreError::oom("anchor", 1))?;
        let index = self.slots.len() as u32;
        self.slots.push(Slot::Occupied { generation: 0, anchor });
        Ok(AnchorId { index, generation: 0 })
    }
}

impl<V> Default for AnchorChain<V> {
    fn default() -> Self { Self::new() }
}

impl<V: Clone> GcTrace<V> for AnchorChain<V> {
    fn trace_roots(&self, roots: &mut Vec<V>) {
        roots.reserve(self.len);
        roots.extend(self.iter().map(|(_, v)| v.clone()));
    }
}

impl<V> std::fmt::Debug for AnchorChain<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnchorChain")
            .field("len", &self.len)
            .field("head", &self.head)
            .finish()
    }
}

fn corrupted(index: u32, reason: impl Into<String>) -> StoreError {
    StoreError::ChainCorrupted { index, reason: reason.into() }
}

fn dangling(id: AnchorId) -> StoreError {
    corrupted(id.index, format!("link to vacant or reused slot (generation {})", id.generation))
}

/// Iterator from the head towards the root, newest first.
pub struct ChainIter<'a, V> {
    chain: &'a AnchorChain<V>,
    cursor: Option<AnchorId>,
    /// Caps the walk at `len()` steps even if the links are broken
    remaining: usize,
}

impl<'a, V> Iterator for ChainIter<'a, V> {
    type Item = (AnchorId, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let id = self.cursor?;
        let anchor = self.chain.anchor(id)?;
        self.cursor = anchor.older;
        self.remaining -= 1;
        Some((id, &anchor.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}
