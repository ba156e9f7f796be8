use super::arena::{Entry, SlotArena};
use super::block::MemoryBlock;
use super::cursor::{Entries, Iter};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tracing::{debug, trace};

static NEXT_SEQUENCE_ID: AtomicU64 = AtomicU64::new(1);

/// Which index range an operation accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// `0..len`, used by lookups and removals
    Access,
    /// `0..=len`, used by insertion
    Insert,
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Access => f.write_str("0..len"),
            Bound::Insert => f.write_str("0..=len"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("Index {index} out of range {bound} for sequence of length {len}")]
    OutOfRange { index: usize, len: usize, bound: Bound },
    #[error("Entry handle no longer refers to a live entry")]
    InvalidHandle,
    #[error("Cannot remove an entry from an empty sequence")]
    EmptyStructure,
    #[error("No matching entry in this sequence")]
    NotFound,
}

pub type Result<T> = std::result::Result<T, SequenceError>;

/// Structural defects reported by [`Sequence::validate`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("Length is {len} but first present = {first}, last present = {last}")]
    EmptyMismatch { len: usize, first: bool, last: bool },
    #[error("Single-entry sequence has distinct first and last")]
    SingletonMismatch,
    #[error("Link points at vacant slot {0}")]
    DanglingLink(usize),
    #[error("Chain walk found {walked} entries, length says {len}")]
    LengthMismatch { len: usize, walked: usize },
    #[error("Chain ends at slot {walked_end:?}, last is {last:?}")]
    LastMismatch { last: Option<usize>, walked_end: Option<usize> },
    #[error("Arena holds {occupied} entries, length says {len}")]
    OccupiedMismatch { len: usize, occupied: usize },
    #[error("Free list records {recorded} slots, walk found {walked}")]
    FreeListMismatch { recorded: usize, walked: usize },
}

/// Opaque identity of one entry in one sequence.
///
/// Handles are cheap to copy and never dereference memory on their own. A
/// handle outlives its entry: once the entry is removed every copy of the
/// handle is rejected with [`SequenceError::InvalidHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryHandle {
    sequence_id: u64,
    slot: usize,
    generation: u32,
}

/// Configuration for sequence storage
#[derive(Debug, Clone)]
pub struct SequenceConfig {
    /// Number of entry slots reserved up front
    pub capacity: usize,
    /// Recycle slots vacated by removals. When false every handle ever
    /// issued stays distinguishable at the cost of never shrinking.
    pub reuse_slots: bool,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            capacity: 0,
            reuse_slots: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceStats {
    pub len: usize,
    pub slots: usize,
    pub free_slots: usize,
    /// `next` hops taken by positional and value lookups so far
    pub traversal_steps: u64,
}

/// Ordered, singly linked chain of memory blocks.
///
/// Both ends are reachable in O(1); everything else walks from the front.
/// Not synchronised: share it across threads only behind an external lock.
pub struct Sequence {
    id: u64,
    arena: SlotArena,
    first: Option<usize>,
    last: Option<usize>,
    len: usize,
    config: SequenceConfig,
    steps: Cell<u64>,
}

impl Sequence {
    /// Creates an empty sequence with the default configuration
    pub fn new() -> Self {
        Self::with_config(SequenceConfig::default())
    }

    pub fn with_config(config: SequenceConfig) -> Self {
        Self {
            id: NEXT_SEQUENCE_ID.fetch_add(1, Ordering::Relaxed),
            arena: SlotArena::with_capacity(config.capacity, config.reuse_slots),
            first: None,
            last: None,
            len: 0,
            config,
            steps: Cell::new(0),
        }
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn first(&self) -> Option<EntryHandle> {
        self.first.map(|slot| self.handle_for(slot))
    }

    pub fn last(&self) -> Option<EntryHandle> {
        self.last.map(|slot| self.handle_for(slot))
    }

    pub fn first_block(&self) -> Option<&MemoryBlock> {
        self.first.and_then(|slot| self.entry(slot)).map(|entry| &entry.block)
    }

    pub fn last_block(&self) -> Option<&MemoryBlock> {
        self.last.and_then(|slot| self.entry(slot)).map(|entry| &entry.block)
    }

    /// Returns the handle of the entry at `index`, walking from the front
    pub fn entry_at(&self, index: usize) -> Result<EntryHandle> {
        let slot = self.slot_at(index)?;
        Ok(self.handle_for(slot))
    }

    /// Returns the block held at `index`
    pub fn block_at(&self, index: usize) -> Result<&MemoryBlock> {
        let slot = self.slot_at(index)?;
        self.entry(slot)
            .map(|entry| &entry.block)
            .ok_or_else(|| self.out_of_range(index, Bound::Access))
    }

    /// Resolves a handle previously returned by this sequence
    pub fn block(&self, handle: EntryHandle) -> Result<&MemoryBlock> {
        if handle.sequence_id != self.id {
            return Err(SequenceError::NotFound);
        }
        if !self.arena.is_live(handle.slot, handle.generation) {
            return Err(SequenceError::InvalidHandle);
        }
        self.entry(handle.slot)
            .map(|entry| &entry.block)
            .ok_or(SequenceError::InvalidHandle)
    }

    /// Inserts `block` so that it ends up at position `index`.
    ///
    /// Entries previously at `index..len` shift one place towards the back.
    /// `index == len` appends, but unlike [`add_last`](Self::add_last) it
    /// walks to the predecessor first.
    pub fn insert(&mut self, index: usize, block: MemoryBlock) -> Result<EntryHandle> {
        if index > self.len {
            return Err(self.out_of_range(index, Bound::Insert));
        }
        if index == 0 {
            return Ok(self.add_first(block));
        }

        let prev = self
            .locate(index - 1)
            .ok_or_else(|| self.out_of_range(index, Bound::Insert))?;
        let next = self.entry(prev).and_then(|entry| entry.next);
        let (slot, generation) = self.arena.alloc(Entry { block, next });
        if let Some(entry) = self.arena.get_mut(prev) {
            entry.next = Some(slot);
        }
        if index == self.len {
            self.last = Some(slot);
        }
        self.len += 1;

        trace!(index, slot, len = self.len, "inserted entry");
        Ok(self.mint(slot, generation))
    }

    /// Makes `block` the new first entry in O(1)
    pub fn add_first(&mut self, block: MemoryBlock) -> EntryHandle {
        let (slot, generation) = self.arena.alloc(Entry {
            block,
            next: self.first,
        });
        self.first = Some(slot);
        if self.last.is_none() {
            self.last = Some(slot);
        }
        self.len += 1;

        trace!(slot, len = self.len, "added first entry");
        self.mint(slot, generation)
    }

    /// Makes `block` the new last entry in O(1)
    pub fn add_last(&mut self, block: MemoryBlock) -> EntryHandle {
        let (slot, generation) = self.arena.alloc(Entry { block, next: None });
        match self.last.and_then(|last| self.arena.get_mut(last)) {
            Some(tail) => tail.next = Some(slot),
            None => self.first = Some(slot),
        }
        self.last = Some(slot);
        self.len += 1;

        trace!(slot, len = self.len, "added last entry");
        self.mint(slot, generation)
    }

    /// Position of the first block equal to `block`, scanning from the front
    pub fn index_of(&self, block: &MemoryBlock) -> Option<usize> {
        let mut current = self.first;
        let mut index = 0;
        while let Some(entry) = current.and_then(|slot| self.entry(slot)) {
            if entry.block == *block {
                return Some(index);
            }
            current = entry.next;
            index += 1;
            self.hop();
        }
        None
    }

    pub fn contains(&self, block: &MemoryBlock) -> bool {
        self.index_of(block).is_some()
    }

    /// Unlinks the entry identified by `handle`.
    ///
    /// Identity, not value, decides the match: two entries holding equal
    /// blocks are told apart by their handles.
    pub fn remove_entry(&mut self, handle: EntryHandle) -> Result<MemoryBlock> {
        if self.is_empty() {
            debug!(?handle, "remove_entry on empty sequence");
            return Err(SequenceError::EmptyStructure);
        }
        if handle.sequence_id != self.id {
            debug!(?handle, sequence_id = self.id, "handle belongs to another sequence");
            return Err(SequenceError::NotFound);
        }
        if !self.arena.is_live(handle.slot, handle.generation) {
            debug!(?handle, "stale entry handle");
            return Err(SequenceError::InvalidHandle);
        }

        let mut prev = None;
        let mut current = self.first;
        while let Some(slot) = current {
            if slot == handle.slot {
                return self.unlink(prev, slot);
            }
            prev = Some(slot);
            current = self.entry(slot).and_then(|entry| entry.next);
            self.hop();
        }

        debug!(?handle, "live handle not reachable from first");
        Err(SequenceError::NotFound)
    }

    /// Removes the entry at `index` and returns its block
    pub fn remove_at(&mut self, index: usize) -> Result<MemoryBlock> {
        if index >= self.len {
            return Err(self.out_of_range(index, Bound::Access));
        }

        let (prev, slot) = if index == 0 {
            (None, self.first)
        } else {
            let prev = self.locate(index - 1);
            (prev, prev.and_then(|p| self.entry(p)).and_then(|entry| entry.next))
        };
        let slot = slot.ok_or_else(|| self.out_of_range(index, Bound::Access))?;
        self.unlink(prev, slot)
    }

    /// Removes the first entry, front to back, whose block equals `block`.
    /// Later duplicates are left in place.
    pub fn remove_block(&mut self, block: &MemoryBlock) -> Result<MemoryBlock> {
        let mut prev = None;
        let mut current = self.first;
        while let Some(slot) = current {
            let Some(entry) = self.entry(slot) else { break };
            if entry.block == *block {
                return self.unlink(prev, slot);
            }
            prev = Some(slot);
            current = entry.next;
            self.hop();
        }

        debug!(%block, "no entry holds block");
        Err(SequenceError::NotFound)
    }

    /// Removes every entry, invalidating all outstanding handles
    pub fn clear(&mut self) {
        let mut current = self.first.take();
        while let Some(slot) = current {
            current = self.arena.release(slot).and_then(|entry| entry.next);
        }
        self.last = None;
        self.len = 0;
    }

    /// Forward cursor over the blocks, front to back
    pub fn iter(&self) -> Iter<'_> {
        Iter::new(self.entries())
    }

    /// Forward cursor yielding each entry's handle along with its block
    pub fn entries(&self) -> Entries<'_> {
        Entries::new(self, self.first, self.len)
    }

    /// Space-separated rendering of every block in order
    pub fn describe(&self) -> String {
        self.to_string()
    }

    pub fn stats(&self) -> SequenceStats {
        SequenceStats {
            len: self.len,
            slots: self.arena.slot_count(),
            free_slots: self.arena.free_len(),
            traversal_steps: self.steps.get(),
        }
    }

    /// Walks the whole chain and checks every structural invariant
    pub fn validate(&self) -> std::result::Result<(), InvariantViolation> {
        if (self.len == 0) != (self.first.is_none() && self.last.is_none())
            || self.first.is_none() != self.last.is_none()
        {
            return Err(InvariantViolation::EmptyMismatch {
                len: self.len,
                first: self.first.is_some(),
                last: self.last.is_some(),
            });
        }
        if self.len == 1 && self.first != self.last {
            return Err(InvariantViolation::SingletonMismatch);
        }

        let mut walked = 0;
        let mut end = None;
        let mut current = self.first;
        while let Some(slot) = current {
            let entry = self.entry(slot).ok_or(InvariantViolation::DanglingLink(slot))?;
            walked += 1;
            if walked > self.len {
                // Longer than recorded, possibly a cycle
                return Err(InvariantViolation::LengthMismatch {
                    len: self.len,
                    walked,
                });
            }
            end = Some(slot);
            current = entry.next;
        }
        if walked != self.len {
            return Err(InvariantViolation::LengthMismatch {
                len: self.len,
                walked,
            });
        }
        if end != self.last {
            return Err(InvariantViolation::LastMismatch {
                last: self.last,
                walked_end: end,
            });
        }

        let occupied = self.arena.occupied_len();
        if occupied != self.len {
            return Err(InvariantViolation::OccupiedMismatch {
                len: self.len,
                occupied,
            });
        }
        let recorded = self.arena.free_len();
        let free_walked = self.arena.walk_free_list();
        if recorded != free_walked {
            return Err(InvariantViolation::FreeListMismatch {
                recorded,
                walked: free_walked,
            });
        }
        Ok(())
    }

    pub(super) fn entry(&self, slot: usize) -> Option<&Entry> {
        self.arena.get(slot)
    }

    pub(super) fn handle_for(&self, slot: usize) -> EntryHandle {
        let generation = self.arena.generation(slot).unwrap_or_default();
        self.mint(slot, generation)
    }

    fn mint(&self, slot: usize, generation: u32) -> EntryHandle {
        EntryHandle {
            sequence_id: self.id,
            slot,
            generation,
        }
    }

    fn slot_at(&self, index: usize) -> Result<usize> {
        if index >= self.len {
            return Err(self.out_of_range(index, Bound::Access));
        }
        self.locate(index)
            .ok_or_else(|| self.out_of_range(index, Bound::Access))
    }

    /// Slot at `index`, reached by following links from the front
    fn locate(&self, index: usize) -> Option<usize> {
        let mut current = self.first;
        for _ in 0..index {
            current = current.and_then(|slot| self.entry(slot)).and_then(|entry| entry.next);
            self.hop();
        }
        current
    }

    /// Detaches `slot`, whose predecessor is `prev`. Nothing is modified
    /// unless the slot is occupied.
    fn unlink(&mut self, prev: Option<usize>, slot: usize) -> Result<MemoryBlock> {
        let entry = self.arena.release(slot).ok_or(SequenceError::InvalidHandle)?;
        match prev.and_then(|p| self.arena.get_mut(p)) {
            Some(prev_entry) => prev_entry.next = entry.next,
            None => self.first = entry.next,
        }
        if self.last == Some(slot) {
            self.last = prev;
        }
        self.len -= 1;

        trace!(slot, len = self.len, "removed entry");
        Ok(entry.block)
    }

    fn out_of_range(&self, index: usize, bound: Bound) -> SequenceError {
        SequenceError::OutOfRange {
            index,
            len: self.len,
            bound,
        }
    }

    fn hop(&self) {
        self.steps.set(self.steps.get() + 1);
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Sequence {
    /// The copy gets its own identity, so handles from `self` are foreign to it
    fn clone(&self) -> Self {
        Self {
            id: NEXT_SEQUENCE_ID.fetch_add(1, Ordering::Relaxed),
            arena: self.arena.clone(),
            first: self.first,
            last: self.last,
            len: self.len,
            config: self.config.clone(),
            steps: Cell::new(0),
        }
    }
}

impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, block) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", block)?;
        }
        Ok(())
    }
}

impl PartialEq for Sequence {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl Eq for Sequence {}

impl FromIterator<MemoryBlock> for Sequence {
    fn from_iter<I: IntoIterator<Item = MemoryBlock>>(iter: I) -> Self {
        let mut sequence = Sequence::new();
        sequence.extend(iter);
        sequence
    }
}

impl Extend<MemoryBlock> for Sequence {
    fn extend<I: IntoIterator<Item = MemoryBlock>>(&mut self, iter: I) {
        for block in iter {
            self.add_last(block);
        }
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a MemoryBlock;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for Sequence {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for Sequence {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let blocks = Vec::<MemoryBlock>::deserialize(deserializer)?;
        Ok(blocks.into_iter().collect())
    }
}
