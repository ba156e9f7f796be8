//! Slot storage backing a [`Sequence`](super::Sequence).
//!
//! Entries live in a `Vec` of slots addressed by index. Vacant slots are
//! threaded into a free list and recycled by later insertions. Every slot
//! carries a generation that is bumped when its entry is released, so an
//! `(index, generation)` pair names exactly one entry for its whole life.

use super::block::MemoryBlock;

/// A link in the chain: one block plus the slot of its successor
#[derive(Debug, Clone)]
pub(super) struct Entry {
    pub block: MemoryBlock,
    pub next: Option<usize>,
}

#[derive(Debug, Clone)]
enum SlotState {
    Occupied(Entry),
    Vacant { next_free: Option<usize> },
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    state: SlotState,
}

#[derive(Debug, Clone)]
pub(super) struct SlotArena {
    slots: Vec<Slot>,
    free_head: Option<usize>,
    free_len: usize,
    reuse: bool,
}

impl SlotArena {
    pub fn with_capacity(capacity: usize, reuse: bool) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_head: None,
            free_len: 0,
            reuse,
        }
    }

    /// Stores `entry` and returns its slot index and generation
    pub fn alloc(&mut self, entry: Entry) -> (usize, u32) {
        if let Some(index) = self.free_head {
            let slot = &mut self.slots[index];
            if let SlotState::Vacant { next_free } = slot.state {
                self.free_head = next_free;
                self.free_len -= 1;
                slot.state = SlotState::Occupied(entry);
                return (index, slot.generation);
            }
        }

        let index = self.slots.len();
        self.slots.push(Slot {
            generation: 0,
            state: SlotState::Occupied(entry),
        });
        (index, 0)
    }

    /// Vacates `index`, returning the entry it held
    pub fn release(&mut self, index: usize) -> Option<Entry> {
        let slot = self.slots.get_mut(index)?;
        if !matches!(slot.state, SlotState::Occupied(_)) {
            return None;
        }

        let next_free = if self.reuse { self.free_head } else { None };
        let previous = std::mem::replace(&mut slot.state, SlotState::Vacant { next_free });
        slot.generation = slot.generation.wrapping_add(1);
        if self.reuse {
            self.free_head = Some(index);
            self.free_len += 1;
        }

        match previous {
            SlotState::Occupied(entry) => Some(entry),
            SlotState::Vacant { .. } => None,
        }
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        match &self.slots.get(index)?.state {
            SlotState::Occupied(entry) => Some(entry),
            SlotState::Vacant { .. } => None,
        }
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Entry> {
        match &mut self.slots.get_mut(index)?.state {
            SlotState::Occupied(entry) => Some(entry),
            SlotState::Vacant { .. } => None,
        }
    }

    /// True if `index` is occupied and still at `generation`
    pub fn is_live(&self, index: usize, generation: u32) -> bool {
        self.slots
            .get(index)
            .map(|slot| slot.generation == generation && matches!(slot.state, SlotState::Occupied(_)))
            .unwrap_or(false)
    }

    pub fn generation(&self, index: usize) -> Option<u32> {
        self.slots.get(index).map(|slot| slot.generation)
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn free_len(&self) -> usize {
        self.free_len
    }

    pub fn occupied_len(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.state, SlotState::Occupied(_)))
            .count()
    }

    /// Length of the free list as reached by following its links
    pub fn walk_free_list(&self) -> usize {
        let mut count = 0;
        let mut cursor = self.free_head;
        while let Some(index) = cursor {
            match self.slots.get(index).map(|slot| &slot.state) {
                Some(SlotState::Vacant { next_free }) => cursor = *next_free,
                _ => break,
            }
            count += 1;
            if count > self.slots.len() {
                break;
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(base: usize) -> Entry {
        Entry {
            block: MemoryBlock::new(base, 1),
            next: None,
        }
    }

    #[test]
    fn test_release_bumps_generation() {
        let mut arena = SlotArena::with_capacity(4, true);
        let (index, generation) = arena.alloc(entry(0));
        assert!(arena.is_live(index, generation));

        let released = arena.release(index).unwrap();
        assert_eq!(released.block, MemoryBlock::new(0, 1));
        assert!(!arena.is_live(index, generation));
        assert_eq!(arena.generation(index), Some(generation + 1));
        assert!(arena.release(index).is_none());
    }

    #[test]
    fn test_vacant_slots_are_recycled() {
        let mut arena = SlotArena::with_capacity(0, true);
        let (a, _) = arena.alloc(entry(0));
        let (b, _) = arena.alloc(entry(1));
        arena.release(a);
        arena.release(b);
        assert_eq!(arena.free_len(), 2);
        assert_eq!(arena.walk_free_list(), 2);

        // Most recently released slot comes back first
        let (c, generation) = arena.alloc(entry(2));
        assert_eq!(c, b);
        assert_eq!(generation, 1);
        assert_eq!(arena.slot_count(), 2);
        assert_eq!(arena.free_len(), 1);
    }

    #[test]
    fn test_no_reuse_keeps_slots_vacant() {
        let mut arena = SlotArena::with_capacity(0, false);
        let (a, _) = arena.alloc(entry(0));
        arena.release(a);
        assert_eq!(arena.free_len(), 0);

        let (b, _) = arena.alloc(entry(1));
        assert_ne!(a, b);
        assert_eq!(arena.slot_count(), 2);
        assert_eq!(arena.occupied_len(), 1);
    }
}
