//! Forward cursors over a [`Sequence`].
//!
//! A cursor holds a shared borrow of its sequence, so the sequence cannot
//! be mutated while one is alive. Cursors cannot be rewound; call
//! [`Sequence::iter`] again to start over from the first entry.

use super::block::MemoryBlock;
use super::sequence::{EntryHandle, Sequence};
use std::iter::FusedIterator;

/// Yields every entry's handle and block, front to back
#[derive(Clone)]
pub struct Entries<'a> {
    sequence: &'a Sequence,
    current: Option<usize>,
    remaining: usize,
}

impl<'a> Entries<'a> {
    pub(super) fn new(sequence: &'a Sequence, first: Option<usize>, len: usize) -> Self {
        Self {
            sequence,
            current: first,
            remaining: len,
        }
    }
}

impl<'a> Iterator for Entries<'a> {
    type Item = (EntryHandle, &'a MemoryBlock);

    fn next(&mut self) -> Option<Self::Item> {
        let slot = self.current?;
        let sequence: &'a Sequence = self.sequence;
        match sequence.entry(slot) {
            Some(entry) => {
                self.current = entry.next;
                self.remaining = self.remaining.saturating_sub(1);
                Some((sequence.handle_for(slot), &entry.block))
            }
            None => {
                self.current = None;
                self.remaining = 0;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Entries<'_> {}

impl FusedIterator for Entries<'_> {}

/// Yields every block, front to back
#[derive(Clone)]
pub struct Iter<'a> {
    inner: Entries<'a>,
}

impl<'a> Iter<'a> {
    pub(super) fn new(inner: Entries<'a>) -> Self {
        Self { inner }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a MemoryBlock;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, block)| block)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_order() {
        let sequence: Sequence = (1..=3).map(|n| MemoryBlock::new(n, n)).collect();
        let bases: Vec<usize> = sequence.iter().map(|b| b.base_address()).collect();
        assert_eq!(bases, vec![1, 2, 3]);
    }

    #[test]
    fn test_exact_size_and_fused() {
        let sequence: Sequence = (0..4).map(|n| MemoryBlock::new(n, 1)).collect();
        let mut iter = sequence.iter();
        assert_eq!(iter.len(), 4);
        iter.next();
        assert_eq!(iter.len(), 3);
        for _ in iter.by_ref() {}
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_entries_yield_live_handles() {
        let mut sequence: Sequence = (0..3).map(|n| MemoryBlock::new(n, 1)).collect();
        let handles: Vec<EntryHandle> = sequence.entries().map(|(handle, _)| handle).collect();
        assert_eq!(handles[0], sequence.first().unwrap());
        assert_eq!(handles[2], sequence.last().unwrap());

        let removed = sequence.remove_entry(handles[1]).unwrap();
        assert_eq!(removed, MemoryBlock::new(1, 1));
        assert_eq!(sequence.describe(), "(0 , 1) (2 , 1)");
    }

    #[test]
    fn test_fresh_cursor_restarts() {
        let sequence: Sequence = (0..2).map(|n| MemoryBlock::new(n, 1)).collect();
        let mut first_pass = sequence.iter();
        first_pass.next();
        assert_eq!(sequence.iter().next(), Some(&MemoryBlock::new(0, 1)));
    }
}
