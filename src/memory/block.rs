use serde::{Deserialize, Serialize};
use std::fmt;

/// A contiguous region of the simulated heap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryBlock {
    base_address: usize, // first word of the region
    length: usize,       // number of words
}

impl MemoryBlock {
    /// Creates a block starting at `base_address` spanning `length` words
    pub fn new(base_address: usize, length: usize) -> Self {
        Self {
            base_address,
            length,
        }
    }

    // Getters
    pub fn base_address(&self) -> usize { self.base_address }
    pub fn length(&self) -> usize { self.length }

    /// One past the last address covered by this block
    pub fn end_address(&self) -> usize {
        self.base_address.saturating_add(self.length)
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Checks whether `address` falls inside the block
    pub fn contains(&self, address: usize) -> bool {
        address >= self.base_address && address < self.end_address()
    }

    /// True when `other` begins exactly where this block ends, or vice versa
    pub fn is_adjacent_to(&self, other: &MemoryBlock) -> bool {
        self.end_address() == other.base_address || other.end_address() == self.base_address
    }
}

impl fmt::Display for MemoryBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} , {})", self.base_address, self.length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_creation() {
        let block = MemoryBlock::new(20, 80);
        assert_eq!(block.base_address(), 20);
        assert_eq!(block.length(), 80);
        assert_eq!(block.end_address(), 100);
        assert!(!block.is_empty());
    }

    #[test]
    fn test_value_equality() {
        assert_eq!(MemoryBlock::new(5, 10), MemoryBlock::new(5, 10));
        assert_ne!(MemoryBlock::new(5, 10), MemoryBlock::new(5, 11));
    }

    #[test]
    fn test_contains_and_adjacency() {
        let a = MemoryBlock::new(0, 10);
        let b = MemoryBlock::new(10, 5);
        assert!(a.contains(0));
        assert!(a.contains(9));
        assert!(!a.contains(10));
        assert!(a.is_adjacent_to(&b));
        assert!(b.is_adjacent_to(&a));
        assert!(!a.is_adjacent_to(&MemoryBlock::new(11, 1)));
    }

    #[test]
    fn test_end_address_saturates() {
        let block = MemoryBlock::new(usize::MAX - 1, 10);
        assert_eq!(block.end_address(), usize::MAX);
    }

    #[test]
    fn test_display() {
        assert_eq!(MemoryBlock::new(0, 100).to_string(), "(0 , 100)");
    }
}
