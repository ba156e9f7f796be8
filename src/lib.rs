//! Linked sequence of memory-block records for a simulated allocator.
//!
//! ```
//! use memlist::{MemoryBlock, Sequence};
//!
//! let mut free_list = Sequence::new();
//! free_list.add_last(MemoryBlock::new(0, 100));
//! free_list.add_first(MemoryBlock::new(200, 50));
//! assert_eq!(free_list.describe(), "(200 , 50) (0 , 100)");
//! ```

pub mod memory;

pub use memory::{
    Bound, Entries, EntryHandle, InvariantViolation, Iter, MemoryBlock, Result, Sequence,
    SequenceConfig, SequenceError, SequenceStats,
};
