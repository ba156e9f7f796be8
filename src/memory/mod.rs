//! Ordered bookkeeping of memory blocks for the simulated heap.

mod arena;
pub mod block;
pub mod cursor;
pub mod sequence;

pub use block::MemoryBlock;
pub use cursor::{Entries, Iter};
pub use sequence::{
    Bound, EntryHandle, InvariantViolation, Result, Sequence, SequenceConfig, SequenceError,
    SequenceStats,
};
