//! Vector index implementations.

pub mod memory;

pub use memory::MemoryIndex;
