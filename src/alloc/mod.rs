//! Memory backing the per-worker graphs.

pub mod arena;
pub mod syscall;

pub use arena::GraphArena;
