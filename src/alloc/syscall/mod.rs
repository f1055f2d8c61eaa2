//! Platform virtual memory primitives backing the graph arena.

#[cfg(unix)]
pub mod unix;

#[cfg(windows)]
pub mod windows;

#[cfg(unix)]
pub use unix::*;

#[cfg(windows)]
pub use windows::*;

/// Fallback page size when the platform query fails.
pub const DEFAULT_PAGE_SIZE: usize = 4096;
