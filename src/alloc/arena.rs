//! One contiguous reservation holding every worker's graph.
//!
//! The region is laid out as
//! `[guard][slice 0][guard][slice 1][guard] … [slice K-1][guard]`, each slice
//! `layout.slice_bytes` long and each guard one page. With the `guard-pages`
//! feature the guards are made inaccessible so that an out-of-bounds write
//! from one worker faults instead of corrupting its neighbour. Without it the
//! guards are still reserved and the layout is identical.

use core::ptr::NonNull;

use tracing::debug;

use super::syscall;
use crate::error::{Result, SolveError};

/// Page-aligned arena of equally sized graph slices separated by guard pages.
pub struct GraphArena {
    base: NonNull<u8>,
    total_bytes: usize,
    slice_bytes: usize,
    guard_bytes: usize,
    slices: usize,
}

// SAFETY: the arena exclusively owns its mapping; slices are only handed out
// through `&mut self`.
unsafe impl Send for GraphArena {}
unsafe impl Sync for GraphArena {}

impl GraphArena {
    /// Reserves `slices` slices of `slice_bytes` bytes each (rounded up to the
    /// page size) plus `slices + 1` guard pages, in one call.
    ///
    /// # Errors
    /// [`SolveError::ArenaReservation`] if the size overflows or the
    /// platform refuses the mapping.
    pub fn reserve(slices: usize, slice_bytes: usize) -> Result<Self> {
        let page = syscall::page_size();
        let slice_bytes = slice_bytes.max(1).checked_next_multiple_of(page);
        let total = slice_bytes.and_then(|s| {
            s.checked_mul(slices)?.checked_add(page.checked_mul(slices.checked_add(1)?)?)
        });
        let (Some(slice_bytes), Some(total_bytes)) = (slice_bytes, total) else {
            return Err(SolveError::ArenaReservation { bytes: usize::MAX });
        };
        if slices == 0 {
            return Err(SolveError::ArenaReservation { bytes: 0 });
        }

        // SAFETY: total_bytes is non-zero; the region is released in Drop.
        let base = unsafe { syscall::allocate_region(total_bytes) }
            .and_then(NonNull::new)
            .ok_or(SolveError::ArenaReservation { bytes: total_bytes })?;

        let arena = Self {
            base,
            total_bytes,
            slice_bytes,
            guard_bytes: page,
            slices,
        };
        arena.protect_guards()?;

        debug!(slices, slice_bytes, total_bytes, "reserved graph arena");
        Ok(arena)
    }

    #[cfg(feature = "guard-pages")]
    fn protect_guards(&self) -> Result<()> {
        for offset in self.guard_offsets() {
            // SAFETY: every guard offset lies inside the mapping and is page aligned.
            let ok = unsafe {
                syscall::protect_region(self.base.as_ptr().add(offset), self.guard_bytes, true)
            };
            if !ok {
                return Err(SolveError::ArenaReservation {
                    bytes: self.total_bytes,
                });
            }
        }
        Ok(())
    }

    #[cfg(not(feature = "guard-pages"))]
    #[allow(clippy::unnecessary_wraps, clippy::unused_self)]
    fn protect_guards(&self) -> Result<()> {
        Ok(())
    }

    /// Number of slices.
    pub fn len(&self) -> usize {
        self.slices
    }

    /// Always `false`; an arena holds at least one slice.
    pub fn is_empty(&self) -> bool {
        self.slices == 0
    }

    /// Size of each slice in bytes.
    pub fn slice_bytes(&self) -> usize {
        self.slice_bytes
    }

    /// Size of the whole reservation, guards included.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Byte offset of slice `index` from the arena base.
    pub fn slice_offset(&self, index: usize) -> usize {
        self.guard_bytes + index * (self.slice_bytes + self.guard_bytes)
    }

    /// Byte offsets of every guard region.
    pub fn guard_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        (0..=self.slices).map(|i| i * (self.slice_bytes + self.guard_bytes))
    }

    /// Hands out every slice as an exclusive byte slice.
    pub fn slices_mut(&mut self) -> Vec<&mut [u8]> {
        (0..self.slices)
            .map(|i| {
                // SAFETY: slice `i` lies strictly between two guards inside the
                // mapping, slices are pairwise disjoint, and `&mut self` keeps the
                // mapping alive and unaliased for the returned lifetime.
                unsafe {
                    core::slice::from_raw_parts_mut(
                        self.base.as_ptr().add(self.slice_offset(i)),
                        self.slice_bytes,
                    )
                }
            })
            .collect()
    }
}

impl core::fmt::Debug for GraphArena {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GraphArena")
            .field("slices", &self.slices)
            .field("slice_bytes", &self.slice_bytes)
            .field("guard_bytes", &self.guard_bytes)
            .field("total_bytes", &self.total_bytes)
            .finish()
    }
}

impl Drop for GraphArena {
    fn drop(&mut self) {
        // SAFETY: base/total_bytes describe the mapping created in `reserve`.
        unsafe {
            syscall::free_region(self.base.as_ptr(), self.total_bytes);
        }
    }
}
