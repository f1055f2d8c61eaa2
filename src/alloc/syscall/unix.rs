#![cfg(unix)]

use libc::{
    c_void, mmap, mprotect, munmap, MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_NONE, PROT_READ,
    PROT_WRITE,
};
use std::ptr;
use std::sync::OnceLock;

use super::DEFAULT_PAGE_SIZE;

/// Returns the system page size.
pub fn page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(|| {
        // SAFETY: sysconf has no preconditions.
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        usize::try_from(size).ok().filter(|s| s.is_power_of_two()).unwrap_or(DEFAULT_PAGE_SIZE)
    })
}

/// Reserves and commits a zeroed read/write region of `size` bytes.
/// Returns a pointer to the start of the region, or None if allocation failed.
///
/// # Safety
/// `size` must be non-zero. The region must be released with [`free_region`].
pub unsafe fn allocate_region(size: usize) -> Option<*mut u8> {
    let ptr = mmap(
        ptr::null_mut(),
        size,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
    );

    if ptr == MAP_FAILED {
        None
    } else {
        Some(ptr as *mut u8)
    }
}

/// Releases a region obtained from [`allocate_region`].
///
/// # Safety
/// `ptr` and `size` must describe exactly one live region.
pub unsafe fn free_region(ptr: *mut u8, size: usize) {
    munmap(ptr as *mut c_void, size);
}

/// Makes a page-aligned sub-range inaccessible (`guard == true`) or read/write again.
///
/// # Safety
/// The range must lie within a live region and be page aligned.
pub unsafe fn protect_region(ptr: *mut u8, size: usize, guard: bool) -> bool {
    let prot = if guard { PROT_NONE } else { PROT_READ | PROT_WRITE };
    mprotect(ptr as *mut c_void, size, prot) == 0
}
