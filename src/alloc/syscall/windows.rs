#![cfg(windows)]

use std::ptr;
use std::sync::OnceLock;
use windows_sys::Win32::System::Memory::{
    VirtualAlloc, VirtualFree, VirtualProtect, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE, PAGE_NOACCESS,
    PAGE_READWRITE,
};
use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

use super::DEFAULT_PAGE_SIZE;

/// Returns the system page size.
pub fn page_size() -> usize {
    static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
    *PAGE_SIZE.get_or_init(|| {
        // SAFETY: GetSystemInfo fully initializes the provided struct.
        let info: SYSTEM_INFO = unsafe {
            let mut info = core::mem::zeroed();
            GetSystemInfo(&mut info);
            info
        };
        let size = info.dwPageSize as usize;
        if size.is_power_of_two() { size } else { DEFAULT_PAGE_SIZE }
    })
}

/// Reserves and commits a zeroed read/write region of `size` bytes.
///
/// # Safety
/// `size` must be non-zero. The region must be released with [`free_region`].
pub unsafe fn allocate_region(size: usize) -> Option<*mut u8> {
    let ptr = VirtualAlloc(ptr::null_mut(), size, MEM_COMMIT | MEM_RESERVE, PAGE_READWRITE);
    if ptr.is_null() {
        None
    } else {
        Some(ptr as *mut u8)
    }
}

/// Releases a region obtained from [`allocate_region`].
///
/// # Safety
/// `ptr` must be the base of one live region.
pub unsafe fn free_region(ptr: *mut u8, _size: usize) {
    // MEM_RELEASE frees the entire region reserved by VirtualAlloc. Size must be 0.
    VirtualFree(ptr as *mut _, 0, MEM_RELEASE);
}

/// Makes a page-aligned sub-range inaccessible (`guard == true`) or read/write again.
///
/// # Safety
/// The range must lie within a live region and be page aligned.
pub unsafe fn protect_region(ptr: *mut u8, size: usize, guard: bool) -> bool {
    let prot = if guard { PAGE_NOACCESS } else { PAGE_READWRITE };
    let mut old_prot = 0;
    VirtualProtect(ptr as *mut _, size, prot, &mut old_prot) != 0
}
