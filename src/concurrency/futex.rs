//! Blocking wait on a 32-bit atomic word.
//!
//! Linux uses `futex(2)`, Windows uses `WaitOnAddress`; elsewhere the waiter
//! spins with [`Backoff`] and falls back to yielding. Every wait may return
//! spuriously, so callers re-check their condition in a loop.

use core::sync::atomic::{AtomicU32, Ordering};

#[cfg(not(any(windows, target_os = "linux")))]
use crossbeam_utils::Backoff;

#[cfg(windows)]
use windows_sys::Win32::System::Threading::{WaitOnAddress, WakeByAddressAll, INFINITE};

#[cfg(target_os = "linux")]
use libc::{SYS_futex, FUTEX_PRIVATE_FLAG, FUTEX_WAIT, FUTEX_WAKE};

/// Blocks while `addr` still holds `expected`.
#[inline]
pub fn wait_on_u32(addr: &AtomicU32, expected: u32) {
    if addr.load(Ordering::Acquire) != expected {
        return;
    }

    #[cfg(target_os = "linux")]
    // SAFETY: `addr` is a live, aligned u32 for the duration of the call.
    unsafe {
        libc::syscall(
            SYS_futex,
            addr.as_ptr(),
            FUTEX_WAIT | FUTEX_PRIVATE_FLAG,
            expected,
            core::ptr::null::<libc::timespec>(),
        );
    }

    #[cfg(windows)]
    // SAFETY: both pointers are valid for four bytes for the duration of the call.
    unsafe {
        let expected_ptr = (&expected as *const u32).cast();
        WaitOnAddress(
            addr.as_ptr().cast_const().cast(),
            expected_ptr,
            core::mem::size_of::<u32>(),
            INFINITE,
        );
    }

    #[cfg(not(any(windows, target_os = "linux")))]
    {
        let backoff = Backoff::new();
        while addr.load(Ordering::Acquire) == expected {
            if backoff.is_completed() {
                std::thread::yield_now();
            } else {
                backoff.snooze();
            }
        }
    }
}

/// Wakes every thread blocked in [`wait_on_u32`] on `addr`.
#[inline]
pub fn wake_all_u32(addr: &AtomicU32) {
    #[cfg(target_os = "linux")]
    // SAFETY: `addr` is a live, aligned u32.
    unsafe {
        libc::syscall(SYS_futex, addr.as_ptr(), FUTEX_WAKE | FUTEX_PRIVATE_FLAG, i32::MAX);
    }

    #[cfg(windows)]
    // SAFETY: `addr` is a live, aligned u32.
    unsafe {
        WakeByAddressAll(addr.as_ptr().cast_const().cast());
    }

    #[cfg(not(any(windows, target_os = "linux")))]
    let _ = addr;
}
