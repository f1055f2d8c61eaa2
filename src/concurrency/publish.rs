//! Single-winner publication.
//!
//! [`FirstFinisher`] elects exactly one worker among those that found an
//! acyclic graph; [`ResultSlot`] holds the one value that winner publishes.

use std::sync::OnceLock;

use crossbeam_utils::CachePadded;

#[cfg(loom)]
use loom::sync::atomic::{AtomicU32, Ordering};
#[cfg(not(loom))]
use core::sync::atomic::{AtomicU32, Ordering};

/// Finished counter allowing exactly one claim.
///
/// The counter only ever moves from 0 to 1, so after any race it reads
/// exactly 1. Losers are counted separately.
#[derive(Debug)]
pub struct FirstFinisher {
    finished: CachePadded<AtomicU32>,
    late: CachePadded<AtomicU32>,
}

impl FirstFinisher {
    /// Creates an unclaimed counter.
    #[cfg(not(loom))]
    pub const fn new() -> Self {
        Self {
            finished: CachePadded::new(AtomicU32::new(0)),
            late: CachePadded::new(AtomicU32::new(0)),
        }
    }

    /// Creates an unclaimed counter.
    #[cfg(loom)]
    pub fn new() -> Self {
        Self {
            finished: CachePadded::new(AtomicU32::new(0)),
            late: CachePadded::new(AtomicU32::new(0)),
        }
    }

    /// Attempts to become the first finisher. Returns `true` for exactly one caller.
    #[inline]
    pub fn try_claim(&self) -> bool {
        let won = self.finished.compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire).is_ok();
        if !won {
            self.late.fetch_add(1, Ordering::Relaxed);
        }
        won
    }

    /// Value of the finished counter: 0 before the claim, 1 after.
    #[inline]
    pub fn finished(&self) -> u32 {
        self.finished.load(Ordering::Acquire)
    }

    /// Number of callers that lost the claim.
    #[inline]
    pub fn late_finishers(&self) -> u32 {
        self.late.load(Ordering::Relaxed)
    }
}

impl Default for FirstFinisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Write-once slot for the published result.
#[derive(Debug)]
pub struct ResultSlot<T> {
    value: OnceLock<T>,
}

impl<T> ResultSlot<T> {
    /// Creates an empty slot.
    pub const fn new() -> Self {
        Self {
            value: OnceLock::new(),
        }
    }

    /// Stores `value`, handing it back if the slot is already filled.
    ///
    /// # Errors
    /// Returns `value` unchanged when a result was already published.
    pub fn publish(&self, value: T) -> Result<(), T> {
        self.value.set(value)
    }

    /// Returns `true` once a value has been published.
    pub fn is_published(&self) -> bool {
        self.value.get().is_some()
    }

    /// Takes the published value out of the slot.
    pub fn take(&mut self) -> Option<T> {
        self.value.take()
    }
}

impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn only_first_claim_wins() {
        let finisher = FirstFinisher::new();
        assert_eq!(finisher.finished(), 0);
        assert!(finisher.try_claim());
        assert!(!finisher.try_claim());
        assert!(!finisher.try_claim());
        assert_eq!(finisher.finished(), 1);
        assert_eq!(finisher.late_finishers(), 2);
    }

    #[test]
    fn racing_claims_elect_one_winner() {
        let finisher = FirstFinisher::new();
        let threads = 8;
        let barrier = Barrier::new(threads);
        let wins: usize = thread::scope(|s| {
            let handles: Vec<_> = (0..threads)
                .map(|_| {
                    s.spawn(|| {
                        barrier.wait();
                        usize::from(finisher.try_claim())
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });
        assert_eq!(wins, 1);
        assert_eq!(finisher.finished(), 1);
        assert_eq!(finisher.late_finishers() as usize, threads - 1);
    }

    #[test]
    fn slot_accepts_one_value() {
        let mut slot = ResultSlot::new();
        assert!(!slot.is_published());
        assert_eq!(slot.publish(1), Ok(()));
        assert_eq!(slot.publish(2), Err(2));
        assert_eq!(slot.take(), Some(1));
        assert_eq!(slot.take(), None);
    }
}
