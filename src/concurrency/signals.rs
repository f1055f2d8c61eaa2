//! Solver-wide signals in one atomic word.
//!
//! Four binary signals share a single cache-padded `AtomicU32`, so a waiter
//! can block on any subset of them with one futex wait. Signals are sticky:
//! once raised they stay raised until lowered or taken with
//! [`SolverSignals::take_all`].

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use crossbeam_utils::CachePadded;
use serde::Serialize;

use super::futex::{wait_on_u32, wake_all_u32};

/// One solver signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Signal {
    /// A worker published a verified table.
    Succeeded = 1 << 0,
    /// A worker hit a fatal error.
    Failed = 1 << 1,
    /// Every worker must stop at its next retry.
    Shutdown = 1 << 2,
    /// The last active worker has exited.
    CompletedAll = 1 << 3,
}

impl Signal {
    /// Every signal, in bit order.
    pub const ALL: [Signal; 4] = [
        Self::Succeeded,
        Self::Failed,
        Self::Shutdown,
        Self::CompletedAll,
    ];

    #[inline]
    const fn bit(self) -> u32 {
        self as u32
    }
}

/// A set of signals.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct SignalSet(u32);

impl SignalSet {
    /// The empty set.
    pub const EMPTY: SignalSet = SignalSet(0);
    /// Every signal; what the orchestrator waits on.
    pub const TERMINAL: SignalSet = SignalSet(0b1111);

    /// Returns `true` if `signal` is in the set.
    #[inline]
    pub const fn contains(self, signal: Signal) -> bool {
        self.0 & signal.bit() != 0
    }

    /// Returns `true` if no signal is in the set.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the set with `signal` added.
    #[inline]
    #[must_use]
    pub const fn with(self, signal: Signal) -> Self {
        Self(self.0 | signal.bit())
    }

    const fn intersect(self, other: SignalSet) -> Self {
        Self(self.0 & other.0)
    }
}

impl From<Signal> for SignalSet {
    fn from(signal: Signal) -> Self {
        Self(signal.bit())
    }
}

impl fmt::Debug for SignalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(Signal::ALL.iter().filter(|s| self.contains(**s))).finish()
    }
}

/// Global solver state derived from the raised signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverState {
    /// No terminal signal raised yet.
    Running,
    /// A table was published.
    Succeeded,
    /// A worker failed fatally.
    Failed,
    /// Shutdown was requested before any outcome.
    ShutdownRequested,
    /// Every worker exited without an outcome.
    Completed,
}

/// The shared signal word.
#[derive(Default)]
pub struct SolverSignals {
    word: CachePadded<AtomicU32>,
}

impl SolverSignals {
    /// Creates a set with no signal raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises `signal` and wakes every waiter. Returns `true` if it was not
    /// already raised.
    pub fn raise(&self, signal: Signal) -> bool {
        let previous = self.word.fetch_or(signal.bit(), Ordering::AcqRel);
        wake_all_u32(&self.word);
        previous & signal.bit() == 0
    }

    /// Non-blocking snapshot of the raised signals.
    #[inline]
    pub fn poll(&self) -> SignalSet {
        SignalSet(self.word.load(Ordering::Acquire))
    }

    /// Returns `true` if `signal` is raised.
    #[inline]
    pub fn is_raised(&self, signal: Signal) -> bool {
        self.poll().contains(signal)
    }

    /// Blocks until at least one signal in `mask` is raised and returns the
    /// raised members of `mask`.
    pub fn wait_any(&self, mask: SignalSet) -> SignalSet {
        loop {
            let current = self.word.load(Ordering::Acquire);
            let hit = SignalSet(current).intersect(mask);
            if !hit.is_empty() {
                return hit;
            }
            wait_on_u32(&self.word, current);
        }
    }

    /// Lowers `signal`. Waiters are not woken.
    pub fn lower(&self, signal: Signal) {
        self.word.fetch_and(!signal.bit(), Ordering::AcqRel);
    }

    /// Lowers every signal and returns the set that was raised, in one step.
    pub fn take_all(&self) -> SignalSet {
        SignalSet(self.word.swap(0, Ordering::AcqRel))
    }

    /// Maps the raised signals to a state. Success and failure take
    /// precedence over shutdown, shutdown over plain completion.
    pub fn state(&self) -> SolverState {
        self.poll().state()
    }
}

impl SignalSet {
    /// Maps a set of raised signals to a state, with the same precedence as
    /// [`SolverSignals::state`].
    pub fn state(self) -> SolverState {
        if self.contains(Signal::Succeeded) {
            SolverState::Succeeded
        } else if self.contains(Signal::Failed) {
            SolverState::Failed
        } else if self.contains(Signal::Shutdown) {
            SolverState::ShutdownRequested
        } else if self.contains(Signal::CompletedAll) {
            SolverState::Completed
        } else {
            SolverState::Running
        }
    }
}

impl fmt::Debug for SolverSignals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SolverSignals").field("raised", &self.poll()).finish()
    }
}
