//! Error type shared by every stage of table construction.
//!
//! Only fatal conditions are represented here. A degenerate vertex pair or a
//! cyclic graph is an ordinary outcome of one attempt and never leaves the
//! worker retry loop.

use core::fmt;

/// Fatal failures of a perfect hash table construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveError {
    /// The key set was empty.
    NoKeys,
    /// The key set contained the same key twice.
    DuplicateKey(u32),
    /// A key file was malformed or unreadable.
    KeyFile(String),
    /// The edge count, vertex count, or a derived array size does not fit in 32 bits.
    LayoutOverflow {
        /// Number of keys that was requested.
        num_keys: u64,
    },
    /// The arena backing the per-worker graphs could not be reserved.
    ArenaReservation {
        /// Total number of bytes requested, including guard regions.
        bytes: usize,
    },
    /// The random seed source failed.
    SeedSource(String),
    /// A worker thread could not be started.
    WorkerSpawn(String),
    /// A worker thread panicked.
    WorkerPanicked,
    /// Every worker stopped without producing an acyclic graph.
    AttemptsExhausted {
        /// Attempts made across all workers.
        attempts: u64,
    },
    /// Shutdown was requested before a table was published.
    Cancelled,
    /// The independent replay of a solved graph found a collision.
    VerificationFailed {
        /// Key whose slot was rejected, if the failure is attributable to one key.
        key: Option<u32>,
        /// Human-readable reason.
        reason: &'static str,
    },
    /// An internal graph invariant was broken.
    Invariant(&'static str),
}

impl SolveError {
    /// Returns `true` for errors caused by a bug in the construction rather than
    /// by the environment or the input.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::VerificationFailed { .. } | Self::Invariant(_))
    }
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoKeys => f.write_str("key set is empty"),
            Self::DuplicateKey(key) => write!(f, "duplicate key {key:#010x}"),
            Self::KeyFile(msg) => write!(f, "invalid key file: {msg}"),
            Self::LayoutOverflow { num_keys } => {
                write!(f, "graph layout for {num_keys} keys exceeds 32-bit limits")
            }
            Self::ArenaReservation { bytes } => {
                write!(f, "failed to reserve {bytes} bytes for graph arena")
            }
            Self::SeedSource(msg) => write!(f, "seed source failed: {msg}"),
            Self::WorkerSpawn(msg) => write!(f, "failed to spawn solver worker: {msg}"),
            Self::WorkerPanicked => f.write_str("solver worker panicked"),
            Self::AttemptsExhausted { attempts } => {
                write!(f, "no acyclic graph found after {attempts} attempts")
            }
            Self::Cancelled => f.write_str("construction cancelled by shutdown request"),
            Self::VerificationFailed { key: Some(key), reason } => {
                write!(f, "verification failed at key {key:#010x}: {reason}")
            }
            Self::VerificationFailed { key: None, reason } => {
                write!(f, "verification failed: {reason}")
            }
            Self::Invariant(msg) => write!(f, "graph invariant violated: {msg}"),
        }
    }
}

impl std::error::Error for SolveError {}

/// Convenience alias used throughout the crate.
pub type Result<T, E = SolveError> = core::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_key_in_hex() {
        let err = SolveError::DuplicateKey(0x2e);
        assert_eq!(err.to_string(), "duplicate key 0x0000002e");
    }

    #[test]
    fn invariant_classification() {
        assert!(SolveError::Invariant("x").is_invariant_violation());
        let failed = SolveError::VerificationFailed {
            key: None,
            reason: "r",
        };
        assert!(failed.is_invariant_violation());
        assert!(!SolveError::Cancelled.is_invariant_violation());
        assert!(!SolveError::NoKeys.is_invariant_violation());
    }
}
