//! The published result of a successful solve.

use std::time::Duration;

use serde::Serialize;

use crate::error::{Result, SolveError};
use crate::graph::hash::{SeededHash, Seeds};
use crate::graph::layout::Dimensions;
use crate::graph::vertex_pair;
use crate::keys::Keys;

/// Counters collected over one solve.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SolveStats {
    /// Graph attempts started across all workers.
    pub attempts: u64,
    /// Attempts whose graph contained a cycle.
    pub cyclic_attempts: u64,
    /// Attempts abandoned because a key hashed to a single vertex.
    pub degenerate_attempts: u64,
    /// Workers that found an acyclic graph after the winner.
    pub late_finishers: u32,
    /// Index of the worker that published the table.
    pub winner: Option<usize>,
    /// Wall-clock time of the solve.
    pub elapsed: Duration,
}

/// A verified perfect hash table: per-vertex values plus everything needed
/// to recompute a key's slot.
#[derive(Debug, Clone)]
pub struct SolvedTable<H> {
    assigned: Vec<u32>,
    seeds: Seeds,
    dims: Dimensions,
    hasher: H,
    stats: SolveStats,
}

impl<H: SeededHash> SolvedTable<H> {
    pub(crate) fn new(assigned: Vec<u32>, seeds: Seeds, dims: Dimensions, hasher: H) -> Self {
        Self {
            assigned,
            seeds,
            dims,
            hasher,
            stats: SolveStats::default(),
        }
    }

    pub(crate) fn stats_mut(&mut self) -> &mut SolveStats {
        &mut self.stats
    }

    /// Slot of `key`: the masked wrapping sum of its two vertex values.
    ///
    /// Keys of the solved set map to distinct slots in `[0, E)`. Any other key
    /// maps to an arbitrary slot in `[0, V)`, or `None` if it hashes to a
    /// single vertex.
    #[inline]
    pub fn slot(&self, key: u32) -> Option<u32> {
        let pair = vertex_pair(&self.hasher, &self.seeds, self.dims, key).ok()?;
        let sum = self.assigned[pair.v1 as usize].wrapping_add(self.assigned[pair.v2 as usize]);
        Some(self.dims.mask_index(sum))
    }

    /// Recomputes every slot of `keys` and confirms they are distinct and in
    /// `[0, E)`.
    ///
    /// # Errors
    /// [`SolveError::VerificationFailed`] naming the first offending key.
    pub fn check(&self, keys: &Keys) -> Result<()> {
        let failed = |key, reason| SolveError::VerificationFailed { key, reason };
        if keys.len() != self.dims.num_edges as usize {
            return Err(failed(None, "key count differs from table size"));
        }
        let mut seen = vec![false; keys.len()];
        for &key in keys.as_slice() {
            let slot = self
                .slot(key)
                .ok_or(failed(Some(key), "degenerate vertex pair"))?;
            let taken = seen
                .get_mut(slot as usize)
                .ok_or(failed(Some(key), "slot outside the edge range"))?;
            if core::mem::replace(taken, true) {
                return Err(failed(Some(key), "duplicate slot"));
            }
        }
        Ok(())
    }
}

impl<H> SolvedTable<H> {
    /// Per-vertex values.
    pub fn assigned(&self) -> &[u32] {
        &self.assigned
    }

    /// Seeds of the winning attempt.
    pub fn seeds(&self) -> Seeds {
        self.seeds
    }

    /// Edge and vertex counts.
    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    /// Number of keys (E).
    pub fn len(&self) -> usize {
        self.dims.num_edges as usize
    }

    /// Always `false`; a table holds at least one key.
    pub fn is_empty(&self) -> bool {
        self.dims.num_edges == 0
    }

    /// The hash function the table was built with.
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Statistics of the solve that produced this table.
    pub fn stats(&self) -> &SolveStats {
        &self.stats
    }
}
