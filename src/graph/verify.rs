//! Independent replay of a solved graph.
//!
//! Every key is rehashed from scratch and its slot recomputed from the
//! assigned values; the `assigned_verify` bitmap records which slots have
//! been produced. A repeated slot, a slot outside `[0, E)`, or a final
//! population different from E means the construction is wrong.

use super::{Assigned, Graph, VertexPair};
use crate::error::{Result, SolveError};
use crate::graph::hash::SeededHash;

fn mismatch(key: Option<u32>, reason: &'static str) -> SolveError {
    debug_assert!(false, "verification failed: {reason} (key {key:?})");
    SolveError::VerificationFailed { key, reason }
}

impl<'a> Graph<'a, Assigned> {
    /// Table slot for a vertex pair: the masked wrapping sum of both values.
    #[inline]
    pub fn slot(&self, pair: VertexPair) -> u32 {
        let sum = self.assigned[pair.v1 as usize].wrapping_add(self.assigned[pair.v2 as usize]);
        self.dims.mask_index(sum)
    }

    /// Proves that `keys` map to pairwise distinct slots covering `[0, E)`.
    ///
    /// # Errors
    /// [`SolveError::VerificationFailed`]. Debug builds panic instead.
    pub fn verify(&mut self, hasher: &impl SeededHash, keys: &[u32]) -> Result<()> {
        let num_edges = self.dims.num_edges;
        if keys.len() != num_edges as usize {
            return Err(mismatch(None, "key count differs from edge count"));
        }

        self.assigned_verify.clear_all();
        for &key in keys {
            let pair = self
                .hash_key(hasher, key)
                .map_err(|_| mismatch(Some(key), "key no longer hashes to distinct vertices"))?;
            let slot = self.slot(pair);
            if slot >= num_edges {
                return Err(mismatch(Some(key), "slot outside the edge range"));
            }
            if !self.assigned_verify.test_and_set(slot as usize) {
                return Err(mismatch(Some(key), "slot already produced by an earlier key"));
            }
        }

        if self.assigned_verify.count_ones() != num_edges as usize {
            return Err(mismatch(None, "slot population differs from edge count"));
        }
        Ok(())
    }
}
