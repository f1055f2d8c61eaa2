//! Cycle detection by iterative degree-1 peeling.
//!
//! A graph is solvable iff repeatedly deleting the edge of any vertex with
//! exactly one live edge eventually deletes every edge. Deletion is recorded
//! in the `deleted_edges` bitmap under the folded edge id, so both directed
//! halves of an edge die together.

use tracing::warn;

use super::{Acyclic, Graph, Unsolved};

impl<'a> Graph<'a, Unsolved> {
    /// Returns the only live half in `vertex`'s chain, or `None` if the vertex
    /// has zero or several live edges.
    pub fn find_degree1(&self, vertex: u32) -> Option<u32> {
        let mut found = None;
        for edge in self.chain(vertex) {
            if self.deleted_edges.is_set(self.fold(edge) as usize) {
                continue;
            }
            if found.is_some() {
                return None;
            }
            found = Some(edge);
        }
        found
    }

    /// Peels edges starting at `vertex`, following each deleted edge to its
    /// other endpoint for as long as the endpoint has degree 1.
    pub fn peel_from(&mut self, vertex: u32) {
        let mut current = vertex;
        while let Some(edge) = self.find_degree1(current) {
            // Counted per step, independent of the bitmap, so a repeated
            // deletion shows up as divergence below.
            self.deleted_edges.test_and_set(self.fold(edge) as usize);
            self.deleted_count += 1;
            current = self.edges[edge as usize];
        }
    }

    /// Peels from every vertex and reports whether every edge was deleted.
    ///
    /// Sets [`GraphFlags::is_acyclic`](super::GraphFlags::is_acyclic) on success.
    ///
    /// # Panics
    /// Panics if cycle detection is already running on this graph.
    pub fn is_acyclic(&mut self) -> bool {
        assert!(!self.flags.shrinking, "cycle detection re-entered");
        self.flags.shrinking = true;

        for vertex in 0..self.dims.num_vertices {
            self.peel_from(vertex);
        }

        // The bitmap is authoritative; the counter is a cross-check only.
        let deleted = self.deleted_edges.count_ones();
        if deleted != self.deleted_count as usize {
            warn!(
                bitmap = deleted,
                counter = self.deleted_count,
                "deleted edge counter diverged from bitmap"
            );
            self.deleted_count = deleted as u32;
        }

        let acyclic = deleted == self.dims.num_edges as usize;
        self.flags.is_acyclic = acyclic;
        self.flags.shrinking = false;
        acyclic
    }

    /// Runs cycle detection and moves the graph into the [`Acyclic`] state on
    /// success. A cyclic graph is handed back unchanged for the next attempt.
    ///
    /// # Errors
    /// Returns the graph itself when it contains a cycle.
    pub fn try_into_acyclic(mut self) -> Result<Graph<'a, Acyclic>, Self> {
        if self.flags.is_acyclic || self.is_acyclic() {
            Ok(self.transition())
        } else {
            Err(self)
        }
    }

    /// Number of edges deleted by peeling so far.
    pub fn deleted_edges(&self) -> u32 {
        self.deleted_count
    }
}
