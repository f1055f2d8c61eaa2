//! Per-vertex value assignment over an acyclic graph.
//!
//! Each connected component is rooted at its lowest unvisited vertex, which
//! receives 0. A depth-first walk then gives every newly reached vertex
//! `edge_id - assigned[parent]`, so that the two endpoints of every edge sum
//! (with 32-bit wrap-around) to that edge's id.
//!
//! The walk keeps its own stack of `(vertex, chain cursor)` frames. Component
//! depth is bounded only by V, which rules out native recursion.

use tracing::debug;

use super::layout::EMPTY;
use super::{Acyclic, Assigned, Graph};
use crate::error::{Result, SolveError};

struct Frame {
    vertex: u32,
    cursor: u32,
}

impl<'a> Graph<'a, Acyclic> {
    /// Returns the undirected id of the edge joining `vertex` and `neighbor`,
    /// searching `vertex`'s chain and accepting either orientation.
    pub fn edge_id(&self, vertex: u32, neighbor: u32) -> Option<u32> {
        self.chain(vertex)
            .map(|half| self.fold(half))
            .find(|&edge| self.connects(edge, vertex, neighbor))
    }

    fn connects(&self, edge: u32, a: u32, b: u32) -> bool {
        let x = self.edges[edge as usize];
        let y = self.edges[(edge + self.dims.num_edges) as usize];
        (x == a && y == b) || (x == b && y == a)
    }

    /// Assigns every vertex its value.
    ///
    /// # Errors
    /// [`SolveError::Invariant`] if a traversed neighbour has no connecting
    /// edge, which can only happen if the graph arrays were corrupted.
    pub fn assign(mut self) -> Result<Graph<'a, Assigned>> {
        debug_assert!(self.flags.is_acyclic);

        let mut stack: Vec<Frame> = Vec::new();
        let mut components = 0u32;

        for root in 0..self.dims.num_vertices {
            if !self.visited_vertices.test_and_set(root as usize) {
                continue;
            }
            self.visited_count += 1;
            self.assigned[root as usize] = 0;
            components += 1;
            stack.push(Frame {
                vertex: root,
                cursor: self.first[root as usize],
            });

            while let Some(top) = stack.last_mut() {
                let Frame { vertex, cursor } = *top;
                if cursor == EMPTY {
                    stack.pop();
                    continue;
                }
                top.cursor = self.next[cursor as usize];

                let neighbor = self.edges[cursor as usize];
                if !self.visited_vertices.test_and_set(neighbor as usize) {
                    continue;
                }
                self.visited_count += 1;

                let edge = self
                    .edge_id(vertex, neighbor)
                    .ok_or(SolveError::Invariant("no edge joins traversed vertices"))?;
                debug_assert_eq!(edge, self.fold(cursor));

                let parent = self.assigned[vertex as usize];
                self.assigned[neighbor as usize] = edge.wrapping_sub(parent);
                stack.push(Frame {
                    vertex: neighbor,
                    cursor: self.first[neighbor as usize],
                });
            }
        }

        debug!(components, visited = self.visited_count, "assigned vertex values");
        Ok(self.transition())
    }
}

impl<'a> Graph<'a, Assigned> {
    /// Number of vertices reached by the assignment walk (always V).
    pub fn visited_vertices(&self) -> u32 {
        self.visited_count
    }
}
