//! The 2-uniform hypergraph at the heart of CHM construction.
//!
//! A [`Graph`] is a set of typed views over one arena slice. Its arrays are
//! carved at the offsets planned by [`GraphLayout`]; nothing is allocated per
//! attempt. The graph moves through three states:
//!
//! - [`Unsolved`]: reset, seeded and filled with edges; may be peeled.
//! - [`Acyclic`]: peeling removed every edge; may be assigned.
//! - [`Assigned`]: every vertex carries its value; may be verified.
//!
//! Illegal sequences (assigning a cyclic graph, verifying before assignment)
//! do not type-check.

pub mod assign;
pub mod bitmap;
pub mod hash;
pub mod layout;
pub mod peel;
pub mod seed;
pub mod verify;

use core::fmt;
use core::marker::PhantomData;

use zerocopy::Ref;

use crate::error::{Result, SolveError};
use bitmap::Bitmap;
use hash::{SeededHash, Seeds};
use layout::{Dimensions, GraphLayout, EMPTY};
use seed::SeedSource;

/// State marker: edges may be inserted and peeled.
#[derive(Debug)]
pub enum Unsolved {}

/// State marker: peeling removed every edge.
#[derive(Debug)]
pub enum Acyclic {}

/// State marker: per-vertex values have been assigned.
#[derive(Debug)]
pub enum Assigned {}

/// The two distinct vertices a key maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexPair {
    /// Vertex receiving the edge's first half.
    pub v1: u32,
    /// Vertex receiving the edge's second half.
    pub v2: u32,
}

/// A key hashed to the same vertex twice. The attempt must be reseeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DegenerateHash;

impl fmt::Display for DegenerateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("key hashed to a single vertex")
    }
}

/// Mutable graph flags.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GraphFlags {
    /// Set while cycle detection is running.
    pub shrinking: bool,
    /// Set once cycle detection proved the graph acyclic.
    pub is_acyclic: bool,
}

/// A 2-uniform hypergraph over borrowed arena memory.
pub struct Graph<'a, S = Unsolved> {
    dims: Dimensions,
    /// `edges[e]` is the vertex at the far end of directed half `e`.
    edges: &'a mut [u32],
    /// Adjacency chain links, indexed by directed half.
    next: &'a mut [u32],
    /// Chain heads, indexed by vertex.
    first: &'a mut [u32],
    assigned: &'a mut [u32],
    deleted_edges: Bitmap<'a>,
    visited_vertices: Bitmap<'a>,
    assigned_verify: Bitmap<'a>,
    seeds: Seeds,
    flags: GraphFlags,
    deleted_count: u32,
    visited_count: u32,
    inserted_edges: u32,
    _state: PhantomData<S>,
}

/// Maps `key` to two distinct vertices in `[0, V)`.
///
/// Equal raw hashes are degenerate. If the reduced vertices collide the
/// second is bumped by one (mod V); a remaining collision is degenerate.
///
/// # Errors
/// Returns [`DegenerateHash`] when no distinct pair can be formed.
#[inline]
pub fn vertex_pair(
    hasher: &impl SeededHash,
    seeds: &Seeds,
    dims: Dimensions,
    key: u32,
) -> core::result::Result<VertexPair, DegenerateHash> {
    let (h1, h2) = hasher.hash(seeds, key);
    if h1 == h2 {
        return Err(DegenerateHash);
    }
    let v1 = dims.mask(h1);
    let mut v2 = dims.mask(h2);
    if v1 == v2 {
        v2 = (v2 + 1) % dims.num_vertices;
        if v1 == v2 {
            return Err(DegenerateHash);
        }
    }
    Ok(VertexPair { v1, v2 })
}

fn u32_view(bytes: &mut [u8], count: usize) -> Result<&mut [u32]> {
    let words = Ref::<_, [u32]>::new_slice(bytes)
        .ok_or(SolveError::Invariant("misaligned u32 region"))?
        .into_mut_slice();
    words.get_mut(..count).ok_or(SolveError::Invariant("u32 region too small"))
}

fn bitmap_view(bytes: &mut [u8], bits: usize) -> Result<Bitmap<'_>> {
    let words = Ref::<_, [u64]>::new_slice(bytes)
        .ok_or(SolveError::Invariant("misaligned bitmap region"))?
        .into_mut_slice();
    if words.len() * 64 < bits {
        return Err(SolveError::Invariant("bitmap region too small"));
    }
    Ok(Bitmap::new(words, bits))
}

impl<'a> Graph<'a, Unsolved> {
    /// Carves the graph's arrays out of `slice` at the offsets in `layout`.
    ///
    /// The graph is unseeded; call [`reset`](Self::reset) before inserting edges.
    ///
    /// # Errors
    /// [`SolveError::Invariant`] if `slice` is smaller than the layout or not
    /// 8-byte aligned.
    pub fn new(slice: &'a mut [u8], layout: &GraphLayout) -> Result<Self> {
        let slice = slice
            .get_mut(..layout.graph_bytes)
            .ok_or(SolveError::Invariant("graph slice smaller than layout"))?;
        let dims = layout.dims;

        let (edges, rest) = slice.split_at_mut(layout.edges.len);
        let (next, rest) = rest.split_at_mut(layout.next.len);
        let (first, rest) = rest.split_at_mut(layout.first.len);
        let (assigned, rest) = rest.split_at_mut(layout.assigned.len);
        let (deleted, rest) = rest.split_at_mut(layout.deleted_edges.len);
        let (visited, verify) = rest.split_at_mut(layout.visited_vertices.len);

        let total_edges = dims.total_edges as usize;
        let num_vertices = dims.num_vertices as usize;

        let mut graph = Self {
            dims,
            edges: u32_view(edges, total_edges)?,
            next: u32_view(next, total_edges)?,
            first: u32_view(first, num_vertices)?,
            assigned: u32_view(assigned, num_vertices)?,
            deleted_edges: bitmap_view(deleted, total_edges)?,
            visited_vertices: bitmap_view(visited, num_vertices)?,
            assigned_verify: bitmap_view(verify, dims.num_edges as usize)?,
            seeds: Seeds::default(),
            flags: GraphFlags::default(),
            deleted_count: 0,
            visited_count: 0,
            inserted_edges: 0,
            _state: PhantomData,
        };
        graph.clear();
        Ok(graph)
    }

    /// Prepares the graph for a new attempt with fresh seeds from `source`.
    ///
    /// Two pairs are drawn; the source guarantees each is non-degenerate.
    ///
    /// # Errors
    /// Propagates seed source failures.
    pub fn reset(&mut self, source: &impl SeedSource) -> Result<()> {
        let [s1, s2] = source.next_pair()?;
        let [s3, s4] = source.next_pair()?;
        self.reset_with_seeds(Seeds([s1, s2, s3, s4]));
        Ok(())
    }

    /// Prepares the graph for a new attempt with the given seeds.
    pub fn reset_with_seeds(&mut self, seeds: Seeds) {
        self.clear();
        self.seeds = seeds;
    }

    fn clear(&mut self) {
        self.edges.fill(EMPTY);
        self.next.fill(EMPTY);
        self.first.fill(EMPTY);
        self.assigned.fill(0);
        self.deleted_edges.clear_all();
        self.visited_vertices.clear_all();
        self.assigned_verify.clear_all();
        self.flags = GraphFlags::default();
        self.deleted_count = 0;
        self.visited_count = 0;
        self.inserted_edges = 0;
    }

    /// Connects `v1` and `v2` with edge `edge`.
    ///
    /// Half `edge` is prepended to `v1`'s chain and half `edge + E` to `v2`'s.
    ///
    /// # Panics
    /// Panics if `edge >= E` or either vertex is out of range.
    #[inline]
    pub fn add_edge(&mut self, edge: u32, v1: u32, v2: u32) {
        debug_assert!(edge < self.dims.num_edges);
        debug_assert_ne!(v1, v2, "edge endpoints must be distinct");

        let e1 = edge as usize;
        let e2 = (edge + self.dims.num_edges) as usize;

        self.edges[e1] = v2;
        self.next[e1] = self.first[v1 as usize];
        self.first[v1 as usize] = e1 as u32;

        self.edges[e2] = v1;
        self.next[e2] = self.first[v2 as usize];
        self.first[v2 as usize] = e2 as u32;

        self.inserted_edges += 1;
    }

    /// Hashes every key and inserts edge `i` for `keys[i]`.
    ///
    /// # Errors
    /// Returns [`DegenerateHash`] at the first key that maps to a single vertex;
    /// the graph is then partially filled and must be reset.
    pub fn insert_keys(
        &mut self,
        hasher: &impl SeededHash,
        keys: &[u32],
    ) -> core::result::Result<(), DegenerateHash> {
        debug_assert_eq!(keys.len(), self.dims.num_edges as usize);
        for (edge, &key) in (0u32..).zip(keys) {
            let VertexPair { v1, v2 } = self.hash_key(hasher, key)?;
            self.add_edge(edge, v1, v2);
        }
        Ok(())
    }
}

impl<'a, S> Graph<'a, S> {
    /// Maps `key` to two distinct vertices under the current seeds.
    ///
    /// # Errors
    /// Returns [`DegenerateHash`] when no distinct pair can be formed.
    #[inline]
    pub fn hash_key(
        &self,
        hasher: &impl SeededHash,
        key: u32,
    ) -> core::result::Result<VertexPair, DegenerateHash> {
        vertex_pair(hasher, &self.seeds, self.dims, key)
    }

    /// Edge and vertex counts.
    #[inline]
    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    /// Seeds of the current attempt.
    #[inline]
    pub fn seeds(&self) -> Seeds {
        self.seeds
    }

    /// Current flags.
    #[inline]
    pub fn flags(&self) -> GraphFlags {
        self.flags
    }

    /// Number of edges inserted since the last reset.
    #[inline]
    pub fn inserted_edges(&self) -> u32 {
        self.inserted_edges
    }

    /// Per-vertex values. All zero until the graph is assigned.
    #[inline]
    pub fn assigned(&self) -> &[u32] {
        self.assigned
    }

    /// Iterates over the neighbours of `vertex`, most recently inserted first.
    pub fn neighbors(&self, vertex: u32) -> impl Iterator<Item = u32> + '_ {
        self.chain(vertex).map(|e| self.edges[e as usize])
    }

    /// Iterates over the directed halves in `vertex`'s adjacency chain.
    fn chain(&self, vertex: u32) -> impl Iterator<Item = u32> + '_ {
        let mut edge = self.first[vertex as usize];
        core::iter::from_fn(move || {
            if edge == EMPTY {
                return None;
            }
            let current = edge;
            edge = self.next[current as usize];
            Some(current)
        })
    }

    /// Folds a directed half into its undirected edge id in `[0, E)`.
    #[inline]
    fn fold(&self, edge: u32) -> u32 {
        edge % self.dims.num_edges
    }

    fn transition<T>(self) -> Graph<'a, T> {
        Graph {
            dims: self.dims,
            edges: self.edges,
            next: self.next,
            first: self.first,
            assigned: self.assigned,
            deleted_edges: self.deleted_edges,
            visited_vertices: self.visited_vertices,
            assigned_verify: self.assigned_verify,
            seeds: self.seeds,
            flags: self.flags,
            deleted_count: self.deleted_count,
            visited_count: self.visited_count,
            inserted_edges: self.inserted_edges,
            _state: PhantomData,
        }
    }

    /// Abandons the current attempt, returning the graph to the unsolved state.
    ///
    /// The contents are stale until the next [`reset`](Graph::reset).
    pub fn into_unsolved(self) -> Graph<'a, Unsolved> {
        self.transition()
    }
}

impl<S> fmt::Debug for Graph<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("dims", &self.dims)
            .field("seeds", &self.seeds)
            .field("flags", &self.flags)
            .field("inserted_edges", &self.inserted_edges)
            .field("deleted_count", &self.deleted_count)
            .field("visited_count", &self.visited_count)
            .finish_non_exhaustive()
    }
}

/// A heap buffer holding one graph, for use outside a [`GraphArena`](crate::alloc::GraphArena).
#[derive(Debug)]
pub struct GraphBuffer {
    words: Vec<u64>,
}

impl GraphBuffer {
    /// Allocates a zeroed buffer large enough for `layout`.
    pub fn new(layout: &GraphLayout) -> Self {
        Self {
            words: vec![0; layout.graph_bytes.div_ceil(8)],
        }
    }

    /// The buffer as bytes, 8-byte aligned.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        zerocopy::AsBytes::as_bytes_mut(self.words.as_mut_slice())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::graph::hash::{HashFunction, MaskingType};

    /// Hash returning the key's two halves as raw vertices.
    pub(crate) struct SplitHash;

    impl SeededHash for SplitHash {
        fn hash(&self, _seeds: &Seeds, key: u32) -> (u32, u32) {
            (key >> 16, key & 0xffff)
        }
    }

    pub(crate) fn edge_key(v1: u32, v2: u32) -> u32 {
        (v1 << 16) | v2
    }

    #[test]
    fn new_graph_is_empty() {
        let layout = GraphLayout::plan(4, MaskingType::Modulus).unwrap();
        let mut buffer = GraphBuffer::new(&layout);
        let graph = Graph::new(buffer.as_bytes_mut(), &layout).unwrap();
        assert_eq!(graph.dims().num_vertices, 10);
        assert_eq!(graph.inserted_edges(), 0);
        for v in 0..10 {
            assert_eq!(graph.neighbors(v).count(), 0);
        }
    }

    #[test]
    fn add_edge_links_both_halves() {
        let layout = GraphLayout::plan(2, MaskingType::Modulus).unwrap();
        let mut buffer = GraphBuffer::new(&layout);
        let mut graph = Graph::new(buffer.as_bytes_mut(), &layout).unwrap();
        graph.add_edge(0, 0, 3);
        graph.add_edge(1, 0, 4);

        assert_eq!(graph.neighbors(0).collect::<Vec<_>>(), vec![4, 3]);
        assert_eq!(graph.neighbors(3).collect::<Vec<_>>(), vec![0]);
        assert_eq!(graph.neighbors(4).collect::<Vec<_>>(), vec![0]);
        assert_eq!(graph.chain(3).collect::<Vec<_>>(), vec![2]);
        assert_eq!(graph.fold(3), 1);
    }

    #[test]
    fn reset_restores_sentinels() {
        let layout = GraphLayout::plan(2, MaskingType::Modulus).unwrap();
        let mut buffer = GraphBuffer::new(&layout);
        let mut graph = Graph::new(buffer.as_bytes_mut(), &layout).unwrap();
        graph.add_edge(0, 1, 2);
        graph.reset_with_seeds(Seeds([1, 2, 3, 4]));
        assert_eq!(graph.inserted_edges(), 0);
        assert_eq!(graph.neighbors(1).count(), 0);
        assert_eq!(graph.seeds(), Seeds([1, 2, 3, 4]));
        assert!(graph.first.iter().all(|&f| f == EMPTY));
    }

    #[test]
    fn colliding_vertices_are_bumped() {
        let layout = GraphLayout::plan(4, MaskingType::Modulus).unwrap();
        let mut buffer = GraphBuffer::new(&layout);
        let graph = Graph::new(buffer.as_bytes_mut(), &layout).unwrap();
        // 3 and 13 reduce to the same vertex mod 10.
        assert_eq!(graph.hash_key(&SplitHash, edge_key(3, 13)), Ok(VertexPair { v1: 3, v2: 4 }));
        assert_eq!(graph.hash_key(&SplitHash, edge_key(9, 19)), Ok(VertexPair { v1: 9, v2: 0 }));
    }

    #[test]
    fn equal_raw_hashes_are_degenerate() {
        let layout = GraphLayout::plan(4, MaskingType::Modulus).unwrap();
        let mut buffer = GraphBuffer::new(&layout);
        let graph = Graph::new(buffer.as_bytes_mut(), &layout).unwrap();
        assert_eq!(graph.hash_key(&SplitHash, edge_key(5, 5)), Err(DegenerateHash));
    }

    #[test]
    fn hash_key_never_returns_equal_vertices() {
        let layout = GraphLayout::plan(3, MaskingType::Modulus).unwrap();
        let mut buffer = GraphBuffer::new(&layout);
        let mut graph = Graph::new(buffer.as_bytes_mut(), &layout).unwrap();
        for seed in 1..64u32 {
            graph.reset_with_seeds(Seeds([seed, seed + 100, seed * 7, seed ^ 0x55]));
            for function in HashFunction::ALL {
                for key in 0..256 {
                    if let Ok(pair) = graph.hash_key(&function, key) {
                        assert_ne!(pair.v1, pair.v2);
                        assert!(pair.v1 < 7 && pair.v2 < 7);
                    }
                }
            }
        }
    }
}
