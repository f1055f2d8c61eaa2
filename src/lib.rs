//! # `perfect-hash` - Parallel CHM Perfect Hash Construction
//!
//! Builds a minimal perfect hash for a fixed set of distinct 32-bit keys using
//! the Czech-Havas-Majewski method: every key becomes an edge of a random
//! 2-uniform hypergraph, the graph is peeled to prove it acyclic, and a
//! depth-first walk assigns each vertex a value so that the two endpoints of
//! key `i`'s edge sum to `i`.
//!
//! ## Architecture
//!
//! ### Graph pipeline
//!
//! A [`graph::Graph`] is a set of typed views over one pre-planned arena
//! slice and moves through three typestates:
//!
//! 1. **`Unsolved`**: reset with fresh seeds, keys hashed into edges.
//!    A key hashing to a single vertex abandons the attempt.
//! 2. **`Acyclic`**: degree-1 peeling deleted every edge.
//! 3. **`Assigned`**: vertex values assigned with an explicit-stack DFS,
//!    then replayed against every key by the verifier.
//!
//! Assigning a cyclic graph, or verifying an unassigned one, does not compile.
//!
//! ### Solver
//!
//! [`Solver`] runs K worker threads, each bound to its own slice of a single
//! [`alloc::GraphArena`] reservation with guard pages between slices. Workers
//! race randomized attempts; the first to find an acyclic graph claims the
//! finished counter, assigns, verifies and publishes. Everyone else stops at
//! the top of their next retry. The orchestrator sleeps on a futex over the
//! four solver signals until an outcome is known.
//!
//! ### Memory layout
//!
//! [`graph::layout::GraphLayout`] computes every array's offset once from the
//! key count. No allocation happens per attempt; a retry only refills the
//! arrays with their sentinels.
//!
//! ## Example
//!
//! ```rust
//! use perfect_hash::{Keys, Solver, SolverConfig};
//!
//! let keys = Keys::new(vec![10, 20, 30, 40]).unwrap();
//! let mut solver = Solver::new(SolverConfig::default().with_concurrency(2));
//! let table = solver.solve(&keys).unwrap();
//!
//! let mut slots: Vec<u32> = keys.as_slice().iter().map(|&k| table.slot(k).unwrap()).collect();
//! slots.sort_unstable();
//! assert_eq!(slots, vec![0, 1, 2, 3]);
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_possible_truncation)]

pub mod alloc;
pub mod concurrency;
pub mod error;
pub mod graph;
pub mod keys;
pub mod solver;

pub use error::{Result, SolveError};
pub use graph::hash::{HashFunction, MaskingType, SeededHash, Seeds};
pub use graph::seed::{OsSeedSource, SeedSource, StdRngSeedSource};
pub use keys::Keys;
pub use solver::{ShutdownHandle, SolveStats, SolvedTable, Solver, SolverConfig, SolverState};

// Compile-time checks on the layout assumptions the graph views rely on.
const _: () = {
    use core::mem;

    // Sentinel must not be a reachable edge or vertex id.
    assert!(graph::layout::EMPTY == u32::MAX);

    // Every region boundary must satisfy the strictest view alignment.
    assert!(graph::layout::ARRAY_ALIGNMENT % mem::align_of::<u64>() == 0);
    assert!(graph::layout::ARRAY_ALIGNMENT % mem::align_of::<u32>() == 0);

    // Seeds stay a plain 16-byte value.
    assert!(mem::size_of::<Seeds>() == 16);
};
