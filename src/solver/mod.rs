//! Parallel solver: K workers race randomized attempts over one arena.
//!
//! The orchestrator plans the layout, reserves a [`GraphArena`] with one
//! slice per worker, starts the workers in a thread scope and blocks until
//! any terminal signal is raised. It then raises `Shutdown`, joins every
//! worker and turns the outcome into a single `Result`.

pub mod table;
pub mod worker;

use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use crate::alloc::GraphArena;
use crate::concurrency::{FirstFinisher, ResultSlot, Signal, SignalSet, SolverSignals};
use crate::error::{Result, SolveError};
use crate::graph::hash::{HashFunction, MaskingType, SeededHash};
use crate::graph::layout::GraphLayout;
use crate::graph::seed::{OsSeedSource, SeedSource};
use crate::keys::Keys;

pub use crate::concurrency::SolverState;
pub use table::{SolveStats, SolvedTable};
pub use worker::WorkerState;

use worker::{Counters, Published, Shared};

/// Solver settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Number of workers; 0 means one per available CPU.
    pub concurrency: usize,
    /// Hash function used by [`Solver::new`].
    pub hash_function: HashFunction,
    /// Reduction of hashes and lookup sums into `[0, V)`.
    pub masking: MaskingType,
    /// Cap on attempts across all workers; `None` retries until shutdown.
    pub max_attempts: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            concurrency: 0,
            hash_function: HashFunction::default(),
            masking: MaskingType::default(),
            max_attempts: None,
        }
    }
}

impl SolverConfig {
    /// Sets the worker count.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the hash function.
    #[must_use]
    pub fn with_hash_function(mut self, hash_function: HashFunction) -> Self {
        self.hash_function = hash_function;
        self
    }

    /// Sets the masking type.
    #[must_use]
    pub fn with_masking(mut self, masking: MaskingType) -> Self {
        self.masking = masking;
        self
    }

    /// Caps the total number of attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u64) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Parses a JSON config; missing fields take their defaults.
    ///
    /// # Errors
    /// Returns the parse error for malformed JSON or unknown enum values.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// The worker count to use, with 0 resolved to the available parallelism.
    pub fn resolved_concurrency(&self) -> usize {
        match self.concurrency {
            0 => thread::available_parallelism().map_or(1, usize::from),
            n => n,
        }
    }
}

/// Requests cancellation of a solve from any thread.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    signals: Arc<SolverSignals>,
}

impl ShutdownHandle {
    /// Raises `Shutdown`. The in-flight solve, or the next one if none is
    /// running, returns [`SolveError::Cancelled`] unless a table was already
    /// published. Each request cancels at most one solve.
    pub fn request(&self) {
        if self.signals.raise(Signal::Shutdown) {
            info!("shutdown requested");
        }
    }
}

/// The CHM solver.
#[derive(Debug)]
pub struct Solver<H = HashFunction, R = OsSeedSource> {
    config: SolverConfig,
    hasher: H,
    seed_source: R,
    signals: Arc<SolverSignals>,
}

impl Solver {
    /// A solver using the configured hash function and OS entropy.
    pub fn new(config: SolverConfig) -> Self {
        let hasher = config.hash_function;
        Self::with_parts(config, hasher, OsSeedSource)
    }
}

impl Default for Solver {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl<H, R> Solver<H, R>
where
    H: SeededHash + Clone,
    R: SeedSource,
{
    /// A solver with a custom hash function and seed source.
    ///
    /// `config.hash_function` is ignored.
    pub fn with_parts(config: SolverConfig, hasher: H, seed_source: R) -> Self {
        Self {
            config,
            hasher,
            seed_source,
            signals: Arc::new(SolverSignals::new()),
        }
    }

    /// The settings in use.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// A handle that cancels the running solve.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            signals: Arc::clone(&self.signals),
        }
    }

    /// Builds a perfect hash table for `keys`.
    ///
    /// # Errors
    /// Layout, arena, seed source and spawn failures; [`SolveError::Cancelled`]
    /// on shutdown; [`SolveError::AttemptsExhausted`] when the attempt cap is
    /// reached; [`SolveError::VerificationFailed`] if the winner's table does
    /// not verify; [`SolveError::WorkerPanicked`].
    pub fn solve(&mut self, keys: &Keys) -> Result<SolvedTable<H>> {
        let started = Instant::now();
        if self.signals.take_all().contains(Signal::Shutdown) {
            return Err(SolveError::Cancelled);
        }

        let layout = GraphLayout::plan(keys.len(), self.config.masking)?;
        let workers = self.config.resolved_concurrency();
        let _span = info_span!("solve", keys = keys.len(), workers).entered();
        let mut arena = GraphArena::reserve(workers, layout.slice_bytes)?;
        info!(
            edges = layout.dims.num_edges,
            vertices = layout.dims.num_vertices,
            slice_bytes = arena.slice_bytes(),
            "solving"
        );

        let finisher = FirstFinisher::new();
        let mut result = ResultSlot::new();
        let mut failure = ResultSlot::new();
        let counters = Counters::default();
        let active = AtomicUsize::new(workers);
        let signals = &*self.signals;

        let shared = Shared {
            keys: keys.as_slice(),
            layout: &layout,
            hasher: &self.hasher,
            seed_source: &self.seed_source,
            max_attempts: self.config.max_attempts,
            signals,
            finisher: &finisher,
            result: &result,
            failure: &failure,
            counters: &counters,
            active: &active,
        };

        let (raised, panicked) = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            for (id, slice) in arena.slices_mut().into_iter().enumerate() {
                let shared = &shared;
                let spawned = thread::Builder::new()
                    .name(format!("chm-worker-{id}"))
                    .spawn_scoped(scope, move || worker::run(id, slice, shared));
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(err) => {
                        let _ = failure.publish(SolveError::WorkerSpawn(err.to_string()));
                        signals.raise(Signal::Failed);
                        if active.fetch_sub(workers - id, Ordering::AcqRel) == workers - id {
                            signals.raise(Signal::CompletedAll);
                        }
                        break;
                    }
                }
            }

            let raised = signals.wait_any(SignalSet::TERMINAL);
            signals.raise(Signal::Shutdown);
            debug!(state = ?raised.state(), "terminal signal observed; joining workers");

            let panicked = handles.into_iter().map(|h| h.join()).filter(|r| r.is_err()).count();
            (raised, panicked)
        });
        // A shutdown request is consumed by the solve that observed it.
        signals.lower(Signal::Shutdown);

        let mut stats = SolveStats {
            attempts: counters.attempts.load(Ordering::Relaxed),
            cyclic_attempts: counters.cyclic.load(Ordering::Relaxed),
            degenerate_attempts: counters.degenerate.load(Ordering::Relaxed),
            late_finishers: finisher.late_finishers(),
            winner: None,
            elapsed: started.elapsed(),
        };
        debug_assert!(finisher.finished() <= 1);

        if panicked > 0 {
            warn!(panicked, "solver workers panicked");
            return Err(SolveError::WorkerPanicked);
        }
        if let Some(Published { assigned, seeds, winner }) = result.take() {
            stats.winner = Some(winner);
            info!(
                winner,
                attempts = stats.attempts,
                cyclic = stats.cyclic_attempts,
                elapsed_ms = stats.elapsed.as_millis() as u64,
                "solved"
            );
            let mut table = SolvedTable::new(assigned, seeds, layout.dims, self.hasher.clone());
            *table.stats_mut() = stats;
            return Ok(table);
        }
        if let Some(err) = failure.take() {
            return Err(err);
        }
        if raised.contains(Signal::Shutdown) {
            return Err(SolveError::Cancelled);
        }
        Err(SolveError::AttemptsExhausted {
            attempts: stats.attempts,
        })
    }
}

