//! One solver worker: the retry loop over a single arena slice.
//!
//! ```text
//! Idle -> Seeding -> EdgeInsertion -> CycleCheck -> Restart -> Seeding ...
//!                                               \-> Assign -> Verify -> Publish
//!                                               \-> Lost
//! any state at the top of a retry               --> Stopped
//! ```

use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crossbeam_utils::CachePadded;
use tracing::{debug, debug_span, info, trace};

use crate::concurrency::{FirstFinisher, ResultSlot, Signal, SolverSignals};
use crate::error::{Result, SolveError};
use crate::graph::hash::{SeededHash, Seeds};
use crate::graph::layout::GraphLayout;
use crate::graph::seed::SeedSource;
use crate::graph::Graph;

/// Where a worker is in its retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Started, graph not yet carved.
    Idle,
    /// Drawing seeds and resetting the graph.
    Seeding,
    /// Hashing keys into edges.
    EdgeInsertion,
    /// Peeling.
    CycleCheck,
    /// The attempt failed; a new one follows.
    Restart,
    /// Won the claim; assigning vertex values.
    Assign,
    /// Replaying every key against the assignment.
    Verify,
    /// Handing the table to the orchestrator.
    Publish,
    /// Found an acyclic graph after another worker won.
    Lost,
    /// Observed a raised signal or the attempt cap.
    Stopped,
}

/// Why a worker left its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Exit {
    Published,
    Lost,
    Stopped,
    Exhausted,
}

/// Attempt counters shared by all workers.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) attempts: CachePadded<AtomicU64>,
    pub(crate) cyclic: CachePadded<AtomicU64>,
    pub(crate) degenerate: CachePadded<AtomicU64>,
}

/// What the winner hands back.
#[derive(Debug)]
pub(crate) struct Published {
    pub(crate) assigned: Vec<u32>,
    pub(crate) seeds: Seeds,
    pub(crate) winner: usize,
}

/// Everything a worker borrows from the orchestrator.
pub(crate) struct Shared<'env, H, R> {
    pub(crate) keys: &'env [u32],
    pub(crate) layout: &'env GraphLayout,
    pub(crate) hasher: &'env H,
    pub(crate) seed_source: &'env R,
    pub(crate) max_attempts: Option<u64>,
    pub(crate) signals: &'env SolverSignals,
    pub(crate) finisher: &'env FirstFinisher,
    pub(crate) result: &'env ResultSlot<Published>,
    pub(crate) failure: &'env ResultSlot<SolveError>,
    pub(crate) counters: &'env Counters,
    pub(crate) active: &'env AtomicUsize,
}

/// Decrements the active-worker count on every exit path, unwinding included.
struct ActiveGuard<'env> {
    active: &'env AtomicUsize,
    signals: &'env SolverSignals,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.signals.raise(Signal::Failed);
        }
        if self.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.signals.raise(Signal::CompletedAll);
        }
    }
}

struct Machine {
    id: usize,
    state: WorkerState,
}

impl Machine {
    #[inline]
    fn enter(&mut self, next: WorkerState) {
        trace!(worker = self.id, from = ?self.state, to = ?next, "worker state");
        self.state = next;
    }
}

/// Runs worker `id` over `slice` until it publishes, loses, stops or fails.
pub(crate) fn run<H, R>(id: usize, slice: &mut [u8], shared: &Shared<'_, H, R>)
where
    H: SeededHash,
    R: SeedSource,
{
    let _active = ActiveGuard {
        active: shared.active,
        signals: shared.signals,
    };
    let _span = debug_span!("worker", id).entered();

    match attempt_loop(id, slice, shared) {
        Ok(exit) => debug!(?exit, "worker exited"),
        Err(err) => {
            debug!(%err, "worker failed");
            let _ = shared.failure.publish(err);
            shared.signals.raise(Signal::Failed);
        }
    }
}

fn attempt_loop<H, R>(id: usize, slice: &mut [u8], shared: &Shared<'_, H, R>) -> Result<Exit>
where
    H: SeededHash,
    R: SeedSource,
{
    let mut machine = Machine {
        id,
        state: WorkerState::Idle,
    };
    let mut graph = Graph::new(slice, shared.layout)?;

    loop {
        if !shared.signals.poll().is_empty() {
            machine.enter(WorkerState::Stopped);
            return Ok(Exit::Stopped);
        }
        let attempt = shared.counters.attempts.fetch_add(1, Ordering::Relaxed);
        if shared.max_attempts.is_some_and(|max| attempt >= max) {
            shared.counters.attempts.fetch_sub(1, Ordering::Relaxed);
            machine.enter(WorkerState::Stopped);
            return Ok(Exit::Exhausted);
        }

        machine.enter(WorkerState::Seeding);
        graph.reset(shared.seed_source)?;

        machine.enter(WorkerState::EdgeInsertion);
        if graph.insert_keys(shared.hasher, shared.keys).is_err() {
            shared.counters.degenerate.fetch_add(1, Ordering::Relaxed);
            debug!(attempt, seeds = ?graph.seeds(), "degenerate vertex pair");
            machine.enter(WorkerState::Restart);
            continue;
        }

        machine.enter(WorkerState::CycleCheck);
        let acyclic = match graph.try_into_acyclic() {
            Ok(acyclic) => acyclic,
            Err(cyclic) => {
                shared.counters.cyclic.fetch_add(1, Ordering::Relaxed);
                debug!(attempt, deleted = cyclic.deleted_edges(), "graph is cyclic");
                graph = cyclic;
                machine.enter(WorkerState::Restart);
                continue;
            }
        };

        if !shared.finisher.try_claim() {
            machine.enter(WorkerState::Lost);
            debug!(attempt, "acyclic graph found after the winner");
            return Ok(Exit::Lost);
        }

        machine.enter(WorkerState::Assign);
        let mut assigned = acyclic.assign()?;

        machine.enter(WorkerState::Verify);
        assigned.verify(shared.hasher, shared.keys)?;

        machine.enter(WorkerState::Publish);
        let published = Published {
            assigned: assigned.assigned().to_vec(),
            seeds: assigned.seeds(),
            winner: id,
        };
        if shared.result.publish(published).is_err() {
            return Err(SolveError::Invariant("result published twice"));
        }
        shared.signals.raise(Signal::Succeeded);
        info!(attempt, seeds = ?assigned.seeds(), "published table");
        return Ok(Exit::Published);
    }
}
