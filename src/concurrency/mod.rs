//! Synchronization shared between the solver and its workers.

pub mod futex;
pub mod publish;
pub mod signals;

pub use publish::{FirstFinisher, ResultSlot};
pub use signals::{Signal, SignalSet, SolverSignals, SolverState};
