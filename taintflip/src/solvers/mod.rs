//! Solvers turn a [`SearchTask`] and the input it was recorded on into a new input.
//!
//! Solvers are chained in a compile-time tuple list: the cheap input-to-state solver goes first, anything
//! heavier (e.g. a theorem-prover backed solver) is appended by the caller and only runs on [`SolverResult::Timeout`].

pub mod i2s;

use core::sync::atomic::{AtomicU64, Ordering};

pub use i2s::{I2sConfig, I2sSolver};
use taintflip_bolts::{tuples::NamedTuple, Named};

use crate::task::SearchTask;

/// The outcome of one solve attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverResult {
    /// The output buffer holds a new input, ready to be executed
    Sat,
    /// No input was produced. The output buffer was not touched.
    Timeout,
}

/// A solver takes a task and an input, and produces a new input.
pub trait Solver: Named {
    /// Solves `task` for the recorded `input`.
    ///
    /// On [`SolverResult::Sat`], `output` holds exactly the new input, which may be longer or shorter than `input`.
    fn solve(&self, task: &SearchTask, input: &[u8], output: &mut Vec<u8>) -> SolverResult;
}

/// A `Tuple` of [`Solver`]s, tried in order
pub trait SolversTuple: NamedTuple {
    /// Runs the solvers in order until one succeeds, returning its index.
    fn solve_first(&self, task: &SearchTask, input: &[u8], output: &mut Vec<u8>) -> Option<usize>;

    /// Runs the solvers in order until one succeeds.
    fn solve_all(&self, task: &SearchTask, input: &[u8], output: &mut Vec<u8>) -> SolverResult {
        match self.solve_first(task, input, output) {
            Some(_) => SolverResult::Sat,
            None => SolverResult::Timeout,
        }
    }
}

impl SolversTuple for () {
    #[inline]
    fn solve_first(
        &self,
        _task: &SearchTask,
        _input: &[u8],
        _output: &mut Vec<u8>,
    ) -> Option<usize> {
        None
    }
}

impl<Head, Tail> SolversTuple for (Head, Tail)
where
    Head: Solver,
    Tail: SolversTuple,
{
    fn solve_first(&self, task: &SearchTask, input: &[u8], output: &mut Vec<u8>) -> Option<usize> {
        match self.0.solve(task, input, output) {
            SolverResult::Sat => Some(0),
            SolverResult::Timeout => self.1.solve_first(task, input, output).map(|i| i + 1),
        }
    }
}

/// Counts solve attempts. Safe to share between threads solving concurrently.
#[derive(Debug, Default)]
pub struct SolverStats {
    solved: AtomicU64,
    failed: AtomicU64,
}

impl SolverStats {
    /// Creates zeroed counters
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts for one attempt
    pub fn record(&self, result: SolverResult) {
        let counter = match result {
            SolverResult::Sat => &self.solved,
            SolverResult::Timeout => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Attempts that produced an input
    #[must_use]
    pub fn solved(&self) -> u64 {
        self.solved.load(Ordering::Relaxed)
    }

    /// Attempts that did not
    #[must_use]
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}
