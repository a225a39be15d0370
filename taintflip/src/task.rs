//! Search tasks: constraints paired with guesses of where their symbolic operands live in the input.

use core::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{ast::ComparisonKind, constraint::Constraint, Error};

/// A guess at the input bytes holding a constraint's symbolic operand
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    /// Offset of the first byte
    pub offset: usize,
    /// Number of bytes
    pub length: usize,
}

impl Candidate {
    /// Creates a new [`Candidate`]
    #[must_use]
    pub fn new(offset: usize, length: usize) -> Self {
        Self { offset, length }
    }

    /// The byte range of this candidate, if it lies entirely within an input of `input_len` bytes.
    ///
    /// Offsets and lengths come from an instrumented, possibly hostile, run: never index without this check.
    #[must_use]
    pub fn range_in(&self, input_len: usize) -> Option<Range<usize>> {
        let end = self.offset.checked_add(self.length)?;
        (end <= input_len).then_some(self.offset..end)
    }
}

/// One solve request.
///
/// Holds co-indexed lists of constraints, their candidates and the comparison to satisfy for each. The comparison
/// may differ from the one the constraint's root records (e.g. its negation to flip a branch), but always belongs to
/// the same family.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSearchTask")]
pub struct SearchTask {
    constraints: Vec<Arc<Constraint>>,
    candidates: Vec<Vec<Candidate>>,
    comparisons: Vec<ComparisonKind>,
}

#[derive(Deserialize)]
struct RawSearchTask {
    constraints: Vec<Arc<Constraint>>,
    candidates: Vec<Vec<Candidate>>,
    comparisons: Vec<ComparisonKind>,
}

impl TryFrom<RawSearchTask> for SearchTask {
    type Error = Error;

    fn try_from(raw: RawSearchTask) -> Result<Self, Self::Error> {
        Self::with_constraints(raw.constraints, raw.candidates, raw.comparisons)
    }
}

/// A borrowed view of one entry of a [`SearchTask`]
#[derive(Clone, Copy, Debug)]
pub struct TaskEntry<'a> {
    /// The constraint
    pub constraint: &'a Constraint,
    /// Where the constraint's symbolic operand may live
    pub candidates: &'a [Candidate],
    /// The comparison to satisfy
    pub comparison: ComparisonKind,
}

fn check_family(constraint: &Constraint, comparison: ComparisonKind) -> Result<(), Error> {
    match (constraint.comparison(), comparison) {
        (ComparisonKind::Relational(_), ComparisonKind::Relational(_))
        | (ComparisonKind::Memcmp, ComparisonKind::Memcmp) => Ok(()),
        (recorded, requested) => Err(Error::illegal_argument(format!(
            "cannot solve a {recorded} constraint as {requested}"
        ))),
    }
}

impl SearchTask {
    /// Creates a task for a single constraint
    pub fn new(
        constraint: impl Into<Arc<Constraint>>,
        candidates: Vec<Candidate>,
        comparison: ComparisonKind,
    ) -> Result<Self, Error> {
        let constraint = constraint.into();
        check_family(&constraint, comparison)?;
        Ok(Self {
            constraints: vec![constraint],
            candidates: vec![candidates],
            comparisons: vec![comparison],
        })
    }

    /// Creates a task from co-indexed lists
    pub fn with_constraints(
        constraints: Vec<Arc<Constraint>>,
        candidates: Vec<Vec<Candidate>>,
        comparisons: Vec<ComparisonKind>,
    ) -> Result<Self, Error> {
        if constraints.is_empty() {
            return Err(Error::empty("search task"));
        }
        if constraints.len() != candidates.len() || constraints.len() != comparisons.len() {
            return Err(Error::illegal_argument(format!(
                "co-indexed lists differ in length: {} constraints, {} candidate lists, {} comparisons",
                constraints.len(),
                candidates.len(),
                comparisons.len()
            )));
        }
        for (constraint, comparison) in constraints.iter().zip(&comparisons) {
            check_family(constraint, *comparison)?;
        }
        Ok(Self {
            constraints,
            candidates,
            comparisons,
        })
    }

    /// Adds another constraint to this task
    pub fn push(
        &mut self,
        constraint: impl Into<Arc<Constraint>>,
        candidates: Vec<Candidate>,
        comparison: ComparisonKind,
    ) -> Result<(), Error> {
        let constraint = constraint.into();
        check_family(&constraint, comparison)?;
        self.constraints.push(constraint);
        self.candidates.push(candidates);
        self.comparisons.push(comparison);
        Ok(())
    }

    /// The number of constraints
    #[must_use]
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Always `false` for a constructed task
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// The entry at `index`
    #[must_use]
    pub fn get(&self, index: usize) -> Option<TaskEntry<'_>> {
        Some(TaskEntry {
            constraint: self.constraints.get(index)?,
            candidates: self.candidates.get(index)?,
            comparison: *self.comparisons.get(index)?,
        })
    }

    /// The only entry, or `None` if the task bundles several constraints
    #[must_use]
    pub fn single(&self) -> Option<TaskEntry<'_>> {
        if self.len() == 1 {
            self.get(0)
        } else {
            None
        }
    }

    /// Iterates over all entries
    pub fn iter(&self) -> impl Iterator<Item = TaskEntry<'_>> {
        (0..self.len()).filter_map(|i| self.get(i))
    }
}
