//! Compiletime lists/tuples used to chain solvers without dynamic dispatch

pub use tuple_list::{tuple_list, tuple_list_type, TupleList};

use crate::Named;

/// Gets the length of the element
pub trait HasConstLen {
    /// The length as constant `usize`
    const LEN: usize;
}

impl HasConstLen for () {
    const LEN: usize = 0;
}

impl<Head, Tail> HasConstLen for (Head, Tail)
where
    Tail: HasConstLen,
{
    const LEN: usize = 1 + Tail::LEN;
}

/// A named tuple
pub trait NamedTuple: HasConstLen {
    /// Gets the name of the element at `index`
    fn name(&self, index: usize) -> Option<&str>;

    /// Gets all names, in tuple order
    fn names(&self) -> Vec<&str> {
        (0..Self::LEN).filter_map(|i| self.name(i)).collect()
    }
}

impl NamedTuple for () {
    fn name(&self, _index: usize) -> Option<&str> {
        None
    }
}

impl<Head, Tail> NamedTuple for (Head, Tail)
where
    Head: Named,
    Tail: NamedTuple,
{
    fn name(&self, index: usize) -> Option<&str> {
        if index == 0 {
            Some(self.0.name())
        } else {
            self.1.name(index - 1)
        }
    }
}
