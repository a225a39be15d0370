//! One recorded branch comparison: its operator tree, the operand values observed at runtime,
//! and where parsed numerals came from.

use std::sync::Arc;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::{
    ast::{flat_depths, AstNode, ComparisonKind, FlatNode},
    Error,
};

/// A leaf value referenced by index from [`AstNode::Constant`] and [`AstNode::Symbol`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Argument {
    /// `false` if the value was derived from input bytes
    pub is_constant: bool,
    /// The constant itself, or a producer-defined identifier for a symbolic value
    pub value: u64,
}

impl Argument {
    /// A constant argument
    #[must_use]
    pub fn constant(value: u64) -> Self {
        Self {
            is_constant: true,
            value,
        }
    }

    /// A symbolic argument
    #[must_use]
    pub fn symbolic(value: u64) -> Self {
        Self {
            is_constant: false,
            value,
        }
    }
}

/// How an input range was parsed into a number, e.g. by `atoi` or `strtoul`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NumeralInfo {
    /// The numeric base, as reported by the runtime. Unchecked until use.
    pub base: u32,
    /// The length of the numeral text in the input
    pub length: usize,
}

/// Input offset to numeral info. Offsets without an entry hold raw binary values.
pub type NumeralProvenance = HashMap<usize, NumeralInfo>;

/// A validated branch comparison.
///
/// Every leaf of the tree references an existing argument, every [`AstNode::Constant`] leaf references a constant
/// argument, the root is a comparison, and the tree is at most [`crate::ast::MAX_TREE_DEPTH`] deep.
/// Deserialization runs the same checks as [`Constraint::new`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawConstraint", into = "RawConstraint")]
pub struct Constraint {
    root: Arc<AstNode>,
    comparison: ComparisonKind,
    op1: u64,
    op2: u64,
    arguments: Vec<Argument>,
    numerals: NumeralProvenance,
    region_size: usize,
}

/// The unchecked wire form of a [`Constraint`], with the tree flattened
#[derive(Serialize, Deserialize)]
struct RawConstraint {
    tree: Vec<FlatNode>,
    op1: u64,
    op2: u64,
    arguments: Vec<Argument>,
    numerals: NumeralProvenance,
    region_size: usize,
}

impl TryFrom<RawConstraint> for Constraint {
    type Error = Error;

    fn try_from(raw: RawConstraint) -> Result<Self, Self::Error> {
        let root = AstNode::from_flat(&raw.tree)?;
        Ok(Self::new(root, raw.op1, raw.op2, raw.arguments)?
            .with_numerals(raw.numerals)
            .with_region_size(raw.region_size))
    }
}

impl From<Constraint> for RawConstraint {
    fn from(constraint: Constraint) -> Self {
        Self {
            tree: constraint.root.flatten(),
            op1: constraint.op1,
            op2: constraint.op2,
            arguments: constraint.arguments,
            numerals: constraint.numerals,
            region_size: constraint.region_size,
        }
    }
}

impl Constraint {
    /// Creates a new [`Constraint`] after checking the tree against the arguments.
    ///
    /// `op1` and `op2` are the concrete values of the root's two operands at recording time.
    pub fn new(
        root: impl Into<Arc<AstNode>>,
        op1: u64,
        op2: u64,
        arguments: Vec<Argument>,
    ) -> Result<Self, Error> {
        let root = root.into();
        let Some(comparison) = root.comparison_kind() else {
            return Err(Error::illegal_argument(
                "constraint root is not a comparison",
            ));
        };
        let tree = root.flatten();
        flat_depths(&tree)?;
        for node in tree {
            match node {
                FlatNode::Constant { index } => match arguments.get(index) {
                    Some(arg) if arg.is_constant => {}
                    Some(_) => {
                        return Err(Error::illegal_argument(format!(
                            "constant leaf c{index} references a symbolic argument"
                        )))
                    }
                    None => {
                        return Err(Error::illegal_argument(format!(
                            "argument index {index} out of range ({} arguments)",
                            arguments.len()
                        )))
                    }
                },
                FlatNode::Symbol { index } if index >= arguments.len() => {
                    return Err(Error::illegal_argument(format!(
                        "argument index {index} out of range ({} arguments)",
                        arguments.len()
                    )))
                }
                _ => {}
            }
        }
        Ok(Self {
            root,
            comparison,
            op1,
            op2,
            arguments,
            numerals: NumeralProvenance::new(),
            region_size: 0,
        })
    }

    /// Sets the numeral provenance of the input ranges involved
    #[must_use]
    pub fn with_numerals(mut self, numerals: NumeralProvenance) -> Self {
        self.numerals = numerals;
        self
    }

    /// Records that the range at `offset` was parsed from ASCII
    #[must_use]
    pub fn with_numeral(mut self, offset: usize, info: NumeralInfo) -> Self {
        self.numerals.insert(offset, info);
        self
    }

    /// Sets the number of bytes compared by a `memcmp`
    #[must_use]
    pub fn with_region_size(mut self, region_size: usize) -> Self {
        self.region_size = region_size;
        self
    }

    /// The operator tree
    #[must_use]
    pub fn root(&self) -> &AstNode {
        &self.root
    }

    /// The comparison performed by the root
    #[must_use]
    pub fn comparison(&self) -> ComparisonKind {
        self.comparison
    }

    /// The concrete value of the left operand
    #[must_use]
    pub fn op1(&self) -> u64 {
        self.op1
    }

    /// The concrete value of the right operand
    #[must_use]
    pub fn op2(&self) -> u64 {
        self.op2
    }

    /// All arguments, in the order the producer recorded them
    #[must_use]
    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    /// The argument at `index`
    #[must_use]
    pub fn argument(&self, index: usize) -> Option<&Argument> {
        self.arguments.get(index)
    }

    /// Input ranges that were parsed from ASCII numerals
    #[must_use]
    pub fn numerals(&self) -> &NumeralProvenance {
        &self.numerals
    }

    /// The number of bytes compared, for `memcmp` constraints
    #[must_use]
    pub fn region_size(&self) -> usize {
        self.region_size
    }
}
