//! The operator tree of one recorded branch comparison.
//!
//! The node set is closed: leaves reference the constraint's argument list, every inner node has exactly two
//! children. Children are held behind [`Arc`] so one subtree may be shared read-only by several constraints.
//! Nodes are never mutated after construction.

use core::fmt::{self, Display, Formatter};
use std::sync::Arc;

use hashbrown::HashMap;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
#[cfg(test)]
use strum_macros::EnumIter;
use strum_macros::Display as KindDisplay;

use crate::Error;

/// The relational comparators. All operands are 64-bit words, the signed kinds reinterpret them as two's complement.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    IntoPrimitive,
    KindDisplay,
)]
#[cfg_attr(test, derive(EnumIter))]
#[repr(u16)]
#[strum(serialize_all = "lowercase")]
pub enum RelationalKind {
    /// `==`
    Equal = 0,
    /// `!=`
    Distinct,
    /// unsigned `<`
    Ult,
    /// unsigned `<=`
    Ule,
    /// unsigned `>`
    Ugt,
    /// unsigned `>=`
    Uge,
    /// signed `<`
    Slt,
    /// signed `<=`
    Sle,
    /// signed `>`
    Sgt,
    /// signed `>=`
    Sge,
}

impl RelationalKind {
    /// The comparator that holds exactly when `self` does not.
    #[must_use]
    pub fn negate(self) -> Self {
        match self {
            Self::Equal => Self::Distinct,
            Self::Distinct => Self::Equal,
            Self::Ult => Self::Uge,
            Self::Ule => Self::Ugt,
            Self::Ugt => Self::Ule,
            Self::Uge => Self::Ult,
            Self::Slt => Self::Sge,
            Self::Sle => Self::Sgt,
            Self::Sgt => Self::Sle,
            Self::Sge => Self::Slt,
        }
    }

    /// The replacement value for the operand we control, given the concrete value of the `other` operand.
    ///
    /// `rhs` is true when our operand is the right hand side of the comparison.
    /// Boundary-inclusive kinds copy `other` through, the strict kinds step one away from it.
    /// The step wraps at the ends of the 64-bit range.
    #[must_use]
    pub fn i2s_target(self, other: u64, rhs: bool) -> u64 {
        match self {
            Self::Equal | Self::Ule | Self::Uge | Self::Sle | Self::Sge => other,
            Self::Distinct | Self::Ugt | Self::Sgt => {
                if rhs {
                    other.wrapping_add(1)
                } else {
                    other.wrapping_sub(1)
                }
            }
            Self::Ult | Self::Slt => {
                if rhs {
                    other.wrapping_sub(1)
                } else {
                    other.wrapping_add(1)
                }
            }
        }
    }
}

/// The binary arithmetic and bitwise operators.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    TryFromPrimitive,
    IntoPrimitive,
    KindDisplay,
)]
#[cfg_attr(test, derive(EnumIter))]
#[repr(u16)]
#[strum(serialize_all = "lowercase")]
pub enum BinaryKind {
    /// `+`
    Add = 0x100,
    /// `-`
    Sub,
    /// `*`
    Mul,
    /// unsigned `/`
    UDiv,
    /// signed `/`
    SDiv,
    /// unsigned `%`
    URem,
    /// signed `%`
    SRem,
    /// `&`
    And,
    /// `|`
    Or,
    /// `^`
    Xor,
    /// `<<`
    Shl,
    /// logical `>>`
    LShr,
    /// arithmetic `>>`
    AShr,
}

/// Shift amounts of 64 and above have no 64-bit counterpart.
fn shift_amount(amount: u64) -> Option<u32> {
    u32::try_from(amount).ok().filter(|s| *s < u64::BITS)
}

impl BinaryKind {
    /// Evaluates `v1 <kind> v2` on 64-bit words.
    ///
    /// Division and remainder by zero yield 0. Shifting by 64 or more yields 0, or the sign fill for [`Self::AShr`].
    #[must_use]
    pub fn forward(self, v1: u64, v2: u64) -> u64 {
        match self {
            Self::Add => v1.wrapping_add(v2),
            Self::Sub => v1.wrapping_sub(v2),
            Self::Mul => v1.wrapping_mul(v2),
            Self::UDiv => v1.checked_div(v2).unwrap_or(0),
            Self::SDiv => {
                if v2 == 0 {
                    0
                } else {
                    (v1 as i64).wrapping_div(v2 as i64) as u64
                }
            }
            Self::URem => v1.checked_rem(v2).unwrap_or(0),
            Self::SRem => {
                if v2 == 0 {
                    0
                } else {
                    (v1 as i64).wrapping_rem(v2 as i64) as u64
                }
            }
            Self::And => v1 & v2,
            Self::Or => v1 | v2,
            Self::Xor => v1 ^ v2,
            Self::Shl => shift_amount(v2).map_or(0, |s| v1 << s),
            Self::LShr => shift_amount(v2).map_or(0, |s| v1 >> s),
            Self::AShr => {
                let v1 = v1 as i64;
                shift_amount(v2).map_or(v1 >> 63, |s| v1 >> s) as u64
            }
        }
    }

    /// Recovers the unknown operand `v` from the result `r` and the known constant operand.
    ///
    /// With `value_on_rhs` the operation was `const_op <kind> v`, otherwise `v <kind> const_op`.
    /// `Mul` and the divisions are exact only when the division is; `URem`, `SRem`, `And` and `Or` are not
    /// injective, their results only sometimes satisfy the forward equation.
    /// Returns `None` when no value can be produced.
    #[must_use]
    pub fn invert(self, r: u64, const_op: u64, value_on_rhs: bool) -> Option<u64> {
        match self {
            Self::Add => Some(r.wrapping_sub(const_op)),
            Self::Sub => Some(if value_on_rhs {
                const_op.wrapping_sub(r)
            } else {
                r.wrapping_add(const_op)
            }),
            Self::Mul => r.checked_div(const_op),
            Self::UDiv => {
                if value_on_rhs {
                    const_op.checked_div(r)
                } else {
                    Some(r.wrapping_mul(const_op))
                }
            }
            Self::SDiv => {
                let (r, c) = (r as i64, const_op as i64);
                if value_on_rhs {
                    (r != 0).then(|| c.wrapping_div(r) as u64)
                } else {
                    Some(r.wrapping_mul(c) as u64)
                }
            }
            // const_op % (const_op - r) == r while const_op > r, const_op % (const_op + 1) == const_op
            Self::URem => {
                if !value_on_rhs {
                    Some(r)
                } else if const_op > r {
                    Some(const_op - r)
                } else if const_op == r {
                    Some(const_op.wrapping_add(1))
                } else {
                    None
                }
            }
            Self::SRem => {
                let (sr, c) = (r as i64, const_op as i64);
                if !value_on_rhs {
                    Some(r)
                } else if c > sr {
                    Some(c.wrapping_sub(sr) as u64)
                } else if c == sr {
                    Some(c.wrapping_add(1) as u64)
                } else {
                    None
                }
            }
            Self::And | Self::Or => Some(r),
            Self::Xor => Some(r ^ const_op),
            Self::Shl => {
                if value_on_rhs {
                    None
                } else {
                    shift_amount(const_op).map(|s| r >> s)
                }
            }
            Self::LShr => {
                if value_on_rhs {
                    None
                } else {
                    shift_amount(const_op).map(|s| r << s)
                }
            }
            Self::AShr => {
                if value_on_rhs {
                    None
                } else {
                    shift_amount(const_op).map(|s| ((r as i64) << s) as u64)
                }
            }
        }
    }
}

/// Which family of comparison a search task asks to satisfy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonKind {
    /// A scalar comparison
    Relational(RelationalKind),
    /// A `memcmp`-style equality over a byte region
    Memcmp,
}

impl Display for ComparisonKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relational(kind) => write!(f, "{kind}"),
            Self::Memcmp => write!(f, "memcmp"),
        }
    }
}

/// The deepest operator tree accepted from a trace. Deeper trees are rejected when decoded or validated.
pub const MAX_TREE_DEPTH: usize = 512;

/// One node of an operator tree.
///
/// Trees travel as [`FlatNode`] lists (see [`AstNode::flatten`] and [`AstNode::from_flat`]), never as nested
/// values, so decoding does not recurse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AstNode {
    /// A constant, referencing the argument at `index`
    Constant {
        /// index into the constraint's arguments
        index: usize,
    },
    /// An opaque value read from the input, referencing the argument at `index`
    Symbol {
        /// index into the constraint's arguments
        index: usize,
    },
    /// `lhs <kind> rhs`
    Relational {
        /// the comparator
        kind: RelationalKind,
        /// left operand
        lhs: Arc<AstNode>,
        /// right operand
        rhs: Arc<AstNode>,
    },
    /// `lhs <kind> rhs`
    Binary {
        /// the operator
        kind: BinaryKind,
        /// left operand
        lhs: Arc<AstNode>,
        /// right operand
        rhs: Arc<AstNode>,
    },
    /// `memcmp(lhs, rhs) == 0`
    StringCompare {
        /// left region
        lhs: Arc<AstNode>,
        /// right region
        rhs: Arc<AstNode>,
    },
}

/// One node of a flattened operator tree. Children are positions of earlier entries in the same list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlatNode {
    /// See [`AstNode::Constant`]
    Constant {
        /// index into the constraint's arguments
        index: usize,
    },
    /// See [`AstNode::Symbol`]
    Symbol {
        /// index into the constraint's arguments
        index: usize,
    },
    /// See [`AstNode::Relational`]
    Relational {
        /// the comparator
        kind: RelationalKind,
        /// position of the left operand
        lhs: usize,
        /// position of the right operand
        rhs: usize,
    },
    /// See [`AstNode::Binary`]
    Binary {
        /// the operator
        kind: BinaryKind,
        /// position of the left operand
        lhs: usize,
        /// position of the right operand
        rhs: usize,
    },
    /// See [`AstNode::StringCompare`]
    StringCompare {
        /// position of the left region
        lhs: usize,
        /// position of the right region
        rhs: usize,
    },
}

impl FlatNode {
    fn children(self) -> Option<(usize, usize)> {
        match self {
            Self::Constant { .. } | Self::Symbol { .. } => None,
            Self::Relational { lhs, rhs, .. }
            | Self::Binary { lhs, rhs, .. }
            | Self::StringCompare { lhs, rhs } => Some((lhs, rhs)),
        }
    }
}

/// The depth of every entry of a flat tree, or an error for a forward reference or a tree deeper than
/// [`MAX_TREE_DEPTH`].
pub(crate) fn flat_depths(nodes: &[FlatNode]) -> Result<Vec<usize>, Error> {
    let mut depths: Vec<usize> = Vec::with_capacity(nodes.len());
    for (pos, node) in nodes.iter().enumerate() {
        let depth = match node.children() {
            None => 1,
            Some((lhs, rhs)) => {
                let (Some(l), Some(r)) = (depths.get(lhs), depths.get(rhs)) else {
                    return Err(Error::illegal_argument(format!(
                        "tree node {pos} references {lhs}/{rhs}, only earlier nodes may be referenced"
                    )));
                };
                1 + l.max(r)
            }
        };
        if depth > MAX_TREE_DEPTH {
            return Err(Error::illegal_argument(format!(
                "operator tree deeper than {MAX_TREE_DEPTH}"
            )));
        }
        depths.push(depth);
    }
    Ok(depths)
}

impl AstNode {
    /// A constant leaf
    #[must_use]
    pub fn constant(index: usize) -> Self {
        Self::Constant { index }
    }

    /// A symbolic leaf
    #[must_use]
    pub fn symbol(index: usize) -> Self {
        Self::Symbol { index }
    }

    /// A relational node
    #[must_use]
    pub fn relational(
        kind: RelationalKind,
        lhs: impl Into<Arc<AstNode>>,
        rhs: impl Into<Arc<AstNode>>,
    ) -> Self {
        Self::Relational {
            kind,
            lhs: lhs.into(),
            rhs: rhs.into(),
        }
    }

    /// A binary operation node
    #[must_use]
    pub fn binary(
        kind: BinaryKind,
        lhs: impl Into<Arc<AstNode>>,
        rhs: impl Into<Arc<AstNode>>,
    ) -> Self {
        Self::Binary {
            kind,
            lhs: lhs.into(),
            rhs: rhs.into(),
        }
    }

    /// A `memcmp` node
    #[must_use]
    pub fn string_compare(lhs: impl Into<Arc<AstNode>>, rhs: impl Into<Arc<AstNode>>) -> Self {
        Self::StringCompare {
            lhs: lhs.into(),
            rhs: rhs.into(),
        }
    }

    /// The two children, or `None` for a leaf
    #[must_use]
    pub fn children(&self) -> Option<(&AstNode, &AstNode)> {
        match self {
            Self::Constant { .. } | Self::Symbol { .. } => None,
            Self::Relational { lhs, rhs, .. }
            | Self::Binary { lhs, rhs, .. }
            | Self::StringCompare { lhs, rhs } => Some((lhs, rhs)),
        }
    }

    /// The comparison this node performs, if it is a comparison at all
    #[must_use]
    pub fn comparison_kind(&self) -> Option<ComparisonKind> {
        match self {
            Self::Relational { kind, .. } => Some(ComparisonKind::Relational(*kind)),
            Self::StringCompare { .. } => Some(ComparisonKind::Memcmp),
            _ => None,
        }
    }

    /// Matches a binary operation with exactly one [`Self::Constant`] child.
    ///
    /// Returns the operator, the argument index of the constant, and whether the other (unknown) operand sits on
    /// the right hand side of the operator.
    #[must_use]
    pub fn constant_binop(&self) -> Option<(BinaryKind, usize, bool)> {
        let Self::Binary { kind, lhs, rhs } = self else {
            return None;
        };
        match (lhs.as_ref(), rhs.as_ref()) {
            (Self::Constant { .. }, Self::Constant { .. }) => None,
            (Self::Constant { index }, _) => Some((*kind, *index, true)),
            (_, Self::Constant { index }) => Some((*kind, *index, false)),
            _ => None,
        }
    }

    /// Flattens the tree, children before parents, the root last.
    ///
    /// A subtree shared through the same [`Arc`] is emitted once, so the result stays linear in the number of
    /// distinct nodes.
    #[must_use]
    pub fn flatten(&self) -> Vec<FlatNode> {
        let mut flat = Vec::new();
        let mut positions: HashMap<*const AstNode, usize> = HashMap::new();
        let mut stack = vec![(self, false)];
        while let Some((node, expanded)) = stack.pop() {
            let key: *const AstNode = node;
            if positions.contains_key(&key) {
                continue;
            }
            let entry = match (node, node.children()) {
                (_, Some((lhs, rhs))) if !expanded => {
                    stack.push((node, true));
                    stack.push((rhs, false));
                    stack.push((lhs, false));
                    continue;
                }
                (Self::Constant { index }, _) => FlatNode::Constant { index: *index },
                (Self::Symbol { index }, _) => FlatNode::Symbol { index: *index },
                (Self::Relational { kind, lhs, rhs }, _) => FlatNode::Relational {
                    kind: *kind,
                    lhs: positions[&Arc::as_ptr(lhs)],
                    rhs: positions[&Arc::as_ptr(rhs)],
                },
                (Self::Binary { kind, lhs, rhs }, _) => FlatNode::Binary {
                    kind: *kind,
                    lhs: positions[&Arc::as_ptr(lhs)],
                    rhs: positions[&Arc::as_ptr(rhs)],
                },
                (Self::StringCompare { lhs, rhs }, _) => FlatNode::StringCompare {
                    lhs: positions[&Arc::as_ptr(lhs)],
                    rhs: positions[&Arc::as_ptr(rhs)],
                },
            };
            positions.insert(key, flat.len());
            flat.push(entry);
        }
        flat
    }

    /// Rebuilds a tree from [`Self::flatten`] output, sharing nodes that are referenced more than once.
    ///
    /// The last entry is the root. Fails on an empty list, on references to later entries and on trees deeper
    /// than [`MAX_TREE_DEPTH`].
    pub fn from_flat(nodes: &[FlatNode]) -> Result<Arc<Self>, Error> {
        flat_depths(nodes)?;
        let mut built: Vec<Arc<Self>> = Vec::with_capacity(nodes.len());
        for node in nodes {
            let child = |pos: usize| built[pos].clone();
            let node = match *node {
                FlatNode::Constant { index } => Self::Constant { index },
                FlatNode::Symbol { index } => Self::Symbol { index },
                FlatNode::Relational { kind, lhs, rhs } => Self::Relational {
                    kind,
                    lhs: child(lhs),
                    rhs: child(rhs),
                },
                FlatNode::Binary { kind, lhs, rhs } => Self::Binary {
                    kind,
                    lhs: child(lhs),
                    rhs: child(rhs),
                },
                FlatNode::StringCompare { lhs, rhs } => Self::StringCompare {
                    lhs: child(lhs),
                    rhs: child(rhs),
                },
            };
            built.push(Arc::new(node));
        }
        built.pop().ok_or_else(|| Error::empty("operator tree"))
    }
}

impl Display for AstNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant { index } => write!(f, "c{index}"),
            Self::Symbol { index } => write!(f, "s{index}"),
            Self::Relational { kind, lhs, rhs } => write!(f, "({kind} {lhs} {rhs})"),
            Self::Binary { kind, lhs, rhs } => write!(f, "({kind} {lhs} {rhs})"),
            Self::StringCompare { lhs, rhs } => write!(f, "(memcmp {lhs} {rhs})"),
        }
    }
}
