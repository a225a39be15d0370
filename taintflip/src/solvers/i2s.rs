//! The input-to-state solver.
//!
//! Instead of solving a constraint, it looks for the concrete operand values of a comparison in the input and
//! replaces them with a value that flips the comparison. Handled shapes:
//! * a candidate holding an operand verbatim, little or big endian,
//! * a candidate feeding a single binary operation with a constant, whose result is the operand,
//! * a candidate holding an ASCII numeral that was parsed into the operand,
//! * a `memcmp` region compared against constant chunks.
//!
//! Everything else is declined with [`SolverResult::Timeout`], leaving heavier solvers to deal with it.

use serde::{Deserialize, Serialize};
use taintflip_bolts::Named;
use typed_builder::TypedBuilder;

use super::{Solver, SolverResult, SolverStats};
use crate::{
    ast::{ComparisonKind, RelationalKind},
    constraint::{Constraint, NumeralInfo},
    numeral::{format_numeral, parse_numeral, NumeralBase},
    task::{Candidate, SearchTask},
};

/// The widest scalar operand, in bytes
pub const MAX_SCALAR_WIDTH: usize = 8;

/// The default for [`I2sConfig::max_numeral_len`]
pub const DEFAULT_MAX_NUMERAL_LEN: usize = 64;

/// Tunables of the [`I2sSolver`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct I2sConfig {
    /// Longer numerals are not rewritten. Numeral lengths come from the traced run and are not trusted.
    #[builder(default = DEFAULT_MAX_NUMERAL_LEN)]
    pub max_numeral_len: usize,
    /// Look for big endian operands, too
    #[builder(default = true)]
    pub byteswap: bool,
    /// Invert a single binary operation with a constant operand
    #[builder(default = true)]
    pub binop_inversion: bool,
}

impl Default for I2sConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Bit mask covering `width` bytes
fn width_mask(width: usize) -> u64 {
    if width >= MAX_SCALAR_WIDTH {
        u64::MAX
    } else {
        (1_u64 << (width * 8)) - 1
    }
}

/// Reverses the byte order of the low `width` bytes of `value`
fn swap_width(value: u64, width: usize) -> u64 {
    value.swap_bytes() >> (64 - width * 8)
}

/// Reads up to 8 bytes as a little endian word
fn read_le(bytes: &[u8]) -> u64 {
    let mut buf = [0_u8; MAX_SCALAR_WIDTH];
    buf[..bytes.len()].copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

/// The input-to-state solver, see the [module docs](self)
#[derive(Debug, Default)]
pub struct I2sSolver {
    config: I2sConfig,
    stats: SolverStats,
}

impl Named for I2sSolver {
    fn name(&self) -> &str {
        "I2sSolver"
    }
}

impl Solver for I2sSolver {
    fn solve(&self, task: &SearchTask, input: &[u8], output: &mut Vec<u8>) -> SolverResult {
        // several constraints at once are left to the next solver, and not accounted for
        let Some(entry) = task.single() else {
            log::debug!("i2s: skipping task with {} constraints", task.len());
            return SolverResult::Timeout;
        };
        let result = match entry.comparison {
            ComparisonKind::Relational(kind) => {
                self.solve_relational(kind, entry.constraint, entry.candidates, input, output)
            }
            ComparisonKind::Memcmp => {
                Self::solve_memcmp(entry.constraint, entry.candidates, input, output)
            }
        };
        self.stats.record(result);
        result
    }
}

impl I2sSolver {
    /// Creates a new [`I2sSolver`] with the default [`I2sConfig`]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new [`I2sSolver`] with the given config
    #[must_use]
    pub fn with_config(config: I2sConfig) -> Self {
        Self {
            config,
            stats: SolverStats::new(),
        }
    }

    /// The config in use
    #[must_use]
    pub fn config(&self) -> &I2sConfig {
        &self.config
    }

    /// Solved and failed attempts so far
    #[must_use]
    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    fn solve_relational(
        &self,
        kind: RelationalKind,
        constraint: &Constraint,
        candidates: &[Candidate],
        input: &[u8],
        output: &mut Vec<u8>,
    ) -> SolverResult {
        for candidate in candidates {
            log::trace!(
                "i2s: try offset {}, length {}",
                candidate.offset,
                candidate.length
            );
            if let Some(info) = constraint.numerals().get(&candidate.offset) {
                if self.solve_numeral(kind, constraint, candidate.offset, *info, input, output) {
                    return SolverResult::Sat;
                }
                continue;
            }

            if candidate.length == 0 || candidate.length > MAX_SCALAR_WIDTH {
                continue;
            }

            let Some(range) = candidate.range_in(input.len()) else {
                log::trace!("i2s: candidate at {} exceeds the input", candidate.offset);
                continue;
            };
            let value = read_le(&input[range.clone()]);
            let Some(replacement) = self.replacement(kind, constraint, value, candidate.length)
            else {
                continue;
            };

            log::debug!(
                "i2s: offset {}, length {}: {value:#x} -> {replacement:#x}",
                candidate.offset,
                candidate.length
            );
            output.clear();
            output.extend_from_slice(input);
            output[range].copy_from_slice(&replacement.to_le_bytes()[..candidate.length]);
            return SolverResult::Sat;
        }
        SolverResult::Timeout
    }

    /// The value to write in place of `value`, if `value` can be tied to an operand.
    fn replacement(
        &self,
        kind: RelationalKind,
        constraint: &Constraint,
        value: u64,
        width: usize,
    ) -> Option<u64> {
        let (op1, op2) = (constraint.op1(), constraint.op2());
        if value == op1 {
            return Some(kind.i2s_target(op2, false));
        }
        if value == op2 {
            return Some(kind.i2s_target(op1, true));
        }
        if self.config.byteswap {
            let swapped = swap_width(value, width);
            if swapped == op1 {
                return Some(swap_width(kind.i2s_target(op2, false), width));
            }
            if swapped == op2 {
                return Some(swap_width(kind.i2s_target(op1, true), width));
            }
        }
        if self.config.binop_inversion {
            return Self::invert_binop(kind, constraint, value, width);
        }
        None
    }

    /// Handles `(value op const) cmp x` and `x cmp (value op const)`, and the mirrored forms of `op`.
    fn invert_binop(
        kind: RelationalKind,
        constraint: &Constraint,
        value: u64,
        width: usize,
    ) -> Option<u64> {
        let mask = width_mask(width);
        let (lhs, rhs) = constraint.root().children()?;
        let (op1, op2) = (constraint.op1(), constraint.op2());

        let (binop, const_op, value_on_rhs, on_cmp_rhs) = [(lhs, op1, false), (rhs, op2, true)]
            .into_iter()
            .find_map(|(node, operand, on_cmp_rhs)| {
                let (binop, index, value_on_rhs) = node.constant_binop()?;
                let const_op = constraint.argument(index)?.value;
                let result = if value_on_rhs {
                    binop.forward(const_op, value)
                } else {
                    binop.forward(value, const_op)
                } & mask;
                log::trace!("i2s: binop {value:#x} {binop} {const_op:#x} = {result:#x} =? {operand:#x}");
                (result == operand).then_some((binop, const_op, value_on_rhs, on_cmp_rhs))
            })?;

        let other = if on_cmp_rhs { op1 } else { op2 };
        let expected = kind.i2s_target(other, on_cmp_rhs);
        let replacement = binop.invert(expected, const_op, value_on_rhs)? & mask;
        log::debug!("i2s: inverted {binop} {const_op:#x}: {expected:#x} <- {replacement:#x}");
        Some(replacement)
    }

    /// Rewrites an ASCII numeral in place. Returns `true` if `output` holds a new input.
    fn solve_numeral(
        &self,
        kind: RelationalKind,
        constraint: &Constraint,
        offset: usize,
        info: NumeralInfo,
        input: &[u8],
        output: &mut Vec<u8>,
    ) -> bool {
        let Ok(base) = NumeralBase::try_from(info.base) else {
            log::warn!("i2s: unsupported numeral base {}", info.base);
            return false;
        };
        if info.length > self.config.max_numeral_len {
            log::warn!(
                "i2s: numeral of {} bytes at {offset} exceeds the limit of {}",
                info.length,
                self.config.max_numeral_len
            );
            return false;
        }
        let Some(range) = Candidate::new(offset, info.length).range_in(input.len()) else {
            log::warn!(
                "i2s: numeral at {offset}, length {} exceeds the input of {} bytes",
                info.length,
                input.len()
            );
            return false;
        };

        let parsed = parse_numeral(&input[range.clone()], base);
        let replacement = if parsed.value == constraint.op1() {
            kind.i2s_target(constraint.op2(), false)
        } else if parsed.value == constraint.op2() {
            kind.i2s_target(constraint.op1(), true)
        } else {
            return false;
        };
        let text = format_numeral(replacement, base, parsed.negative);
        log::debug!(
            "i2s: numeral at {offset}: {:#x} -> {text} (base {})",
            parsed.value,
            info.base
        );

        output.clear();
        output.reserve(input.len() - info.length + text.len());
        output.extend_from_slice(&input[..range.start]);
        output.extend_from_slice(text.as_bytes());
        output.extend_from_slice(&input[range.end..]);
        true
    }

    /// Copies the constant side of a `memcmp` over the symbolic region.
    fn solve_memcmp(
        constraint: &Constraint,
        candidates: &[Candidate],
        input: &[u8],
        output: &mut Vec<u8>,
    ) -> SolverResult {
        let arguments = constraint.arguments();
        if arguments.iter().all(|arg| arg.is_constant) {
            log::debug!("i2s: memcmp of two constants");
            return SolverResult::Timeout;
        }
        let [candidate] = candidates else {
            log::warn!("i2s: memcmp with {} candidates, expected one", candidates.len());
            return SolverResult::Timeout;
        };
        if candidate.length != constraint.region_size() {
            log::warn!(
                "i2s: memcmp candidate of {} bytes for a region of {}",
                candidate.length,
                constraint.region_size()
            );
            return SolverResult::Timeout;
        }
        let Some(range) = candidate.range_in(input.len()) else {
            log::warn!("i2s: memcmp region at {} exceeds the input", candidate.offset);
            return SolverResult::Timeout;
        };

        let constant_bytes = arguments
            .iter()
            .filter(|arg| arg.is_constant)
            .flat_map(|arg| arg.value.to_le_bytes());
        output.clear();
        output.extend_from_slice(input);
        for (dst, src) in output[range].iter_mut().zip(constant_bytes) {
            *dst = src;
        }
        log::debug!(
            "i2s: memcmp wrote {} bytes at {}",
            candidate.length,
            candidate.offset
        );
        SolverResult::Sat
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::{I2sConfig, I2sSolver};
    use crate::{
        ast::{AstNode, BinaryKind, ComparisonKind, RelationalKind},
        constraint::{Argument, Constraint, NumeralInfo},
        solvers::{Solver, SolverResult},
        task::{Candidate, SearchTask},
    };

    /// `s0 <kind> c1`, recorded with the given operand values
    fn scalar(kind: RelationalKind, op1: u64, op2: u64) -> Constraint {
        Constraint::new(
            AstNode::relational(kind, AstNode::symbol(0), AstNode::constant(1)),
            op1,
            op2,
            vec![Argument::symbolic(0), Argument::constant(op2)],
        )
        .unwrap()
    }

    fn task(constraint: Constraint, candidates: Vec<Candidate>) -> SearchTask {
        let comparison = constraint.comparison();
        SearchTask::new(constraint, candidates, comparison).unwrap()
    }

    fn solve(solver: &I2sSolver, task: &SearchTask, input: &[u8]) -> (SolverResult, Vec<u8>) {
        let mut output = vec![];
        let result = solver.solve(task, input, &mut output);
        (result, output)
    }

    fn word_at(buf: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn identity_equality() {
        let mut input = vec![0xaa; 12];
        input[4..8].copy_from_slice(&0x1234_u32.to_le_bytes());
        let t = task(
            scalar(RelationalKind::Equal, 0x1234, 0x1234),
            vec![Candidate::new(4, 4)],
        );
        let solver = I2sSolver::new();
        let (result, output) = solve(&solver, &t, &input);
        assert_eq!(result, SolverResult::Sat);
        assert_eq!(output, input);
        assert_eq!(solver.stats().solved(), 1);
    }

    #[test]
    fn boundary_flip() {
        let mut input = vec![0; 8];
        input[0..4].copy_from_slice(&10_u32.to_le_bytes());
        let t = task(scalar(RelationalKind::Ult, 10, 20), vec![Candidate::new(0, 4)]);
        let (result, output) = solve(&I2sSolver::new(), &t, &input);
        assert_eq!(result, SolverResult::Sat);
        assert_eq!(word_at(&output, 0), 21);
        assert_eq!(output.len(), input.len());
    }

    #[test]
    fn distinct_flip() {
        let input = 5_u64.to_le_bytes();
        let t = task(scalar(RelationalKind::Distinct, 5, 5), vec![Candidate::new(0, 8)]);
        let (result, output) = solve(&I2sSolver::new(), &t, &input);
        assert_eq!(result, SolverResult::Sat);
        // the candidate matches op1 first, so it is treated as the left hand side
        assert_eq!(u64::from_le_bytes(output.try_into().unwrap()), 4);
    }

    #[test]
    fn candidate_on_rhs() {
        // 7 ugt s0, with s0 == 3
        let c = Constraint::new(
            AstNode::relational(RelationalKind::Ugt, AstNode::constant(1), AstNode::symbol(0)),
            7,
            3,
            vec![Argument::symbolic(0), Argument::constant(7)],
        )
        .unwrap();
        let input = [3_u8, 0xff];
        let t = task(c, vec![Candidate::new(0, 1)]);
        let (result, output) = solve(&I2sSolver::new(), &t, &input);
        assert_eq!(result, SolverResult::Sat);
        assert_eq!(output, [8, 0xff]);
    }

    #[test]
    fn big_endian_operand() {
        let mut input = vec![0; 6];
        input[2..6].copy_from_slice(&0x1122_3344_u32.to_be_bytes());
        let t = task(
            scalar(RelationalKind::Equal, 0x1122_3344, 0xcafe_babe),
            vec![Candidate::new(2, 4)],
        );
        let (result, output) = solve(&I2sSolver::new(), &t, &input);
        assert_eq!(result, SolverResult::Sat);
        assert_eq!(&output[2..6], &0xcafe_babe_u32.to_be_bytes());

        let solver = I2sSolver::with_config(I2sConfig::builder().byteswap(false).build());
        let (result, output) = solve(&solver, &t, &input);
        assert_eq!(result, SolverResult::Timeout);
        assert!(output.is_empty());
    }

    #[test]
    fn big_endian_three_bytes() {
        let input = [0x11, 0x22, 0x33, 0xee];
        let t = task(
            scalar(RelationalKind::Equal, 0x11_2233, 0x44_5566),
            vec![Candidate::new(0, 3)],
        );
        let (result, output) = solve(&I2sSolver::new(), &t, &input);
        assert_eq!(result, SolverResult::Sat);
        assert_eq!(output, [0x44, 0x55, 0x66, 0xee]);
    }

    #[test]
    fn binop_inversion_lhs() {
        // (s0 + 5) == 100, recorded with s0 == 10
        let c = Constraint::new(
            AstNode::relational(
                RelationalKind::Equal,
                AstNode::binary(BinaryKind::Add, AstNode::symbol(0), AstNode::constant(1)),
                AstNode::constant(2),
            ),
            15,
            100,
            vec![
                Argument::symbolic(0),
                Argument::constant(5),
                Argument::constant(100),
            ],
        )
        .unwrap();
        let mut input = vec![0; 8];
        input[4..8].copy_from_slice(&10_u32.to_le_bytes());
        let t = task(c, vec![Candidate::new(0, 4), Candidate::new(4, 4)]);
        let (result, output) = solve(&I2sSolver::new(), &t, &input);
        assert_eq!(result, SolverResult::Sat);
        assert_eq!(word_at(&output, 4), 95);
        assert_eq!(word_at(&output, 0), 0);
    }

    #[test]
    fn binop_inversion_rhs() {
        // 1000 ult (50 - s0), recorded with s0 == 8
        let c = Constraint::new(
            AstNode::relational(
                RelationalKind::Ult,
                AstNode::constant(2),
                AstNode::binary(BinaryKind::Sub, AstNode::constant(1), AstNode::symbol(0)),
            ),
            1000,
            42,
            vec![
                Argument::symbolic(0),
                Argument::constant(50),
                Argument::constant(1000),
            ],
        )
        .unwrap();
        let input = [8_u8, 0, 0, 0];
        let t = task(c, vec![Candidate::new(0, 2)]);
        let (result, output) = solve(&I2sSolver::new(), &t, &input);
        assert_eq!(result, SolverResult::Sat);
        // target for the rhs: 1000 - 1 = 999, so 50 - s0 = 999 and s0 = 50 - 999, masked to 16 bits
        let expected = 50_u64.wrapping_sub(999) & 0xffff;
        assert_eq!(u64::from(u16::from_le_bytes([output[0], output[1]])), expected);
        assert_eq!(&output[2..], &input[2..]);
    }

    /// `(s0 <kind> c1) == c2`, recorded with `s0 == value`
    fn binop_equal(kind: BinaryKind, value: u64, const_op: u64, target: u64) -> Constraint {
        Constraint::new(
            AstNode::relational(
                RelationalKind::Equal,
                AstNode::binary(kind, AstNode::symbol(0), AstNode::constant(1)),
                AstNode::constant(2),
            ),
            kind.forward(value, const_op),
            target,
            vec![
                Argument::symbolic(0),
                Argument::constant(const_op),
                Argument::constant(target),
            ],
        )
        .unwrap()
    }

    #[test]
    fn xor_inversion() {
        let t = task(
            binop_equal(BinaryKind::Xor, 0x1000, 0x5a, 0x1234),
            vec![Candidate::new(0, 2)],
        );
        let (result, output) = solve(&I2sSolver::new(), &t, &0x1000_u16.to_le_bytes());
        assert_eq!(result, SolverResult::Sat);
        assert_eq!(output, 0x126e_u16.to_le_bytes());
    }

    #[test]
    fn shift_inversion_value_on_lhs() {
        // (s0 << 4) == 0x340, recorded with s0 == 0x12
        let t = task(
            binop_equal(BinaryKind::Shl, 0x12, 4, 0x340),
            vec![Candidate::new(0, 2)],
        );
        let (result, output) = solve(&I2sSolver::new(), &t, &[0x12, 0]);
        assert_eq!(result, SolverResult::Sat);
        assert_eq!(output, [0x34, 0]);

        // (s0 >> 8) == 0x7f, recorded with s0 == 0x1234
        let t = task(
            binop_equal(BinaryKind::LShr, 0x1234, 8, 0x7f),
            vec![Candidate::new(0, 2)],
        );
        let (result, output) = solve(&I2sSolver::new(), &t, &0x1234_u16.to_le_bytes());
        assert_eq!(result, SolverResult::Sat);
        assert_eq!(output, 0x7f00_u16.to_le_bytes());

        let solver = I2sSolver::with_config(I2sConfig::builder().binop_inversion(false).build());
        let (result, _) = solve(&solver, &t, &0x1234_u16.to_le_bytes());
        assert_eq!(result, SolverResult::Timeout);
    }

    #[test]
    fn unsupported_shift_direction() {
        // (1 << s0) == 64, recorded with s0 == 3: shifting by the unknown is not inverted
        let c = Constraint::new(
            AstNode::relational(
                RelationalKind::Equal,
                AstNode::binary(BinaryKind::Shl, AstNode::constant(1), AstNode::symbol(0)),
                AstNode::constant(2),
            ),
            8,
            64,
            vec![
                Argument::symbolic(0),
                Argument::constant(1),
                Argument::constant(64),
            ],
        )
        .unwrap();
        let t = task(c, vec![Candidate::new(0, 1)]);
        let (result, output) = solve(&I2sSolver::new(), &t, &[3]);
        assert_eq!(result, SolverResult::Timeout);
        assert!(output.is_empty());
    }

    #[test]
    fn numeral_growth() {
        let input = b"abcd9xyz".to_vec();
        let c = scalar(RelationalKind::Equal, 9, 100).with_numeral(
            4,
            NumeralInfo {
                base: 10,
                length: 1,
            },
        );
        let t = task(c, vec![Candidate::new(4, 1)]);
        let (result, output) = solve(&I2sSolver::new(), &t, &input);
        assert_eq!(result, SolverResult::Sat);
        assert_eq!(output.len(), input.len() + 2);
        assert_eq!(output, b"abcd100xyz");
    }

    #[test]
    fn numeral_shrink_and_sign() {
        let input = b"x=-1234;".to_vec();
        let c = scalar(RelationalKind::Slt, -1234_i64 as u64, 0).with_numeral(
            2,
            NumeralInfo {
                base: 10,
                length: 5,
            },
        );
        let t = task(c, vec![Candidate::new(2, 4)]);
        let (result, output) = solve(&I2sSolver::new(), &t, &input);
        assert_eq!(result, SolverResult::Sat);
        // lhs of slt: 0 + 1
        assert_eq!(output, b"x=1;");
    }

    #[test]
    fn numeral_hex() {
        let input = b"len=ff\n".to_vec();
        let c = scalar(RelationalKind::Uge, 0xff, 0x1000).with_numeral(
            4,
            NumeralInfo {
                base: 16,
                length: 2,
            },
        );
        let t = task(c, vec![Candidate::new(4, 2)]);
        let (result, output) = solve(&I2sSolver::new(), &t, &input);
        assert_eq!(result, SolverResult::Sat);
        assert_eq!(output, b"len=1000\n");
    }

    #[test]
    fn numeral_binary() {
        let input = b"x=101;".to_vec();
        let c = scalar(RelationalKind::Equal, 5, 8).with_numeral(
            2,
            NumeralInfo {
                base: 2,
                length: 3,
            },
        );
        let t = task(c, vec![Candidate::new(2, 3)]);
        let (result, output) = solve(&I2sSolver::new(), &t, &input);
        assert_eq!(result, SolverResult::Sat);
        assert_eq!(output, b"x=1000;");
    }

    #[test]
    fn numeral_octal() {
        // 0755 ult 0o1000: the lhs becomes 0o1000 + 1
        let input = b"mode=0755 ".to_vec();
        let c = scalar(RelationalKind::Ult, 0o755, 0o1000).with_numeral(
            5,
            NumeralInfo {
                base: 8,
                length: 4,
            },
        );
        let t = task(c, vec![Candidate::new(5, 4)]);
        let (result, output) = solve(&I2sSolver::new(), &t, &input);
        assert_eq!(result, SolverResult::Sat);
        assert_eq!(output, b"mode=1001 ");
    }

    #[test]
    fn unsupported_base_skips_candidate() {
        let mut input = b"zz".to_vec();
        input.extend_from_slice(&7_u32.to_le_bytes());
        let c = scalar(RelationalKind::Equal, 7, 9).with_numeral(
            0,
            NumeralInfo {
                base: 36,
                length: 2,
            },
        );
        let t = task(c.clone(), vec![Candidate::new(0, 2)]);
        let (result, output) = solve(&I2sSolver::new(), &t, &input);
        assert_eq!(result, SolverResult::Timeout);
        assert!(output.is_empty());

        // the next candidate still gets its turn
        let t = task(c, vec![Candidate::new(0, 2), Candidate::new(2, 4)]);
        let (result, output) = solve(&I2sSolver::new(), &t, &input);
        assert_eq!(result, SolverResult::Sat);
        assert_eq!(word_at(&output, 2), 9);
    }

    #[test]
    fn hostile_numeral_length() {
        let input = b"12".to_vec();
        let c = scalar(RelationalKind::Equal, 12, 13).with_numeral(
            1,
            NumeralInfo {
                base: 10,
                length: usize::MAX,
            },
        );
        let t = task(c, vec![Candidate::new(1, 1)]);
        let (result, _) = solve(&I2sSolver::new(), &t, &input);
        assert_eq!(result, SolverResult::Timeout);

        let c = scalar(RelationalKind::Equal, 12, 13).with_numeral(
            0,
            NumeralInfo {
                base: 10,
                length: 3,
            },
        );
        let t = task(c, vec![Candidate::new(0, 1)]);
        let (result, _) = solve(&I2sSolver::new(), &t, &input);
        assert_eq!(result, SolverResult::Timeout);
    }

    #[test]
    fn string_compare_synthesis() {
        let c = Constraint::new(
            AstNode::string_compare(AstNode::symbol(0), AstNode::constant(1)),
            1,
            0,
            vec![Argument::symbolic(0), Argument::constant(0x6867_6665_6463_6261)],
        )
        .unwrap()
        .with_region_size(8);
        let input = b"..XXXXXXXX..".to_vec();
        let t = task(c, vec![Candidate::new(2, 8)]);
        let (result, output) = solve(&I2sSolver::new(), &t, &input);
        assert_eq!(result, SolverResult::Sat);
        assert_eq!(output, b"..abcdefgh..");
    }

    #[test]
    fn string_compare_multiple_chunks() {
        let c = Constraint::new(
            AstNode::string_compare(AstNode::symbol(0), AstNode::constant(1)),
            1,
            0,
            vec![
                Argument::symbolic(0),
                Argument::constant(u64::from_le_bytes(*b"GET /ind")),
                Argument::constant(u64::from_le_bytes(*b"ex.html\0")),
            ],
        )
        .unwrap()
        .with_region_size(11);
        let input = vec![b'?'; 16];
        let t = task(c, vec![Candidate::new(0, 11)]);
        let (result, output) = solve(&I2sSolver::new(), &t, &input);
        assert_eq!(result, SolverResult::Sat);
        assert_eq!(&output[..11], b"GET /index.");
        assert_eq!(&output[11..], b"?????");
    }

    #[test]
    fn string_compare_without_constants() {
        let c = Constraint::new(
            AstNode::string_compare(AstNode::symbol(0), AstNode::symbol(1)),
            1,
            0,
            vec![Argument::symbolic(0), Argument::symbolic(1)],
        )
        .unwrap()
        .with_region_size(4);
        let t = task(c, vec![Candidate::new(1, 4)]);
        let (result, output) = solve(&I2sSolver::new(), &t, b"xabcdx");
        assert_eq!(result, SolverResult::Sat);
        assert_eq!(output, b"xabcdx");
    }

    #[test]
    fn string_compare_declines() {
        let constants = Constraint::new(
            AstNode::string_compare(AstNode::constant(0), AstNode::constant(1)),
            1,
            0,
            vec![Argument::constant(1), Argument::constant(2)],
        )
        .unwrap()
        .with_region_size(8);
        let input = vec![0; 16];
        let solver = I2sSolver::new();
        let t = task(constants, vec![Candidate::new(0, 8)]);
        assert_eq!(solve(&solver, &t, &input).0, SolverResult::Timeout);

        let symbolic = Constraint::new(
            AstNode::string_compare(AstNode::symbol(0), AstNode::constant(1)),
            1,
            0,
            vec![Argument::symbolic(0), Argument::constant(2)],
        )
        .unwrap()
        .with_region_size(8);
        // region beyond the input
        let t = task(symbolic.clone(), vec![Candidate::new(12, 8)]);
        assert_eq!(solve(&solver, &t, &input).0, SolverResult::Timeout);
        // length differs from the region
        let t = task(symbolic.clone(), vec![Candidate::new(0, 4)]);
        assert_eq!(solve(&solver, &t, &input).0, SolverResult::Timeout);
        // more than one candidate
        let t = task(symbolic, vec![Candidate::new(0, 8), Candidate::new(8, 8)]);
        assert_eq!(solve(&solver, &t, &input).0, SolverResult::Timeout);
        assert_eq!(solver.stats().failed(), 4);
    }

    #[test]
    fn no_match_exhaustion() {
        let input = [1_u8, 2, 3, 4, 5, 6, 7, 8];
        let t = task(
            scalar(RelationalKind::Equal, 0xdead, 0xbeef),
            vec![
                Candidate::new(0, 2),
                Candidate::new(2, 4),
                Candidate::new(0, 9),
                Candidate::new(6, 4),
                Candidate::new(usize::MAX, 2),
            ],
        );
        let solver = I2sSolver::new();
        let mut output = b"untouched".to_vec();
        assert_eq!(solver.solve(&t, &input, &mut output), SolverResult::Timeout);
        assert_eq!(output, b"untouched");
        assert_eq!((solver.stats().solved(), solver.stats().failed()), (0, 1));
    }

    #[test]
    fn multi_constraint_tasks_are_delegated() {
        let c = Arc::new(scalar(RelationalKind::Equal, 1, 2));
        let comparison = ComparisonKind::Relational(RelationalKind::Equal);
        let mut t = SearchTask::new(c.clone(), vec![Candidate::new(0, 1)], comparison).unwrap();
        t.push(c, vec![Candidate::new(0, 1)], comparison).unwrap();
        let solver = I2sSolver::new();
        assert_eq!(solve(&solver, &t, &[1]).0, SolverResult::Timeout);
        assert_eq!((solver.stats().solved(), solver.stats().failed()), (0, 0));
    }

    #[test]
    fn negated_comparison_on_shared_constraint() {
        let c = Arc::new(scalar(RelationalKind::Equal, 0x41, 0x42));
        let t = SearchTask::new(
            c,
            vec![Candidate::new(0, 1)],
            ComparisonKind::Relational(RelationalKind::Distinct),
        )
        .unwrap();
        let (result, output) = solve(&I2sSolver::new(), &t, b"A");
        assert_eq!(result, SolverResult::Sat);
        assert_eq!(output, b"A");
    }

    #[test]
    fn concurrent_callers_share_stats() {
        let solver = I2sSolver::new();
        let hit = task(scalar(RelationalKind::Equal, 1, 2), vec![Candidate::new(0, 1)]);
        let miss = task(scalar(RelationalKind::Equal, 7, 8), vec![Candidate::new(0, 1)]);
        thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..100 {
                        let mut output = vec![];
                        assert_eq!(solver.solve(&hit, &[1], &mut output), SolverResult::Sat);
                        assert_eq!(output, [2]);
                        assert_eq!(solver.solve(&miss, &[1], &mut output), SolverResult::Timeout);
                    }
                });
            }
        });
        assert_eq!(solver.stats().solved(), 400);
        assert_eq!(solver.stats().failed(), 400);
    }
}
