/*!
`taintflip` is the input-to-state stage of a hybrid fuzzer.

A traced run records branch comparisons as [`constraint::Constraint`]s, together with the input bytes that influenced
their operands. The [`solvers::I2sSolver`] flips such a comparison by patching those bytes directly, without a
theorem prover. Tasks it cannot handle are passed on along a [`solvers::SolversTuple`].
*/
#![warn(clippy::cargo)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(
    clippy::unreadable_literal,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]
#![cfg_attr(not(test), warn(
    missing_debug_implementations,
    missing_docs,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
))]
#![cfg_attr(test, deny(
    missing_debug_implementations,
    missing_docs,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_must_use,
))]

pub mod ast;
pub mod constraint;
pub mod numeral;
pub mod serialization_format;
pub mod solvers;
pub mod task;

pub use taintflip_bolts::{Error, Named};
