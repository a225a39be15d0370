/*!
* Welcome to `taintflip_bolts`: the errors, names and compile-time tuples shared by the `taintflip` crates.
*/
#![warn(clippy::cargo)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(
    clippy::unreadable_literal,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
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

pub mod tuples;

use core::{
    fmt::{self, Display, Formatter},
    num::TryFromIntError,
};
use std::io;

/// Gives solvers and other parts of a chain a stable name to report and look them up by.
pub trait Named {
    /// The name of this element
    fn name(&self) -> &str;
}

/// The backtrace stored in every [`Error`]: [`backtrace::Backtrace`] with `errors_backtrace`
#[cfg(feature = "errors_backtrace")]
pub type ErrorBacktrace = backtrace::Backtrace;

/// The backtrace stored in every [`Error`]: nothing, unless `errors_backtrace` is enabled
#[cfg(not(feature = "errors_backtrace"))]
#[derive(Debug, Default)]
pub struct ErrorBacktrace {}

#[cfg(not(feature = "errors_backtrace"))]
impl ErrorBacktrace {
    /// Captures nothing
    #[must_use]
    pub fn new() -> Self {
        Self {}
    }
}

#[cfg(feature = "errors_backtrace")]
fn write_backtrace(f: &mut Formatter, trace: &ErrorBacktrace) -> fmt::Result {
    write!(f, "\nBacktrace: {trace:?}")
}

#[cfg(not(feature = "errors_backtrace"))]
#[allow(clippy::unnecessary_wraps)]
fn write_backtrace(_f: &mut Formatter, _trace: &ErrorBacktrace) -> fmt::Result {
    Ok(())
}

/// Everything that can go wrong in `taintflip`
#[derive(Debug)]
pub enum Error {
    /// A record or task could not be encoded or decoded
    Serialize(String, ErrorBacktrace),
    /// Reading or writing a trace failed
    File(io::Error, ErrorBacktrace),
    /// A list that must hold at least one element was empty
    Empty(String, ErrorBacktrace),
    /// An internal conversion failed that should not have
    IllegalState(String, ErrorBacktrace),
    /// A value handed in by the caller, or read from a trace, breaks a documented contract
    IllegalArgument(String, ErrorBacktrace),
}

impl Error {
    /// A [`Error::Serialize`] with the given message
    #[must_use]
    pub fn serialize<S: Into<String>>(msg: S) -> Self {
        Self::Serialize(msg.into(), ErrorBacktrace::new())
    }

    /// A [`Error::File`] wrapping `err`
    #[must_use]
    pub fn file(err: io::Error) -> Self {
        Self::File(err, ErrorBacktrace::new())
    }

    /// A [`Error::Empty`] naming what was empty
    #[must_use]
    pub fn empty<S: Into<String>>(what: S) -> Self {
        Self::Empty(what.into(), ErrorBacktrace::new())
    }

    /// A [`Error::IllegalState`] with the given message
    #[must_use]
    pub fn illegal_state<S: Into<String>>(msg: S) -> Self {
        Self::IllegalState(msg.into(), ErrorBacktrace::new())
    }

    /// A [`Error::IllegalArgument`] with the given message
    #[must_use]
    pub fn illegal_argument<S: Into<String>>(msg: S) -> Self {
        Self::IllegalArgument(msg.into(), ErrorBacktrace::new())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let trace = match self {
            Self::Serialize(msg, trace) => {
                write!(f, "Error in Serialization: `{msg}`")?;
                trace
            }
            Self::File(err, trace) => {
                write!(f, "File IO failed: {err:?}")?;
                trace
            }
            Self::Empty(what, trace) => {
                write!(f, "No items in {what}")?;
                trace
            }
            Self::IllegalState(msg, trace) => {
                write!(f, "Illegal state: {msg}")?;
                trace
            }
            Self::IllegalArgument(msg, trace) => {
                write!(f, "Illegal argument: {msg}")?;
                trace
            }
        };
        write_backtrace(f, trace)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::File(err, _) => Some(err),
            _ => None,
        }
    }
}

impl From<postcard::Error> for Error {
    fn from(err: postcard::Error) -> Self {
        Self::serialize(format!("{err:?}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::serialize(format!("{err:?}"))
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self::file(err)
    }
}

/// Lengths are `usize` in memory and `u32` on the wire
impl From<TryFromIntError> for Error {
    fn from(err: TryFromIntError) -> Self {
        Self::illegal_state(format!("length does not fit: {err:?}"))
    }
}
