//! Error kinds for the RF replay core.
//!
//! Every operation in this crate either succeeds or returns one of these
//! variants; nothing in the parser or device layers panics on bad input or
//! hardware failure. `DuplicateAlias` is the sole fatal condition (it can
//! only occur during [`crate::modulation::ModulationRegistry::new`] at
//! process start); every other variant is recoverable and is meant to be
//! surfaced to a caller as a disabled control plus a status message.

use std::path::PathBuf;

use thiserror::Error;

/// The closed set of error kinds produced by this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// An unexpected token or shape was found while parsing a dataset file.
    #[error("input format error in {path:?}: {reason}")]
    InputFormat {
        /// The file that failed to parse, when known.
        path: Option<PathBuf>,
        /// A human-readable description of what was wrong.
        reason: String,
    },

    /// An allocation needed to hold parsed data could not be satisfied.
    #[error("resource exhausted: failed to allocate {bytes} bytes ({reason})")]
    ResourceExhausted {
        /// The number of bytes that allocation was attempted for.
        bytes: usize,
        /// A human-readable description of what was being allocated.
        reason: String,
    },

    /// A required PHY, streaming sub-device, or channel was not present in
    /// the opened transport context.
    #[error("device missing: {0}")]
    DeviceMissing(String),

    /// An attribute read or write failed at the transport layer.
    #[error("attribute I/O failed for '{attribute}': {reason}")]
    AttributeIo {
        /// The attribute name that failed.
        attribute: String,
        /// A human-readable description of the transport failure.
        reason: String,
    },

    /// A setter argument lay outside the cached range for that attribute.
    /// No hardware call was attempted.
    #[error("value {value} for '{attribute}' is outside the valid range {min}..={max}")]
    OutOfRange {
        /// The attribute the caller tried to set.
        attribute: String,
        /// The rejected value, formatted for display.
        value: String,
        /// The lower bound of the valid range, formatted for display.
        min: String,
        /// The upper bound of the valid range, formatted for display.
        max: String,
    },

    /// The modulation alias table is inconsistent: two distinct
    /// `ModulationName`s share an alias string. Fatal at process init.
    #[error("duplicate modulation alias '{alias}' claimed by both {first:?} and {second:?}")]
    DuplicateAlias {
        /// The alias string that appeared twice.
        alias: String,
        /// The first modulation name found to claim it.
        first: String,
        /// The second modulation name found to claim it.
        second: String,
    },
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Builds an [`Error::InputFormat`] with no associated path.
    pub fn input_format(reason: impl Into<String>) -> Self {
        Self::InputFormat {
            path: None,
            reason: reason.into(),
        }
    }

    /// Builds an [`Error::InputFormat`] with an associated path.
    pub fn input_format_at(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InputFormat {
            path: Some(path.into()),
            reason: reason.into(),
        }
    }
}
