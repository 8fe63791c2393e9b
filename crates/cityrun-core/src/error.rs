//! Error types for the cityrun core.
//!
//! The simulation tick itself is infallible; only loading and validating
//! tuning data can fail.

use std::fmt;

/// Result type for cityrun core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading or validating configuration.
#[derive(Debug)]
pub enum Error {
    /// Reading a configuration file failed.
    Io {
        /// The path that could not be read.
        path: String,
        /// The error message.
        message: String,
    },
    /// Configuration text could not be parsed.
    Parse {
        /// Where the text came from (a path, or a description).
        origin: String,
        /// The error message.
        message: String,
    },
    /// Configuration could not be serialized.
    Serialize {
        /// The error message.
        message: String,
    },
    /// A configuration value is out of range.
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Description of what was invalid.
        detail: String,
    },
}

impl Error {
    pub(crate) fn invalid(field: &'static str, detail: impl Into<String>) -> Self {
        Error::Invalid {
            field,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io { path, message } => write!(f, "failed to read {path}: {message}"),
            Error::Parse { origin, message } => write!(f, "failed to parse {origin}: {message}"),
            Error::Serialize { message } => write!(f, "failed to serialize config: {message}"),
            Error::Invalid { field, detail } => write!(f, "invalid {field}: {detail}"),
        }
    }
}

impl std::error::Error for Error {}
