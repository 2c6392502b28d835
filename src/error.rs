use std::{fmt::Display, sync::PoisonError};

use bincode::ErrorKind;

/// Custom Result type for TableSQL operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for TableSQL
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Lexical or literal error
    Parse(String),
    /// Statement text outside the supported grammar (never retried, never falls back)
    Unsupported(String),
    /// SELECT text outside the direct grammar, answered by the fallback engine
    FallbackRequired(String),
    /// Conditional update/delete target does not exist
    RowNotFound(String),
    /// Failure reported by the store adapter, passed through untouched
    Store(String),
    /// Internal error (serialization, embedded engine, etc.)
    Internal(String),
}

impl From<std::num::ParseIntError> for Error {
    fn from(value: std::num::ParseIntError) -> Self {
        Error::Parse(value.to_string())
    }
}

impl From<std::num::ParseFloatError> for Error {
    fn from(value: std::num::ParseFloatError) -> Self {
        Error::Parse(value.to_string())
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(value: PoisonError<T>) -> Self {
        Error::Internal(value.to_string())
    }
}

impl From<Box<ErrorKind>> for Error {
    fn from(value: Box<ErrorKind>) -> Self {
        Error::Internal(value.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Internal(value.to_string())
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        Error::Internal(format!("fallback engine: {}", value))
    }
}

impl std::error::Error for Error {}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Parse(err) => write!(f, "parse error {}", err),
            Error::Unsupported(sql) => write!(f, "unsupported statement {}", sql),
            Error::FallbackRequired(sql) => write!(f, "statement requires fallback {}", sql),
            Error::RowNotFound(key) => write!(f, "row not found {}", key),
            Error::Store(err) => write!(f, "store error {}", err),
            Error::Internal(err) => write!(f, "internal error {}", err),
        }
    }
}
