use serde::{de, ser};
use std::fmt;
use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// A record member whose declared type maps to no wire category.
///
/// Raised while a record type is classified, before any byte of that record
/// reaches a sink.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("member `{record}.{member}` has unsupported type `{type_name}`")]
pub struct UnsupportedType {
    pub record: &'static str,
    pub member: &'static str,
    pub type_name: &'static str,
}

/// Errors that can occur while compiling, serializing or deserializing a record.
#[derive(Error, Debug)]
pub enum Error {
    /// A member's declared type matches no wire category
    #[error("unsupported type: {0}")]
    UnsupportedType(#[from] UnsupportedType),

    /// The stream ended before a fixed-width or length-prefixed read completed
    #[error("truncated stream: {needed} more bytes required")]
    TruncatedStream { needed: usize },

    /// A length, count or flag prefix holds a value the context does not allow
    #[error("malformed {context}: {found}")]
    MalformedLength { context: &'static str, found: i64 },

    /// A length prefix exceeds the configured maximum
    #[error("{context} {found} exceeds maximum {max}")]
    LengthExceeded {
        context: &'static str,
        found: usize,
        max: usize,
    },

    /// A fixed-width value is outside the domain of its type
    #[error("invalid {context}: {found}")]
    InvalidValue { context: &'static str, found: i64 },

    /// A string payload is not valid UTF-8
    #[error("string contains invalid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The serde walk of a record disagrees with its member descriptors
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A custom error message from serde
    #[error("{0}")]
    Message(String),

    /// The underlying stream failed
    #[error("stream I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn mismatch(expected: impl fmt::Display, found: impl fmt::Display) -> Self {
        Error::SchemaMismatch(format!("expected {}, found {}", expected, found))
    }
}

impl ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Message(msg.to_string())
    }
}
