//! Error types for tagstore
//!
//! This module defines the error taxonomy shared by every layer of the store.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Categories:
//! - `NotFound`: unknown tag, filename absent from the resolved set, or
//!   identifier with no physical slot. Expected in normal use.
//! - `InvalidArgument`: malformed pseudo-path, empty component, filename too long.
//!   Raised before any side effect.
//! - `AlreadyExists`: a slot or filename that must be fresh already exists.
//! - `Integrity`: index records that disagree or fail to parse. Never repaired.
//! - `Io`: physical I/O failure, propagated verbatim without retry.

use std::io;
use thiserror::Error;

/// Result type alias for tagstore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the tag store
#[derive(Debug, Error)]
pub enum Error {
    /// Requested tag, filename or identifier does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller supplied a malformed path, name or argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Target already exists where a fresh one was required
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Index state is inconsistent or a durable record is corrupt
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// I/O error from the underlying storage primitive
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Coarse error category, for callers that branch on kind only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::NotFound`]
    NotFound,
    /// See [`Error::InvalidArgument`]
    InvalidArgument,
    /// See [`Error::AlreadyExists`]
    AlreadyExists,
    /// See [`Error::Integrity`]
    Integrity,
    /// See [`Error::Io`]
    Resource,
}

impl Error {
    /// Build a `NotFound` error
    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }

    /// Build an `InvalidArgument` error
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Error::InvalidArgument(reason.into())
    }

    /// Build an `AlreadyExists` error
    pub fn already_exists(what: impl Into<String>) -> Self {
        Error::AlreadyExists(what.into())
    }

    /// Build an `Integrity` error
    pub fn integrity(reason: impl Into<String>) -> Self {
        Error::Integrity(reason.into())
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::Integrity(_) => ErrorKind::Integrity,
            Error::Io(_) => ErrorKind::Resource,
        }
    }

    /// True for `NotFound`
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
