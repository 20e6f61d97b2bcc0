//! Errors reported by storage engines.

use std::path::PathBuf;
use thiserror::Error;

use super::ObjectId;
use crate::handle::ObjectKind;

/// Failure reported by an [`Engine`](super::Engine) capability.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Identifier is not live
    #[error("Invalid object id: {0}")]
    InvalidId(ObjectId),

    /// Identifier refers to a resource of another kind
    #[error("Object {id} is a {actual}, expected {expected}")]
    WrongKind {
        id: ObjectId,
        expected: ObjectKind,
        actual: ObjectKind,
    },

    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File already exists and exclusive creation was requested
    #[error("File already exists: {0}")]
    FileExists(PathBuf),

    /// Link not found by name or path
    #[error("Link not found: {0}")]
    LinkNotFound(String),

    /// A link with that name already exists
    #[error("Link already exists: {0}")]
    LinkExists(String),

    /// File was opened read-only
    #[error("File is read-only")]
    ReadOnly,

    /// Argument rejected by the engine
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid magic bytes at start of file
    #[error("Invalid container file: bad magic bytes")]
    InvalidMagic,

    /// Unsupported container format version
    #[error("Unsupported container version: {0}")]
    UnsupportedVersion(u16),

    /// File is truncated or corrupted
    #[error("Unexpected end of file at position {0}")]
    UnexpectedEof(u64),

    /// Invalid data structure in file
    #[error("Invalid file structure: {0}")]
    InvalidStructure(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl EngineError {
    /// Create an invalid argument error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an invalid structure error.
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }
}

/// Result type alias for engine capabilities.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
