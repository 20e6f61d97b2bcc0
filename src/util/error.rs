//! Error types for the handle layer.

use thiserror::Error;

use crate::engine::EngineError;
use crate::handle::ObjectKind;

/// Main error type for handle, selection and container operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A create/open/commit capability failed to produce a live identifier
    #[error("Failed to acquire {what}: {source}")]
    Acquisition {
        what: String,
        #[source]
        source: EngineError,
    },

    /// Releasing a reference failed (the handle is unset regardless)
    #[error("Failed to release {kind} handle: {source}")]
    Release {
        kind: ObjectKind,
        #[source]
        source: EngineError,
    },

    /// Validity, kind or reference-count query failed
    #[error("Query `{what}` failed: {source}")]
    Query {
        what: &'static str,
        #[source]
        source: EngineError,
    },

    /// Rank or extent query on a dataspace failed
    #[error("Shape query failed: {0}")]
    ShapeQuery(#[source] EngineError),

    /// Selection does not fit the parent dataspace
    #[error("Invalid selection: {reason}")]
    InvalidSelection {
        reason: String,
        #[source]
        source: Option<EngineError>,
    },

    /// Read or write failed
    #[error("Transfer failed: {reason}")]
    Transfer {
        reason: String,
        #[source]
        source: Option<EngineError>,
    },

    /// Handle refers to a resource of a different kind or class
    #[error("Kind mismatch: expected {expected}, got {actual}")]
    KindMismatch { expected: String, actual: String },

    /// Operation needs a live handle but the handle is unset
    #[error("Handle is not set ({0})")]
    NotSet(&'static str),
}

impl Error {
    /// Create a locally detected selection error.
    pub fn selection(reason: impl Into<String>) -> Self {
        Self::InvalidSelection { reason: reason.into(), source: None }
    }

    /// Create a selection error reported by the engine.
    pub fn selection_rejected(reason: impl Into<String>, source: EngineError) -> Self {
        Self::InvalidSelection { reason: reason.into(), source: Some(source) }
    }

    /// Create a transfer error reported by the engine.
    pub fn transfer(reason: impl Into<String>, source: EngineError) -> Self {
        Self::Transfer { reason: reason.into(), source: Some(source) }
    }

    /// Create an acquisition error.
    pub fn acquisition(what: impl Into<String>, source: EngineError) -> Self {
        Self::Acquisition { what: what.into(), source }
    }

    /// Create a query error.
    pub fn query(what: &'static str, source: EngineError) -> Self {
        Self::Query { what, source }
    }
}

/// Result type alias for handle operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ObjectId;

    #[test]
    fn test_error_display() {
        let e = Error::selection("start + extent exceeds dimension 0 (11 > 10)");
        assert!(e.to_string().contains("11 > 10"));

        let e = Error::Release {
            kind: ObjectKind::Dataspace,
            source: EngineError::InvalidId(ObjectId::new(7).unwrap()),
        };
        assert!(e.to_string().contains("DATASPACE"));
        assert!(e.to_string().contains("7"));
    }

    #[test]
    fn test_error_source_chain() {
        use std::error::Error as _;

        let e = Error::transfer("write", EngineError::ReadOnly);
        assert!(e.source().is_some());

        let e = Error::selection("rank mismatch");
        assert!(e.source().is_none());
    }
}
