//! Store-level error types and result alias.
//!
//! The duty-ledger taxonomy (`AssignmentNotFound`, `HallAlreadyServiced`, ...)
//! lives in [`crate::ledger::LedgerError`]; this module covers only the faults
//! a [`crate::store::RecordStore`] implementation can raise.

/// The result type used for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a record store implementation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The record store failed or is unreachable.
    #[error("store unavailable: {message}")]
    Unavailable {
        /// Description of the failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A row could not be encoded or decoded.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// Invalid input was provided (configuration or request parameters).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal error that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates an unavailable error with the given message.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an unavailable error with a source cause.
    #[must_use]
    pub fn unavailable_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Unavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates an internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
