//! Error types for reference brokering

use thiserror::Error;

use crate::registry::Handle;

/// Main error type for broker operations.
///
/// Releasing a handle never produces one of these: release of an unknown
/// handle is defined as success.
#[derive(Error, Debug)]
pub enum BrokerError {
    /// No live object is tracked under this handle in the resolving context.
    ///
    /// Covers forged handles, handles issued by another context, and handles
    /// that were already released.
    #[error("There is no tracked object with id '{handle}'. Perhaps the reference was already disposed.")]
    NotFound {
        /// The handle that failed to resolve
        handle: Handle,
    },

    /// A wrapper was used in a way its lifecycle does not allow
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The wire shape of a reference envelope is wrong
    #[error("Malformed reference envelope: expected {expected}, found {found}")]
    MalformedEnvelope {
        /// What the decoder was looking for
        expected: String,
        /// What it observed instead
        found: String,
    },

    /// The marker property was never seen, or carried the reserved handle 0
    #[error("Required property {key} not found")]
    MissingProperty {
        /// The marker key that was required
        key: String,
    },

    /// The tracked object is not of the requested type
    #[error("Object with id '{handle}' is not a {expected}")]
    TypeMismatch {
        /// The handle that resolved
        handle: Handle,
        /// Name of the requested type
        expected: &'static str,
    },

    /// Any other serializer failure (syntax, numeric range, I/O)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The external transport reported a failure
    #[error("Transport error: {0}")]
    Transport(String),
}

impl BrokerError {
    /// Build a [`BrokerError::MalformedEnvelope`].
    pub fn malformed(expected: impl Into<String>, found: impl Into<String>) -> Self {
        BrokerError::MalformedEnvelope {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Whether this is a [`BrokerError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, BrokerError::NotFound { .. })
    }
}

/// Result type alias for broker operations
pub type Result<T> = std::result::Result<T, BrokerError>;
