//! Error types for zone-warden

use thiserror::Error;

/// Result type alias for zone-warden operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during enrollment and alarm handling
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (invalid options, unobtainable hub identity)
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport error (attribute write/read or command delivery failed)
    #[error("transport error: {0}")]
    Transport(String),

    /// Verification error (zone state read-back did not confirm enrollment)
    #[error("verification error: {0}")]
    Verification(String),

    /// An operation exceeded its overall deadline
    #[error("operation {operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// Name of the timed-out operation
        operation: String,
        /// Deadline that was exceeded, in milliseconds
        timeout_ms: u64,
    },

    /// Every strategy for an operation failed
    #[error("{operation}: all {} strategies failed", causes.len())]
    AllStrategiesFailed {
        /// Name of the failed operation
        operation: String,
        /// Per-strategy failure causes, in attempt order
        causes: Vec<(&'static str, Error)>,
    },
}

impl Error {
    /// Per-strategy causes if this is an [`Error::AllStrategiesFailed`]
    #[must_use]
    pub fn strategy_causes(&self) -> &[(&'static str, Error)] {
        match self {
            Self::AllStrategiesFailed { causes, .. } => causes,
            _ => &[],
        }
    }
}
