//! Error types for the merge engine.
//!
//! Only fatal conditions surface as `EngineError`: malformed input shapes,
//! corrupt target history and execution-time constraint failures. Per-row
//! ("attributable") problems never abort a call; they are reported through
//! [`crate::feedback::Feedback`] instead.

use tempodb_model::{ModelError, TargetRowId};
use tempodb_store::StoreError;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Fatal errors aborting a whole merge call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Input-shape error raised before planning.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// The target history itself violates a model invariant.
    #[error("corrupt target row {row_id}: {message}")]
    CorruptTarget {
        /// The offending target row.
        row_id: TargetRowId,
        /// Description of the problem.
        message: String,
    },

    /// The merge configuration is unusable for the given schema.
    #[error("invalid merge configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },

    /// A plan operation is internally inconsistent (e.g. an update without
    /// a target row).
    #[error("malformed plan: {message}")]
    InvalidPlan {
        /// Description of the problem.
        message: String,
    },

    /// Execution-time constraint failure; the transaction was rolled back.
    #[error("execution aborted, no rows committed: {0}")]
    Execution(#[from] StoreError),
}

impl EngineError {
    /// Creates a corrupt target error.
    pub fn corrupt_target(row_id: TargetRowId, message: impl Into<String>) -> Self {
        Self::CorruptTarget {
            row_id,
            message: message.into(),
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Creates a malformed plan error.
    pub fn invalid_plan(message: impl Into<String>) -> Self {
        Self::InvalidPlan {
            message: message.into(),
        }
    }
}
