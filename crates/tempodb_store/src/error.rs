//! Error types for the TempoDB store.

use tempodb_model::{ModelError, TargetRowId};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Model-level validation error.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Two rows of one entity would overlap in valid time.
    #[error("overlap constraint violated for entity {entity}: {first} overlaps {second}")]
    OverlapViolation {
        /// Canonical key of the entity.
        entity: String,
        /// Rendered interval of the existing row.
        first: String,
        /// Rendered interval of the offending row.
        second: String,
    },

    /// A NOT NULL column is missing or null.
    #[error("required column {column} is missing or null")]
    RequiredColumn {
        /// Name of the column.
        column: String,
    },

    /// A row id does not exist.
    #[error("row not found: {row_id}")]
    RowNotFound {
        /// The missing row id.
        row_id: TargetRowId,
    },

    /// A row carries no usable identity.
    #[error("row has no identity: {message}")]
    MissingIdentity {
        /// Description of the problem.
        message: String,
    },
}

impl StoreError {
    /// Creates a required column error.
    pub fn required_column(column: impl Into<String>) -> Self {
        Self::RequiredColumn {
            column: column.into(),
        }
    }

    /// Creates a missing identity error.
    pub fn missing_identity(message: impl Into<String>) -> Self {
        Self::MissingIdentity {
            message: message.into(),
        }
    }
}
