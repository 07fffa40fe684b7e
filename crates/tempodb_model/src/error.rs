//! Error types for the TempoDB data model.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while constructing or validating model values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A boundary value could not be interpreted.
    #[error("invalid boundary: {message}")]
    InvalidBoundary {
        /// Description of the problem.
        message: String,
    },

    /// An interval was empty or inverted (`from >= until`).
    #[error("empty interval: [{from}, {until})")]
    EmptyInterval {
        /// Rendered lower bound.
        from: String,
        /// Rendered upper bound.
        until: String,
    },

    /// An interval started at the unbounded sentinel.
    #[error("interval lower bound cannot be unbounded")]
    UnboundedFrom,

    /// A required column is missing from a schema or payload.
    #[error("missing column: {name}")]
    MissingColumn {
        /// Name of the missing column.
        name: String,
    },

    /// A column value had an unexpected JSON type.
    #[error("invalid value for column {column}: {message}")]
    InvalidValue {
        /// Column carrying the bad value.
        column: String,
        /// Description of the problem.
        message: String,
    },

    /// A schema declaration was internally inconsistent.
    #[error("invalid schema: {message}")]
    InvalidSchema {
        /// Description of the inconsistency.
        message: String,
    },
}

impl ModelError {
    /// Creates an invalid boundary error.
    pub fn invalid_boundary(message: impl Into<String>) -> Self {
        Self::InvalidBoundary {
            message: message.into(),
        }
    }

    /// Creates a missing column error.
    pub fn missing_column(name: impl Into<String>) -> Self {
        Self::MissingColumn { name: name.into() }
    }

    /// Creates an invalid value error.
    pub fn invalid_value(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message: message.into(),
        }
    }
}
