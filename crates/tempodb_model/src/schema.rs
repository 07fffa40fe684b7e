//! Target table schema metadata.

use crate::era::Era;
use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};

/// Structural description of a temporal target table.
///
/// The merge engine holds no global catalog state; callers inject this
/// value into each call. The schema is hashable, which is what the planner
/// cache keys on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name (diagnostics only).
    pub name: String,
    /// Payload data columns, boundary and identity columns excluded.
    pub data_columns: Vec<String>,
    /// Surrogate identity columns (stable primary key of the entity).
    pub identity_columns: Vec<String>,
    /// Natural-key columns used to match source rows lacking a surrogate.
    pub natural_key_columns: Vec<String>,
    /// Data columns declared NOT NULL on the target.
    pub required_columns: Vec<String>,
    /// The valid-time dimension.
    pub era: Era,
}

impl TableSchema {
    /// Creates a schema with the given name and data columns.
    #[must_use]
    pub fn new(name: impl Into<String>, data_columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            data_columns,
            identity_columns: Vec::new(),
            natural_key_columns: Vec::new(),
            required_columns: Vec::new(),
            era: Era::default(),
        }
    }

    /// Sets the surrogate identity columns.
    #[must_use]
    pub fn identity_columns(mut self, columns: Vec<String>) -> Self {
        self.identity_columns = columns;
        self
    }

    /// Sets the natural-key columns.
    #[must_use]
    pub fn natural_key_columns(mut self, columns: Vec<String>) -> Self {
        self.natural_key_columns = columns;
        self
    }

    /// Sets the NOT NULL data columns.
    #[must_use]
    pub fn required_columns(mut self, columns: Vec<String>) -> Self {
        self.required_columns = columns;
        self
    }

    /// Sets the era.
    #[must_use]
    pub fn era(mut self, era: Era) -> Self {
        self.era = era;
        self
    }

    /// Checks internal consistency of the declaration.
    ///
    /// Required and ephemeral columns must be data columns; an entity must
    /// be addressable by at least one of identity or natural key.
    pub fn validate(&self) -> ModelResult<()> {
        for col in &self.required_columns {
            if !self.data_columns.contains(col) {
                return Err(ModelError::invalid_schema(format!(
                    "required column {col} is not a data column"
                )));
            }
        }
        for col in &self.era.ephemeral_columns {
            if !self.data_columns.contains(col) {
                return Err(ModelError::invalid_schema(format!(
                    "ephemeral column {col} is not a data column"
                )));
            }
        }
        if self.identity_columns.is_empty() && self.natural_key_columns.is_empty() {
            return Err(ModelError::invalid_schema(
                "schema declares neither identity nor natural-key columns",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn valid_schema() {
        let schema = TableSchema::new("positions", cols(&["title", "rate"]))
            .identity_columns(cols(&["id"]))
            .required_columns(cols(&["title"]));
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn rejects_stray_required_column() {
        let schema = TableSchema::new("positions", cols(&["title"]))
            .identity_columns(cols(&["id"]))
            .required_columns(cols(&["rate"]));
        assert!(schema.validate().is_err());
    }

    #[test]
    fn rejects_unaddressable_entities() {
        let schema = TableSchema::new("positions", cols(&["title"]));
        assert!(schema.validate().is_err());
    }
}
