//! Era configuration: which columns form the valid-time dimension.

use serde::{Deserialize, Serialize};

/// A named valid-time dimension on a table.
///
/// An era names the boundary columns holding the half-open `[from, until)`
/// interval and the ephemeral payload columns excluded from coalescing
/// equality (audit timestamps, edit counters and the like).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Era {
    /// Name of the era (tables may carry several valid-time dimensions).
    pub name: String,
    /// Column holding the inclusive lower bound.
    pub valid_from_column: String,
    /// Column holding the exclusive upper bound.
    pub valid_until_column: String,
    /// Payload columns ignored by coalescing equality.
    pub ephemeral_columns: Vec<String>,
}

impl Era {
    /// Creates an era with the conventional `valid_from`/`valid_until`
    /// boundary columns and no ephemeral columns.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            valid_from_column: "valid_from".to_string(),
            valid_until_column: "valid_until".to_string(),
            ephemeral_columns: Vec::new(),
        }
    }

    /// Sets the boundary column names.
    #[must_use]
    pub fn boundary_columns(
        mut self,
        from: impl Into<String>,
        until: impl Into<String>,
    ) -> Self {
        self.valid_from_column = from.into();
        self.valid_until_column = until.into();
        self
    }

    /// Sets the ephemeral columns.
    #[must_use]
    pub fn ephemeral_columns(mut self, columns: Vec<String>) -> Self {
        self.ephemeral_columns = columns;
        self
    }
}

impl Default for Era {
    fn default() -> Self {
        Self::new("valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_era() {
        let era = Era::default();
        assert_eq!(era.name, "valid");
        assert_eq!(era.valid_from_column, "valid_from");
        assert_eq!(era.valid_until_column, "valid_until");
        assert!(era.ephemeral_columns.is_empty());
    }

    #[test]
    fn builder() {
        let era = Era::new("fiscal")
            .boundary_columns("fy_start", "fy_end")
            .ephemeral_columns(vec!["edited_at".to_string()]);
        assert_eq!(era.valid_from_column, "fy_start");
        assert_eq!(era.ephemeral_columns, vec!["edited_at".to_string()]);
    }
}
