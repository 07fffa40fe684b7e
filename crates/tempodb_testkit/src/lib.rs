//! # TempoDB Testkit
//!
//! Test utilities for TempoDB.
//!
//! This crate provides:
//! - Table fixtures and batch-building helpers
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tempodb_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_table() {
//!     let mut t = TestTable::positions();
//!     t.seed("e1", 0, 10, serde_json::json!({"title": "A"}));
//!     // ... merge batches against t
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
