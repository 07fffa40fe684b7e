//! # TempoDB Model
//!
//! Shared valid-time data model for TempoDB.
//!
//! This crate provides:
//! - Boundary scalars and half-open intervals with Allen-relation algebra
//! - Era configuration (which columns form the valid-time dimension)
//! - Payload maps with null-stripping, patching and ephemeral-aware equality
//! - Source and target row representations used by the merge engine

pub mod era;
pub mod error;
pub mod interval;
pub mod payload;
pub mod row;
pub mod schema;
pub mod value;

pub use era::Era;
pub use error::{ModelError, ModelResult};
pub use interval::{AllenRelation, Interval};
pub use payload::Payload;
pub use row::{EntityKey, SourceRow, SourceRowId, TargetRow, TargetRowId};
pub use schema::TableSchema;
pub use value::{Boundary, TimePoint};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
