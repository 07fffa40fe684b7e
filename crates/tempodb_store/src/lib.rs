//! # TempoDB Store
//!
//! In-memory temporal table standing in for the host database.
//!
//! The table enforces the constraints the merge engine plans around:
//! - per-entity interval non-overlap, checked immediately on every mutation
//! - NOT NULL data columns
//!
//! Mutations run inside snapshot-undo transactions; an aborted transaction
//! restores the pre-transaction row set, so a failed merge commits nothing.

pub mod error;
pub mod table;
pub mod transaction;

pub use error::{StoreError, StoreResult};
pub use table::TemporalTable;

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
