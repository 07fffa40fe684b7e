//! # TempoDB Engine
//!
//! Set-based merge planning and execution for valid-time tables.
//!
//! A merge call takes a batch of source rows, each carrying a half-open
//! `[valid_from, valid_until)` interval, and reconciles it with the
//! target's existing history in stages: identity resolution, timeline
//! segmentation, payload resolution, coalescing, diffing, sequencing and
//! transactional execution. The output is an inspectable [`MergePlan`] and
//! one [`Feedback`] row per source row.
//!
//! Planning is pure; only [`merge`] mutates the table, and it does so in a
//! single all-or-nothing transaction. Plan shapes are memoized in a
//! process-wide [`PlannerCache`].

pub mod cache;
pub mod config;
pub mod error;
pub mod feedback;
pub mod merge;
pub mod mode;
pub mod plan;

mod coalesce;
mod diff;
mod executor;
mod identity;
mod resolve;
mod sequence;
mod timeline;

pub use cache::{CompiledMerge, PlannerCache};
pub use config::{EclipsePolicy, ExtensionPolicy, MergeConfig};
pub use error::{EngineError, EngineResult};
pub use feedback::{Feedback, FeedbackStatus, SkipReason};
pub use merge::{merge, plan, MergeResult};
pub use mode::{DeleteMode, MergeMode};
pub use plan::{MergePlan, OpKind, PlanOp, PlanSummary, UpdateEffect};

/// Crate version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
