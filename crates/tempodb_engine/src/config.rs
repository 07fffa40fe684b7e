//! Per-call merge configuration.

use crate::mode::{DeleteMode, MergeMode};
use serde::{Deserialize, Serialize};

/// Policy for duplicate coverage within one source batch.
///
/// When two source rows for the same entity fully or partially duplicate
/// coverage, either the later-submitted row silently wins or the conflict
/// is reported as a per-row error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EclipsePolicy {
    /// The later-submitted row wins; the eclipsed row is skipped.
    #[default]
    LatestWins,
    /// Duplicate coverage is an attributable error on the eclipsed row.
    Error,
}

/// Policy for timeline extensions that cannot satisfy required columns.
///
/// Applies when a source interval extends beyond all existing target
/// coverage of an entity and required target-inherited columns are absent
/// from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionPolicy {
    /// The extending portion yields no row (safety over completeness).
    #[default]
    Drop,
    /// The extending portion is an attributable error.
    Error,
}

/// Configuration for one merge call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergeConfig {
    /// How source records reconcile with the target history.
    pub mode: MergeMode,

    /// What happens to target coverage absent from the batch.
    pub delete_mode: DeleteMode,

    /// Policy for intra-batch duplicate coverage.
    pub eclipse_policy: EclipsePolicy,

    /// Policy for under-specified timeline extensions.
    pub extension_policy: ExtensionPolicy,

    /// Whether generated identities are written back into source rows
    /// sharing a founding group.
    pub backfill_identities: bool,
}

impl MergeConfig {
    /// Creates a configuration for the given mode with default policies.
    #[must_use]
    pub fn new(mode: MergeMode) -> Self {
        Self {
            mode,
            delete_mode: DeleteMode::default(),
            eclipse_policy: EclipsePolicy::default(),
            extension_policy: ExtensionPolicy::default(),
            backfill_identities: false,
        }
    }

    /// Sets the delete mode.
    #[must_use]
    pub const fn delete_mode(mut self, delete_mode: DeleteMode) -> Self {
        self.delete_mode = delete_mode;
        self
    }

    /// Sets the eclipse policy.
    #[must_use]
    pub const fn eclipse_policy(mut self, policy: EclipsePolicy) -> Self {
        self.eclipse_policy = policy;
        self
    }

    /// Sets the extension policy.
    #[must_use]
    pub const fn extension_policy(mut self, policy: ExtensionPolicy) -> Self {
        self.extension_policy = policy;
        self
    }

    /// Sets whether generated identities are written back into the batch.
    #[must_use]
    pub const fn backfill_identities(mut self, value: bool) -> Self {
        self.backfill_identities = value;
        self
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self::new(MergeMode::MergeEntityUpsert)
    }
}
