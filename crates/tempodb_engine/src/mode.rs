//! Merge and delete modes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a merge call reconciles source records with the target history.
///
/// The whole-entity family treats the source batch as the entity's
/// intended state and may extend or rewrite its timeline; the
/// `ForPortionOf` family treats each source interval as a surgical patch
/// over part of an existing entity's timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MergeMode {
    /// Upsert entity state: source values override, nulls included.
    MergeEntityUpsert,
    /// Replace entity state: absent source columns become null.
    MergeEntityReplace,
    /// Patch entity state: absent or null source columns keep target values.
    MergeEntityPatch,
    /// Patch only the source interval of an existing entity.
    PatchForPortionOf,
    /// Replace only the source interval of an existing entity.
    ReplaceForPortionOf,
    /// Upsert only the source interval of an existing entity.
    UpdateForPortionOf,
    /// Insert source rows founding new entities; existing entities are skipped.
    InsertNewEntities,
    /// Carve the source interval out of an existing entity's timeline.
    DeleteForPortionOf,
}

impl MergeMode {
    /// Returns true for PATCH semantics (null source columns keep target values).
    #[must_use]
    pub fn is_patch(self) -> bool {
        matches!(self, Self::MergeEntityPatch | Self::PatchForPortionOf)
    }

    /// Returns true for REPLACE semantics (absent source columns become null).
    #[must_use]
    pub fn is_replace(self) -> bool {
        matches!(self, Self::MergeEntityReplace | Self::ReplaceForPortionOf)
    }

    /// Returns true for the surgical-patch family.
    #[must_use]
    pub fn is_for_portion_of(self) -> bool {
        matches!(
            self,
            Self::UpdateForPortionOf
                | Self::PatchForPortionOf
                | Self::ReplaceForPortionOf
                | Self::DeleteForPortionOf
        )
    }

    /// Returns true for modes operating on whole entities.
    #[must_use]
    pub fn is_entity_scope(self) -> bool {
        !self.is_for_portion_of()
    }

    /// Returns true if the mode deletes rather than writes coverage.
    #[must_use]
    pub fn is_delete(self) -> bool {
        matches!(self, Self::DeleteForPortionOf)
    }

    /// Stable textual name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MergeEntityUpsert => "MERGE_ENTITY_UPSERT",
            Self::MergeEntityReplace => "MERGE_ENTITY_REPLACE",
            Self::MergeEntityPatch => "MERGE_ENTITY_PATCH",
            Self::PatchForPortionOf => "PATCH_FOR_PORTION_OF",
            Self::ReplaceForPortionOf => "REPLACE_FOR_PORTION_OF",
            Self::UpdateForPortionOf => "UPDATE_FOR_PORTION_OF",
            Self::InsertNewEntities => "INSERT_NEW_ENTITIES",
            Self::DeleteForPortionOf => "DELETE_FOR_PORTION_OF",
        }
    }

    /// All modes, in declaration order.
    #[must_use]
    pub fn all() -> [MergeMode; 8] {
        [
            Self::MergeEntityUpsert,
            Self::MergeEntityReplace,
            Self::MergeEntityPatch,
            Self::PatchForPortionOf,
            Self::ReplaceForPortionOf,
            Self::UpdateForPortionOf,
            Self::InsertNewEntities,
            Self::DeleteForPortionOf,
        ]
    }
}

impl fmt::Display for MergeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown merge mode: {s}"))
    }
}

/// What happens to target coverage absent from the source batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeleteMode {
    /// Absent coverage is left untouched.
    #[default]
    None,
    /// For entities in the batch, target coverage outside all source
    /// intervals is deleted.
    DeleteMissingTimeline,
    /// Target entities absent from the batch are deleted entirely.
    DeleteMissingEntities,
    /// Both of the above.
    DeleteMissingTimelineAndEntities,
}

impl DeleteMode {
    /// Returns true if whole absent entities are deleted.
    #[must_use]
    pub fn deletes_entities(self) -> bool {
        matches!(
            self,
            Self::DeleteMissingEntities | Self::DeleteMissingTimelineAndEntities
        )
    }

    /// Returns true if uncovered timeline of batched entities is deleted.
    #[must_use]
    pub fn deletes_timeline(self) -> bool {
        matches!(
            self,
            Self::DeleteMissingTimeline | Self::DeleteMissingTimelineAndEntities
        )
    }
}
