//! Cross-call planner cache.
//!
//! Compiling a merge derives the column partitions and dispatch data the
//! pipeline consults on every row. That shape depends only on (target
//! schema, source column list, configuration), so it is memoized
//! process-wide, content-addressed by an xxh3 signature of those inputs.
//! A miss rebuilds the entry wholesale; entries are immutable and
//! `Arc`-shared, so concurrent readers need no coordination beyond the map
//! lock. Row data is never cached.

use crate::config::{EclipsePolicy, ExtensionPolicy, MergeConfig};
use crate::error::{EngineError, EngineResult};
use crate::mode::{DeleteMode, MergeMode};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use tempodb_model::TableSchema;
use xxhash_rust::xxh3::Xxh3;

/// The immutable, structural part of a merge plan.
///
/// Holds everything the pipeline needs that does not depend on row data:
/// mode and policies, the column partitions of the target schema, and the
/// source columns present in the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledMerge {
    /// Content signature this entry is addressed by.
    pub signature: u64,
    /// Merge mode.
    pub mode: MergeMode,
    /// Delete mode.
    pub delete_mode: DeleteMode,
    /// Eclipse policy.
    pub eclipse_policy: EclipsePolicy,
    /// Extension policy.
    pub extension_policy: ExtensionPolicy,
    /// Payload data columns of the target.
    pub data_columns: Vec<String>,
    /// Surrogate identity columns.
    pub identity_columns: Vec<String>,
    /// Natural-key columns.
    pub natural_key_columns: Vec<String>,
    /// NOT NULL data columns.
    pub required_columns: Vec<String>,
    /// Ephemeral columns excluded from coalescing equality.
    pub ephemeral_columns: Vec<String>,
    /// Data columns actually present in the source batch.
    pub source_data_columns: Vec<String>,
}

impl CompiledMerge {
    fn build(
        schema: &TableSchema,
        source_columns: &[String],
        config: &MergeConfig,
        signature: u64,
    ) -> EngineResult<Self> {
        schema.validate()?;
        if config.mode.is_for_portion_of() && schema.identity_columns.is_empty() {
            // Portion-of modes address existing entities; without surrogate
            // identity there is nothing stable to address them by.
            if schema.natural_key_columns.is_empty() {
                return Err(EngineError::invalid_config(format!(
                    "{} requires identity or natural-key columns",
                    config.mode
                )));
            }
        }
        let source_data_columns = source_columns
            .iter()
            .filter(|c| schema.data_columns.contains(c))
            .cloned()
            .collect();
        Ok(Self {
            signature,
            mode: config.mode,
            delete_mode: config.delete_mode,
            eclipse_policy: config.eclipse_policy,
            extension_policy: config.extension_policy,
            data_columns: schema.data_columns.clone(),
            identity_columns: schema.identity_columns.clone(),
            natural_key_columns: schema.natural_key_columns.clone(),
            required_columns: schema.required_columns.clone(),
            ephemeral_columns: schema.era.ephemeral_columns.clone(),
            source_data_columns,
        })
    }

    /// Returns true if `column` is a declared data column.
    #[must_use]
    pub fn is_data_column(&self, column: &str) -> bool {
        self.data_columns.iter().any(|c| c == column)
    }

    /// Returns true if `column` is ephemeral.
    #[must_use]
    pub fn is_ephemeral(&self, column: &str) -> bool {
        self.ephemeral_columns.iter().any(|c| c == column)
    }
}

fn signature_of(schema: &TableSchema, source_columns: &[String], config: &MergeConfig) -> u64 {
    let mut hasher = Xxh3::new();
    schema.hash(&mut hasher);
    source_columns.hash(&mut hasher);
    config.hash(&mut hasher);
    hasher.finish()
}

/// Process-wide compiled-merge cache.
#[derive(Debug, Default)]
pub struct PlannerCache {
    entries: RwLock<HashMap<u64, Arc<CompiledMerge>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PlannerCache {
    /// The process-wide cache instance.
    pub fn global() -> &'static PlannerCache {
        static CACHE: OnceLock<PlannerCache> = OnceLock::new();
        CACHE.get_or_init(PlannerCache::default)
    }

    /// Returns the compiled merge for the given inputs, building and
    /// inserting it on a miss.
    pub fn compiled(
        &self,
        schema: &TableSchema,
        source_columns: &[String],
        config: &MergeConfig,
    ) -> EngineResult<Arc<CompiledMerge>> {
        let signature = signature_of(schema, source_columns, config);

        if let Some(entry) = self.entries.read().get(&signature) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(entry));
        }

        // Build outside the lock; a racing builder produces an identical
        // entry, so last-write-wins is harmless.
        let compiled = Arc::new(CompiledMerge::build(
            schema,
            source_columns,
            config,
            signature,
        )?);
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.entries
            .write()
            .insert(signature, Arc::clone(&compiled));
        tracing::debug!(signature, "compiled merge plan shape");
        Ok(compiled)
    }

    /// Number of cache hits since process start (or the last reset).
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of cache misses.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Drops all entries and resets the counters.
    pub fn clear(&self) {
        self.entries.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> TableSchema {
        TableSchema::new("t", vec!["v".to_string()]).identity_columns(vec!["id".to_string()])
    }

    #[test]
    fn hit_after_miss() {
        let cache = PlannerCache::default();
        let cols = vec!["v".to_string()];
        let config = MergeConfig::default();

        let a = cache.compiled(&schema(), &cols, &config).unwrap();
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 0);

        let b = cache.compiled(&schema(), &cols, &config).unwrap();
        assert_eq!(cache.hits(), 1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn distinct_modes_get_distinct_entries() {
        let cache = PlannerCache::default();
        let cols = vec!["v".to_string()];
        let a = cache
            .compiled(&schema(), &cols, &MergeConfig::default())
            .unwrap();
        let b = cache
            .compiled(
                &schema(),
                &cols,
                &MergeConfig::new(MergeMode::MergeEntityPatch),
            )
            .unwrap();
        assert_ne!(a.signature, b.signature);
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn clear_resets() {
        let cache = PlannerCache::default();
        let cols = vec!["v".to_string()];
        cache
            .compiled(&schema(), &cols, &MergeConfig::default())
            .unwrap();
        cache.clear();
        assert_eq!(cache.misses(), 0);
        cache
            .compiled(&schema(), &cols, &MergeConfig::default())
            .unwrap();
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn source_column_partition() {
        let cache = PlannerCache::default();
        let compiled = cache
            .compiled(
                &schema(),
                &["v".to_string(), "unknown".to_string()],
                &MergeConfig::default(),
            )
            .unwrap();
        assert_eq!(compiled.source_data_columns, vec!["v".to_string()]);
        assert!(compiled.is_data_column("v"));
        assert!(!compiled.is_data_column("unknown"));
    }
}
