//! CLI command implementations.

pub mod merge;
pub mod modes;
pub mod plan;

use serde::Deserialize;
use std::path::Path;
use tempodb_engine::{DeleteMode, MergeConfig, MergeMode};
use tempodb_model::payload::Payload;
use tempodb_model::{SourceRow, TableSchema, TimePoint};
use tempodb_store::TemporalTable;

/// A target seed row as read from the target file; row ids are assigned by
/// the table on insert.
#[derive(Debug, Deserialize)]
pub struct SeedRow {
    /// Identity-column values.
    pub identity: Payload,
    /// Inclusive lower bound.
    pub valid_from: TimePoint,
    /// Exclusive upper bound.
    pub valid_until: TimePoint,
    /// Data payload.
    #[serde(default)]
    pub payload: Payload,
}

/// Loads the schema file and builds a table seeded with the target rows.
pub fn load_table(
    schema_path: &Path,
    target_path: Option<&Path>,
) -> Result<TemporalTable, Box<dyn std::error::Error>> {
    let schema: TableSchema = read_json(schema_path)?;
    let mut table = TemporalTable::new(schema)?;
    if let Some(path) = target_path {
        let rows: Vec<SeedRow> = read_json(path)?;
        for row in rows {
            table.insert(row.identity, row.valid_from, row.valid_until, row.payload)?;
        }
    }
    Ok(table)
}

/// Loads the source batch file.
pub fn load_sources(path: &Path) -> Result<Vec<SourceRow>, Box<dyn std::error::Error>> {
    Ok(read_json(path)?)
}

/// Builds a merge configuration from the mode flags.
pub fn build_config(
    mode: &str,
    delete_mode: &str,
) -> Result<MergeConfig, Box<dyn std::error::Error>> {
    let mode: MergeMode = mode.parse()?;
    let delete_mode = parse_delete_mode(delete_mode)?;
    Ok(MergeConfig::new(mode).delete_mode(delete_mode))
}

fn parse_delete_mode(s: &str) -> Result<DeleteMode, Box<dyn std::error::Error>> {
    match s {
        "NONE" => Ok(DeleteMode::None),
        "DELETE_MISSING_TIMELINE" => Ok(DeleteMode::DeleteMissingTimeline),
        "DELETE_MISSING_ENTITIES" => Ok(DeleteMode::DeleteMissingEntities),
        "DELETE_MISSING_TIMELINE_AND_ENTITIES" => {
            Ok(DeleteMode::DeleteMissingTimelineAndEntities)
        }
        other => Err(format!("unknown delete mode: {other}").into()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<T, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    Ok(serde_json::from_str(&text)
        .map_err(|e| format!("cannot parse {}: {e}", path.display()))?)
}
