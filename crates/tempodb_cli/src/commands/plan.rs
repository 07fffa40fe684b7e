//! Plan command implementation.

use super::{build_config, load_sources, load_table};
use std::path::Path;
use tempodb_engine::MergePlan;

/// Runs the plan command.
pub fn run(
    schema: &Path,
    target: Option<&Path>,
    source: &Path,
    mode: &str,
    delete_mode: &str,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = load_table(schema, target)?;
    let sources = load_sources(source)?;
    let config = build_config(mode, delete_mode)?;

    let plan = tempodb_engine::plan(&table, &sources, &config)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&plan)?),
        _ => print_text(&plan),
    }
    Ok(())
}

fn print_text(plan: &MergePlan) {
    println!("Plan: {}", plan.summary());
    for op in &plan.ops {
        let span = op
            .new_interval
            .as_ref()
            .or(op.old_interval.as_ref())
            .map(|iv| iv.to_string())
            .unwrap_or_default();
        let effect = op
            .effect
            .map(|e| format!(" ({e:?})"))
            .unwrap_or_default();
        println!(
            "  #{:<3} stmt {:<3} {:?}{effect} {} {span}",
            op.seq, op.statement, op.kind, op.entity
        );
    }
    for fb in &plan.early_feedback {
        println!("  {} -> {:?}", fb.source_row_id, fb.status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, v: serde_json::Value) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "{v}").unwrap();
        path
    }

    #[test]
    fn plans_from_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let schema = write_file(
            &dir,
            "schema.json",
            json!({
                "name": "positions",
                "data_columns": ["title"],
                "identity_columns": ["id"],
                "natural_key_columns": [],
                "required_columns": [],
                "era": {
                    "name": "valid",
                    "valid_from_column": "valid_from",
                    "valid_until_column": "valid_until",
                    "ephemeral_columns": []
                }
            }),
        );
        let source = write_file(
            &dir,
            "source.json",
            json!([{
                "row_id": 1,
                "founding_id": "g1",
                "valid_from": 0,
                "valid_until": 10,
                "payload": {"title": "A"}
            }]),
        );

        run(&schema, None, &source, "MERGE_ENTITY_UPSERT", "NONE", "json").unwrap();
    }

    #[test]
    fn rejects_unknown_modes() {
        assert!(build_config("NOT_A_MODE", "NONE").is_err());
        assert!(build_config("MERGE_ENTITY_UPSERT", "NOT_A_MODE").is_err());
    }
}
