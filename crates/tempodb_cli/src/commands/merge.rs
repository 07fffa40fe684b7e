//! Merge command implementation.

use super::{build_config, load_sources, load_table};
use std::path::Path;
use tempodb_engine::MergeResult;
use tempodb_store::TemporalTable;

/// Runs the merge command.
pub fn run(
    schema: &Path,
    target: Option<&Path>,
    source: &Path,
    mode: &str,
    delete_mode: &str,
    output: Option<&Path>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut table = load_table(schema, target)?;
    let mut sources = load_sources(source)?;
    let config = build_config(mode, delete_mode)?.backfill_identities(true);

    let result = tempodb_engine::merge(&mut table, &mut sources, &config)?;
    match format {
        "json" => {
            let doc = serde_json::json!({
                "summary": result.plan.summary(),
                "feedback": result.feedback,
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        _ => print_text(&result, &table),
    }

    if let Some(path) = output {
        let rows: Vec<_> = table.rows().collect();
        std::fs::write(path, serde_json::to_string_pretty(&rows)?)
            .map_err(|e| format!("cannot write {}: {e}", path.display()))?;
    }
    Ok(())
}

fn print_text(result: &MergeResult, table: &TemporalTable) {
    println!("Applied: {}", result.plan.summary());
    for fb in &result.feedback {
        let detail = match (&fb.skip_reason, &fb.error) {
            (Some(reason), _) => format!(" ({reason:?})"),
            (_, Some(message)) => format!(": {message}"),
            _ => String::new(),
        };
        println!("  {} -> {:?}{detail}", fb.source_row_id, fb.status);
    }
    println!("Table now holds {} row(s)", table.len());
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
    fn merges_and_writes_state() {
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
        let target = write_file(
            &dir,
            "target.json",
            json!([{
                "identity": {"id": "e1"},
                "valid_from": 0,
                "valid_until": 20,
                "payload": {"title": "Old"}
            }]),
        );
        let source = write_file(
            &dir,
            "source.json",
            json!([{
                "row_id": 1,
                "identity": {"id": "e1"},
                "valid_from": 5,
                "valid_until": 10,
                "payload": {"title": "New"}
            }]),
        );
        let output = dir.path().join("state.json");

        run(
            &schema,
            Some(&target),
            &source,
            "PATCH_FOR_PORTION_OF",
            "NONE",
            Some(&output),
            "json",
        )
        .unwrap();

        let state: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(state.as_array().unwrap().len(), 3);
    }
}
