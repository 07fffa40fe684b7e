//! Modes command implementation.

use tempodb_engine::MergeMode;

/// Prints the available merge and delete modes.
pub fn run() {
    println!("Merge modes:");
    for mode in MergeMode::all() {
        println!("  {mode}");
    }
    println!("Delete modes:");
    for mode in [
        "NONE",
        "DELETE_MISSING_TIMELINE",
        "DELETE_MISSING_ENTITIES",
        "DELETE_MISSING_TIMELINE_AND_ENTITIES",
    ] {
        println!("  {mode}");
    }
}
