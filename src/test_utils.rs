/*
 * Test utilities for autoz
 *
 * Builds consoles over a simulated printer backed by a temporary configuration file.
 */

use std::fs;

use az_core::JsonConfigStore;
use serde_json::Value;
use tempfile::TempDir;

use crate::config::default_document;
use crate::console::Console;
use crate::sim::SimPrinter;

/// Default document with the toolhead parked above the bed
pub fn test_document() -> Value {
    default_document()
}

/// Write `document` to a temporary printer.json and open a console over it
///
/// The returned directory must outlive the console.
pub fn console_with(document: Value) -> (Console, SimPrinter, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("printer.json");
    fs::write(&path, serde_json::to_string_pretty(&document).unwrap()).unwrap();
    let store = JsonConfigStore::open(&path).unwrap();
    let (console, sim) = Console::simulated(store).unwrap();
    (console, sim, dir)
}
