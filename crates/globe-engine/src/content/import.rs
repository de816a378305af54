use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

/// Reads a JSON map description from disk.
pub fn read_map_file(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read map from \"{}\"", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("\"{}\" is not valid JSON", path.display()))
}

/// Converts a legacy earth file into a JSON map description.
pub trait EarthFileImporter {
    fn read(&self, path: &Path) -> Result<Value>;
}
