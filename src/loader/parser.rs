use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Reads a JSON file and deserializes it into `T`.
pub fn parse_json_file<T>(file_path: impl AsRef<Path>) -> Result<T>
where
    T: DeserializeOwned,
{
    let path = file_path.as_ref();
    let data = fs::read_to_string(path)
        .map_err(|e| Error::InvalidFile(format!("failed to read '{}': {}", path.display(), e)))?;

    let parsed: T = serde_json::from_str(&data)
        .map_err(|e| Error::InvalidFile(format!("failed to parse '{}': {}", path.display(), e)))?;

    Ok(parsed)
}

/// Reads a JSON file into an untyped value for record-by-record handling.
pub fn parse_json_value(file_path: impl AsRef<Path>) -> Result<serde_json::Value> {
    parse_json_file::<serde_json::Value>(file_path)
}
