//! String-list loading
//!
//! Input collections are read fully into memory before a run starts:
//! - `.txt`: one string per line (a trailing `\r` is dropped)
//! - `.json`: a top-level array of strings

use crate::error::{Result, SimError};
use std::fs;
use std::path::Path;

/// Read strings from a `.txt` or `.json` file, chosen by extension.
pub fn read_strings(path: &Path) -> Result<Vec<String>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("txt") => read_lines(path),
        Some("json") => read_json_array(path),
        _ => Err(SimError::UnsupportedInput {
            path: path.to_path_buf(),
        }),
    }
}

/// Check an input path's extension without reading it.
pub fn check_input_extension(path: &Path) -> Result<()> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("txt") || ext.eq_ignore_ascii_case("json") => Ok(()),
        _ => Err(SimError::UnsupportedInput {
            path: path.to_path_buf(),
        }),
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path).map_err(|e| SimError::io(path, e))?;
    Ok(contents.lines().map(str::to_string).collect())
}

fn read_json_array(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path).map_err(|e| SimError::io(path, e))?;
    let items: Vec<String> = serde_json::from_str(&contents)?;
    Ok(items)
}
