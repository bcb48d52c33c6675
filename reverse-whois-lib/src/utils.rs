//! Small text and file helpers shared by target collection and configuration.

use crate::error::ReverseWhoisError;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Split a comma-separated value, trimming each part and dropping empty ones.
pub fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}

/// Read trimmed, non-empty lines from any buffered reader.
pub fn read_lines_from<R: BufRead>(reader: R) -> std::io::Result<Vec<String>> {
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
    }
    Ok(lines)
}

/// Read trimmed, non-empty lines from a file.
///
/// # Errors
///
/// Returns `ReverseWhoisError::ReadError` if the file cannot be opened or read.
pub fn read_lines<P: AsRef<Path>>(path: P) -> Result<Vec<String>, ReverseWhoisError> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| ReverseWhoisError::read(path.to_string_lossy(), e.to_string()))?;
    read_lines_from(BufReader::new(file))
        .map_err(|e| ReverseWhoisError::read(path.to_string_lossy(), e.to_string()))
}
