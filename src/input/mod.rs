pub mod csv;
pub mod json;

pub use csv::load_csv;
pub use json::load_json;

use crate::core::SegmentTable;
use anyhow::Result;
use std::path::Path;

/// Input format detection result
#[derive(Debug, Clone)]
pub enum TableFormat {
    Csv,
    Json,
    Unknown,
}

/// Detect the format of a segment table file by inspecting its head
pub fn detect_format(data: &[u8]) -> TableFormat {
    if is_json(data) {
        return TableFormat::Json;
    }

    if is_csv(data) {
        return TableFormat::Csv;
    }

    TableFormat::Unknown
}

fn is_json(data: &[u8]) -> bool {
    // A segment table serializes as a JSON array (or is at least bracketed)
    data.iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b == b'[' || b == b'{')
}

fn is_csv(data: &[u8]) -> bool {
    // Check for a comma-separated header line in the first 500 bytes
    if data.len() < 10 {
        return false;
    }

    let sample = std::str::from_utf8(&data[..data.len().min(500)]);
    match sample {
        Ok(text) => text
            .lines()
            .take(5)
            .any(|line| line.chars().filter(|&c| c == ',').count() >= 2),
        Err(_) => false,
    }
}

/// Load a segment table from a file, auto-detecting format
pub fn load_segments(path: impl AsRef<Path>) -> Result<SegmentTable> {
    let data = std::fs::read(path.as_ref())?;

    match detect_format(&data) {
        TableFormat::Csv => load_csv(&data),
        TableFormat::Json => load_json(&data),
        TableFormat::Unknown => anyhow::bail!("Unknown segment table format"),
    }
}
