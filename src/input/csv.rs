use crate::core::{Segment, SegmentTable};
use anyhow::{Context, Result};

/// Load a segment table from CSV data
///
/// Supports flexible column naming:
/// - label,start,end
/// - segment,start_time,end_time
/// - name,from,to
///
/// Times are seconds into the footage.
pub fn load_csv(data: &[u8]) -> Result<SegmentTable> {
    let mut rdr = csv::Reader::from_reader(data);

    let headers = rdr.headers().context("Failed to read CSV headers")?;
    let (label_idx, start_idx, end_idx) = detect_columns(headers)?;

    let mut segments = Vec::new();
    for result in rdr.records() {
        let record = result.context("Failed to read CSV row")?;

        let label = record
            .get(label_idx)
            .context("Missing label column")?
            .trim()
            .to_string();
        let start = parse_seconds(&record, start_idx)
            .with_context(|| format!("Bad start time for segment \"{label}\""))?;
        let end = parse_seconds(&record, end_idx)
            .with_context(|| format!("Bad end time for segment \"{label}\""))?;

        segments.push(Segment::new(label, start, end));
    }

    SegmentTable::new(segments).context("Invalid segment table")
}

fn parse_seconds(record: &csv::StringRecord, idx: usize) -> Result<f64> {
    record
        .get(idx)
        .context("Missing time column")?
        .trim()
        .parse::<f64>()
        .context("Not a number")
}

/// Detect column indices from CSV headers
fn detect_columns(headers: &csv::StringRecord) -> Result<(usize, usize, usize)> {
    let label_idx = find_column(headers, &["label", "segment", "name"])?;
    let start_idx = find_column(headers, &["start", "start_time", "from"])?;
    let end_idx = find_column(headers, &["end", "end_time", "to"])?;

    Ok((label_idx, start_idx, end_idx))
}

/// Find a column by checking possible names
fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Result<usize> {
    for (idx, header) in headers.iter().enumerate() {
        let header_lower = header.to_lowercase();
        if names.iter().any(|&name| header_lower == name) {
            return Ok(idx);
        }
    }

    anyhow::bail!("Could not find column with names: {:?}", names)
}
