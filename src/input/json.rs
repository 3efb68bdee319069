use crate::core::{Segment, SegmentTable};
use anyhow::{Context, Result};

/// Load a segment table from a JSON array of segments
///
/// Expected shape: `[{"label": "0-50m", "start": 0.0, "end": 5.8}, ...]`
pub fn load_json(data: &[u8]) -> Result<SegmentTable> {
    let segments: Vec<Segment> =
        serde_json::from_slice(data).context("Failed to parse segment JSON")?;
    SegmentTable::new(segments).context("Invalid segment table")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_json_segments() {
        let data = br#"[
            {"label": "0-50m", "start": 0.0, "end": 5.8},
            {"label": "50-100m", "start": 5.8, "end": 10.5}
        ]"#;
        let table = load_json(data).unwrap();
        assert_eq!(table.label_for(1.0), Some("0-50m"));
    }

    #[test]
    fn test_load_json_rejects_malformed_input() {
        assert!(load_json(b"{\"label\": \"not an array\"}").is_err());
    }
}
