use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A labeled sub-range of the playback timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Display label, e.g. "0-50m"
    pub label: String,

    /// Segment start in seconds, inclusive
    pub start: f64,

    /// Segment end in seconds, exclusive (inclusive for the final segment)
    pub end: f64,
}

impl Segment {
    pub fn new(label: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            label: label.into(),
            start,
            end,
        }
    }
}

/// Rejected segment table input
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SegmentTableError {
    #[error("segment {index} (\"{label}\") has end <= start")]
    InvalidRange { index: usize, label: String },

    #[error("segment {index} (\"{label}\") starts before the previous segment")]
    Unsorted { index: usize, label: String },

    #[error("segment {index} (\"{label}\") overlaps the previous segment")]
    Overlap { index: usize, label: String },
}

/// Ordered, non-overlapping race segments with stateless position lookup
#[derive(Debug, Clone, Default)]
pub struct SegmentTable {
    segments: Vec<Segment>,
}

impl SegmentTable {
    /// Build a table, validating ordering and non-overlap
    pub fn new(segments: Vec<Segment>) -> Result<Self, SegmentTableError> {
        for (index, seg) in segments.iter().enumerate() {
            if seg.end <= seg.start {
                return Err(SegmentTableError::InvalidRange {
                    index,
                    label: seg.label.clone(),
                });
            }
            if index > 0 {
                let prev = &segments[index - 1];
                if seg.start < prev.start {
                    return Err(SegmentTableError::Unsorted {
                        index,
                        label: seg.label.clone(),
                    });
                }
                if seg.start < prev.end {
                    return Err(SegmentTableError::Overlap {
                        index,
                        label: seg.label.clone(),
                    });
                }
            }
        }
        Ok(Self { segments })
    }

    /// Label covering the given position, if any
    ///
    /// Segment starts are inclusive and ends exclusive, except the final
    /// segment whose end is inclusive so the finish-line instant is labeled.
    pub fn label_for(&self, position: f64) -> Option<&str> {
        if self.segments.is_empty() || !position.is_finite() {
            return None;
        }

        let idx = self.segments.partition_point(|s| s.start <= position);
        if idx == 0 {
            return None;
        }

        let seg = &self.segments[idx - 1];
        let last = idx == self.segments.len();
        let inside = if last {
            position <= seg.end
        } else {
            position < seg.end
        };
        inside.then(|| seg.label.as_str())
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}
