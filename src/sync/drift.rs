use crate::core::StreamId;
use crate::error::SeekError;

/// One member whose clock has diverged from the reference
#[derive(Debug, Clone, PartialEq)]
pub struct DriftEntry {
    pub id: StreamId,
    /// The member's observed position in seconds
    pub position: f64,
    /// Signed divergence from the reference (negative = lagging)
    pub delta: f64,
}

/// Result of a drift check against the primary member's clock
#[derive(Debug, Clone, PartialEq)]
pub struct DriftReport {
    /// The primary member's position at check time
    pub reference: f64,
    /// Members diverging beyond tolerance, in group order
    pub drifted: Vec<DriftEntry>,
}

impl DriftReport {
    /// Largest absolute divergence in the report
    pub fn worst_delta(&self) -> f64 {
        self.drifted
            .iter()
            .map(|e| e.delta.abs())
            .fold(0.0, f64::max)
    }
}

/// What a resync pass did with each drifted member
#[derive(Debug, Default)]
pub struct ResyncOutcome {
    /// Members seeked back to the reference position
    pub corrected: Vec<StreamId>,
    /// Members skipped because a recent correction is still cooling down
    pub in_cooldown: Vec<StreamId>,
    /// Members whose corrective seek failed; retried on a later check
    pub failed: Vec<(StreamId, SeekError)>,
}

impl ResyncOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
