pub mod drift;
pub mod group;

pub use drift::{DriftEntry, DriftReport, ResyncOutcome};
pub use group::SyncGroup;
