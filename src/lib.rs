//! Multi-stream comparative playback controller.
//!
//! Keeps N independently-loaded media streams time-aligned for side-by-side
//! race review: group-wide play/pause/seek/rate with deterministic ordering,
//! drift detection against the primary lane, and throttled resync. Decoding
//! and rendering stay with the host; this crate only orchestrates.

pub mod config;
pub mod controller;
pub mod core;
pub mod error;
pub mod input;
pub mod media;
pub mod sync;

pub use crate::config::{ConfigError, ControllerConfig};
pub use crate::controller::{
    Command, CommandOutcome, ControllerSnapshot, ControllerState, PlaybackController,
};
pub use crate::core::{LaneRole, Segment, SegmentTable, SourceRef, SourceSpec, StreamId};
pub use crate::error::{ControllerError, LoadError, PlaybackError, RateError, SeekError};
pub use crate::media::{MediaStream, MockStream, MockStreamFactory, StreamFactory, StreamStatus};
pub use crate::sync::{DriftEntry, DriftReport, SyncGroup};
