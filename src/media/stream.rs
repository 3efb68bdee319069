use crate::core::{SourceRef, SourceSpec};
use crate::error::{LoadError, PlaybackError, RateError, SeekError};
use async_trait::async_trait;

/// Status of a media stream backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StreamStatus {
    /// No source bound
    Detached,
    /// A load is in flight
    Loading,
    /// Bound and playable
    Ready,
    /// The backend hit an unrecoverable error
    Failed,
}

/// Trait for external media-playback backends
///
/// This trait is the exact surface the controller needs from whatever
/// decodes and renders the footage:
/// - platform media elements bridged from the host UI
/// - native decoder pipelines
/// - mock streams for testing
///
/// The backend owns its own clock; `position` is a read-through. Decoding,
/// rendering and audio pitch handling stay on the backend side.
#[async_trait]
pub trait MediaStream: Send {
    /// Get the name/identifier of this backend instance
    fn name(&self) -> &str;

    /// Get the current status of the backend
    fn status(&self) -> StreamStatus;

    /// Bind the backend to a media source
    async fn load(&mut self, source: &SourceRef) -> Result<(), LoadError>;

    /// Start advancing the backend clock
    async fn play(&mut self) -> Result<(), PlaybackError>;

    /// Stop advancing the backend clock
    async fn pause(&mut self) -> Result<(), PlaybackError>;

    /// Move the backend clock to the given position in seconds
    async fn seek(&mut self, seconds: f64) -> Result<(), SeekError>;

    /// Set the playback rate multiplier
    async fn set_rate(&mut self, multiplier: f64) -> Result<(), RateError>;

    /// Current playback position in seconds (best effort)
    fn position(&self) -> f64;

    /// Total duration in seconds, `None` while unknown
    fn duration(&self) -> Option<f64>;
}

/// Factory mapping session sources to concrete backends
///
/// The seam where the host application plugs its playback capability in;
/// the controller never constructs backends itself.
pub trait StreamFactory: Send + Sync {
    fn open(&self, spec: &SourceSpec) -> Box<dyn MediaStream>;
}
