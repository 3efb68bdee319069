use crate::core::{LaneRole, SourceRef, SourceSpec, StreamId};
use crate::error::{LoadError, PlaybackError, RateError, SeekError};
use crate::media::stream::{MediaStream, StreamStatus};
use std::cell::Cell;
use tracing::debug;

/// One stream of a comparison session
///
/// Wraps a single media backend together with its session identity and
/// enforces the per-stream contract: idempotent loads, seek clamping,
/// readiness checks and monotonic position reads. Has no knowledge of the
/// other streams; grouping lives one level up.
pub struct StreamHandle {
    /// Session-unique identifier
    id: StreamId,
    /// Lane role; the primary lane is the drift reference
    role: LaneRole,
    /// Media resource this handle binds to
    source: SourceRef,
    /// The external playback backend
    stream: Box<dyn MediaStream>,
    /// Source ref the backend is currently bound to
    loaded: Option<SourceRef>,
    /// Play state as last commanded through this handle
    playing: bool,
    /// Highest position observed since the last seek
    last_position: Cell<f64>,
}

impl StreamHandle {
    pub fn new(spec: &SourceSpec, stream: Box<dyn MediaStream>) -> Self {
        Self {
            id: spec.id.clone(),
            role: spec.role,
            source: spec.source.clone(),
            stream,
            loaded: None,
            playing: false,
            last_position: Cell::new(0.0),
        }
    }

    pub fn id(&self) -> &StreamId {
        &self.id
    }

    pub fn role(&self) -> LaneRole {
        self.role
    }

    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    pub fn status(&self) -> StreamStatus {
        self.stream.status()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn duration(&self) -> Option<f64> {
        self.stream.duration()
    }

    /// Bind the backend to this handle's source
    ///
    /// A handle that is already ready on the same source is left alone, so
    /// repeated loads are no-ops.
    pub async fn load(&mut self) -> Result<(), LoadError> {
        if self.loaded.as_ref() == Some(&self.source) && self.status() == StreamStatus::Ready {
            debug!("stream {} already bound to {}", self.id, self.source);
            return Ok(());
        }

        self.stream.load(&self.source).await?;
        self.loaded = Some(self.source.clone());
        self.playing = false;
        self.last_position.set(0.0);
        Ok(())
    }

    pub async fn play(&mut self) -> Result<(), PlaybackError> {
        if self.status() != StreamStatus::Ready {
            return Err(PlaybackError::NotReady);
        }
        self.stream.play().await?;
        self.playing = true;
        Ok(())
    }

    pub async fn pause(&mut self) -> Result<(), PlaybackError> {
        if self.status() != StreamStatus::Ready {
            return Err(PlaybackError::NotReady);
        }
        self.stream.pause().await?;
        self.playing = false;
        Ok(())
    }

    /// Seek to the given position, clamped to `[0, duration]`
    ///
    /// With an unknown duration only the lower bound is enforced and the
    /// backend decides whether the target is reachable.
    pub async fn seek(&mut self, seconds: f64) -> Result<(), SeekError> {
        if self.status() != StreamStatus::Ready {
            return Err(SeekError::NotReady);
        }
        if !seconds.is_finite() {
            return Err(SeekError::OutOfRange { target: seconds });
        }

        let mut target = seconds.max(0.0);
        if let Some(duration) = self.stream.duration() {
            target = target.min(duration);
        }

        self.stream.seek(target).await?;
        self.last_position.set(target);
        Ok(())
    }

    pub async fn set_rate(&mut self, multiplier: f64) -> Result<(), RateError> {
        self.stream.set_rate(multiplier).await
    }

    /// Current position, read through from the backend
    ///
    /// While playing, reads never regress past the highest observed value;
    /// only an explicit seek moves the position backwards.
    pub fn position(&self) -> f64 {
        let raw = self.stream.position();
        if self.playing && raw < self.last_position.get() {
            return self.last_position.get();
        }
        self.last_position.set(raw);
        raw
    }
}
