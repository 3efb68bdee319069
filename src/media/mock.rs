use crate::core::SourceRef;
use crate::core::SourceSpec;
use crate::error::{LoadError, PlaybackError, RateError, SeekError};
use crate::media::stream::{MediaStream, StreamFactory, StreamStatus};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Commands observed by a mock stream, in call order
#[derive(Debug, Clone, PartialEq)]
pub enum MockCommand {
    Load(SourceRef),
    Play,
    Pause,
    Seek(f64),
    SetRate(f64),
}

struct MockInner {
    status: StreamStatus,
    source: Option<SourceRef>,
    playing: bool,
    rate: f64,
    clock: f64,
    duration: Option<f64>,
    /// Clock advance multiplier relative to the group; < 1.0 simulates a
    /// stream that falls behind
    drift_factor: f64,
    load_delay: Option<Duration>,
    fail_load: Option<LoadError>,
    fail_next_play: bool,
    fail_next_seek: bool,
    rejected_rates: Vec<f64>,
    commands: Vec<MockCommand>,
}

/// Mock media stream for testing without a real playback backend
///
/// Simulates a decoded media resource with a manually-advanced clock.
/// Clones share state, so tests keep one clone as a probe while the
/// controller owns the other.
#[derive(Clone)]
pub struct MockStream {
    name: String,
    inner: Arc<Mutex<MockInner>>,
}

impl MockStream {
    /// Create a new mock stream with a known duration
    pub fn new(name: &str, duration: f64) -> Self {
        Self {
            name: name.to_string(),
            inner: Arc::new(Mutex::new(MockInner {
                status: StreamStatus::Detached,
                source: None,
                playing: false,
                rate: 1.0,
                clock: 0.0,
                duration: Some(duration),
                drift_factor: 1.0,
                load_delay: None,
                fail_load: None,
                fail_next_play: false,
                fail_next_seek: false,
                rejected_rates: Vec::new(),
                commands: Vec::new(),
            })),
        }
    }

    /// Create a mock stream that reports no duration
    pub fn unbounded(name: &str) -> Self {
        let mock = Self::new(name, 0.0);
        mock.inner.lock().unwrap().duration = None;
        mock
    }

    /// Advance the simulated clock by `dt` seconds of wall time
    ///
    /// The clock only moves while playing, scaled by the current rate and
    /// the drift factor, and never past a known duration.
    pub fn advance(&self, dt: f64) {
        let mut inner = self.inner.lock().unwrap();
        if !inner.playing {
            return;
        }
        let mut clock = inner.clock + dt * inner.rate * inner.drift_factor;
        if let Some(duration) = inner.duration {
            clock = clock.min(duration);
        }
        inner.clock = clock;
    }

    /// Set the clock advance multiplier (1.0 = perfectly in sync)
    pub fn set_drift_factor(&self, factor: f64) {
        self.inner.lock().unwrap().drift_factor = factor;
    }

    /// Place the clock at an exact position (for drift scenarios)
    pub fn set_position(&self, seconds: f64) {
        self.inner.lock().unwrap().clock = seconds;
    }

    /// Delay load completion by the given duration
    pub fn set_load_delay(&self, delay: Duration) {
        self.inner.lock().unwrap().load_delay = Some(delay);
    }

    /// Make every subsequent load fail with the given error
    pub fn set_fail_load(&self, error: LoadError) {
        self.inner.lock().unwrap().fail_load = Some(error);
    }

    /// Make the next play call fail
    pub fn set_fail_next_play(&self) {
        self.inner.lock().unwrap().fail_next_play = true;
    }

    /// Make the next seek call fail
    pub fn set_fail_next_seek(&self) {
        self.inner.lock().unwrap().fail_next_seek = true;
    }

    /// Reject the given rate multipliers
    pub fn set_rejected_rates(&self, rates: Vec<f64>) {
        self.inner.lock().unwrap().rejected_rates = rates;
    }

    /// Whether the backend believes it is playing
    pub fn is_playing(&self) -> bool {
        self.inner.lock().unwrap().playing
    }

    /// Current rate as seen by the backend
    pub fn rate(&self) -> f64 {
        self.inner.lock().unwrap().rate
    }

    /// Drain the observed command log (for verification)
    pub fn take_commands(&self) -> Vec<MockCommand> {
        std::mem::take(&mut self.inner.lock().unwrap().commands)
    }
}

#[async_trait]
impl MediaStream for MockStream {
    fn name(&self) -> &str {
        &self.name
    }

    fn status(&self) -> StreamStatus {
        self.inner.lock().unwrap().status
    }

    async fn load(&mut self, source: &SourceRef) -> Result<(), LoadError> {
        let delay = {
            let mut inner = self.inner.lock().unwrap();
            inner.commands.push(MockCommand::Load(source.clone()));
            inner.status = StreamStatus::Loading;
            inner.load_delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_load.clone() {
            inner.status = StreamStatus::Failed;
            return Err(error);
        }

        inner.status = StreamStatus::Ready;
        inner.source = Some(source.clone());
        inner.playing = false;
        inner.clock = 0.0;
        Ok(())
    }

    async fn play(&mut self) -> Result<(), PlaybackError> {
        let mut inner = self.inner.lock().unwrap();
        inner.commands.push(MockCommand::Play);
        if inner.status != StreamStatus::Ready {
            return Err(PlaybackError::NotReady);
        }
        if std::mem::take(&mut inner.fail_next_play) {
            return Err(PlaybackError::Rejected("injected play failure".to_string()));
        }
        inner.playing = true;
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), PlaybackError> {
        let mut inner = self.inner.lock().unwrap();
        inner.commands.push(MockCommand::Pause);
        if inner.status != StreamStatus::Ready {
            return Err(PlaybackError::NotReady);
        }
        inner.playing = false;
        Ok(())
    }

    async fn seek(&mut self, seconds: f64) -> Result<(), SeekError> {
        let mut inner = self.inner.lock().unwrap();
        inner.commands.push(MockCommand::Seek(seconds));
        if inner.status != StreamStatus::Ready {
            return Err(SeekError::NotReady);
        }
        if std::mem::take(&mut inner.fail_next_seek) {
            return Err(SeekError::Rejected("injected seek failure".to_string()));
        }
        let mut clock = seconds.max(0.0);
        if let Some(duration) = inner.duration {
            clock = clock.min(duration);
        }
        inner.clock = clock;
        Ok(())
    }

    async fn set_rate(&mut self, multiplier: f64) -> Result<(), RateError> {
        let mut inner = self.inner.lock().unwrap();
        inner.commands.push(MockCommand::SetRate(multiplier));
        if inner.rejected_rates.contains(&multiplier) {
            return Err(RateError::Rejected { multiplier });
        }
        inner.rate = multiplier;
        Ok(())
    }

    fn position(&self) -> f64 {
        self.inner.lock().unwrap().clock
    }

    fn duration(&self) -> Option<f64> {
        self.inner.lock().unwrap().duration
    }
}

/// Stream factory backed by registered mock streams
///
/// Sources without a registered mock get a fresh 60-second stream, so most
/// tests only register the streams they need to manipulate.
#[derive(Default)]
pub struct MockStreamFactory {
    streams: Mutex<HashMap<SourceRef, MockStream>>,
}

impl MockStreamFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the mock to hand out for a source ref
    pub fn register(&self, source: impl Into<SourceRef>, stream: MockStream) {
        self.streams.lock().unwrap().insert(source.into(), stream);
    }
}

impl StreamFactory for MockStreamFactory {
    fn open(&self, spec: &SourceSpec) -> Box<dyn MediaStream> {
        let streams = self.streams.lock().unwrap();
        match streams.get(&spec.source) {
            Some(stream) => Box::new(stream.clone()),
            None => Box::new(MockStream::new(spec.id.as_str(), 60.0)),
        }
    }
}
