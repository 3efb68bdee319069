use crate::core::StreamId;
use thiserror::Error;

/// Failure to bind a stream to its media source
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LoadError {
    /// The source could not be reached (network, missing file, ...)
    #[error("source unreachable: {0}")]
    Unreachable(String),

    /// The source exists but the backend cannot play it
    #[error("source unsupported: {0}")]
    Unsupported(String),

    /// The session was torn down while the load was in flight
    #[error("load cancelled")]
    Cancelled,

    /// The session description itself is unusable
    #[error("invalid session: {0}")]
    InvalidSession(String),

    /// A specific member of a session failed to load
    #[error("stream {id} failed to load: {source}")]
    Member {
        id: StreamId,
        #[source]
        source: Box<LoadError>,
    },
}

/// Failure to move the playback position
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SeekError {
    /// The stream is not in a ready state
    #[error("stream not ready for seeking")]
    NotReady,

    /// Target lies outside the playable range
    #[error("seek target {target}s is out of range")]
    OutOfRange { target: f64 },

    /// The backend reports no duration and cannot reach the target
    #[error("seek target {target}s unreachable: duration unknown")]
    UnknownDuration { target: f64 },

    /// The backend refused the seek for its own reasons
    #[error("seek rejected by stream: {0}")]
    Rejected(String),

    /// A specific member of a group-wide seek failed
    #[error("stream {id} failed to seek: {source}")]
    Member {
        id: StreamId,
        #[source]
        source: Box<SeekError>,
    },
}

/// Failure to change the playback rate
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RateError {
    /// The backend does not support this multiplier
    #[error("rate {multiplier}x rejected by stream")]
    Rejected { multiplier: f64 },

    /// A specific member rejected the multiplier during a group change
    #[error("stream {id} rejected rate {multiplier}x")]
    Member { id: StreamId, multiplier: f64 },

    /// The multiplier is not one of the configured discrete steps
    #[error("rate {multiplier}x is not a configured step")]
    UnsupportedStep { multiplier: f64 },
}

/// Failure to start or stop playback
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlaybackError {
    /// The stream is not in a ready state
    #[error("stream not ready for playback")]
    NotReady,

    /// The backend refused the transition
    #[error("playback rejected by stream: {0}")]
    Rejected(String),

    /// A specific member of a group-wide transition failed
    #[error("stream {id} failed to change playback state: {source}")]
    Member {
        id: StreamId,
        #[source]
        source: Box<PlaybackError>,
    },
}

/// Top-level error surface of the playback controller
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ControllerError {
    /// An operation was issued with no active session
    #[error("no active playback session")]
    InvalidState,

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Seek(#[from] SeekError),

    #[error(transparent)]
    Rate(#[from] RateError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),
}
