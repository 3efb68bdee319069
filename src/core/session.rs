use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of one stream within a session
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StreamId(String);

impl StreamId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for StreamId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Which athlete a stream belongs to
///
/// The primary lane doubles as the reference clock for drift detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaneRole {
    /// The athlete under review; drift reference
    Primary,
    /// The competing athlete
    Opponent,
}

/// Opaque reference to a media resource (URL or local descriptor)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef(String);

impl SourceRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceRef {
    fn from(reference: &str) -> Self {
        Self(reference.to_string())
    }
}

impl From<String> for SourceRef {
    fn from(reference: String) -> Self {
        Self(reference)
    }
}

/// One entry of a session load request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Stream identifier, unique within the session
    pub id: StreamId,

    /// Lane role; exactly one spec per session is `Primary`
    pub role: LaneRole,

    /// Media resource to bind the stream to
    pub source: SourceRef,
}

impl SourceSpec {
    pub fn new(id: impl Into<StreamId>, role: LaneRole, source: impl Into<SourceRef>) -> Self {
        Self {
            id: id.into(),
            role,
            source: source.into(),
        }
    }
}
