// Log groups, streams, and the handle used to append to a stream

use serde::{Deserialize, Serialize};
use std::fmt;

/// Summary of a log group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogGroup {
    pub name: String,
    pub stored_bytes: Option<i64>,
    pub retention_days: Option<i32>,
    /// Milliseconds since the Unix epoch
    pub creation_time: Option<i64>,
}

impl LogGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stored_bytes: None,
            retention_days: None,
            creation_time: None,
        }
    }
}

/// One stream as listed by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStreamInfo {
    pub name: String,
    /// Token required for the next append; absent on a stream never written to
    pub sequence_token: Option<String>,
    /// Milliseconds since the Unix epoch
    pub last_event_timestamp: Option<i64>,
}

/// A resolved stream plus the sequence token for its next append.
///
/// Handles are plain values owned by the caller. A successful append returns a
/// fresh handle; the old one is stale from that point on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamHandle {
    group: String,
    stream: String,
    sequence_token: Option<String>,
}

impl StreamHandle {
    pub fn new(
        group: impl Into<String>,
        stream: impl Into<String>,
        sequence_token: Option<String>,
    ) -> Self {
        Self {
            group: group.into(),
            stream: stream.into(),
            sequence_token,
        }
    }

    pub(crate) fn from_info(group: &str, info: LogStreamInfo) -> Self {
        Self::new(group, info.name, info.sequence_token)
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn sequence_token(&self) -> Option<&str> {
        self.sequence_token.as_deref()
    }

    /// Same stream, next token generation
    pub(crate) fn advance(&self, sequence_token: Option<String>) -> Self {
        Self {
            group: self.group.clone(),
            stream: self.stream.clone(),
            sequence_token,
        }
    }
}

impl fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.stream)
    }
}
