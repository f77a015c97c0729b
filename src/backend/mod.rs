// Backend module - The cloud log service seen through a narrow trait

mod aws;
mod memory;

pub use aws::{AwsLogBackend, ACCOUNT_SUMMARY_CAPABILITY};
pub use memory::InMemoryBackend;

use crate::logs::{EventPage, LogEvent, LogGroup, LogStreamInfo};
use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by a backend, before the client attaches group/stream context
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The named group or stream does not exist
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The presented sequence token is not the stream's current one
    #[error("sequence token mismatch (expected {expected:?})")]
    SequenceTokenMismatch { expected: Option<String> },

    /// The service understood the request and refused it
    #[error("request rejected: {0}")]
    Rejected(String),

    /// Transport, throttling, or service-side failure
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Parameters for reading one page of events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQuery {
    /// Continuation token from a previous page
    pub page_token: Option<String>,
    /// Maximum number of events to return
    pub limit: Option<i32>,
    /// Start at the oldest event rather than the newest
    pub start_from_head: bool,
}

/// Capabilities the client needs from a log service
#[async_trait]
pub trait LogBackend: Send + Sync {
    /// List log groups, optionally restricted to a name prefix
    async fn list_groups(&self, prefix: Option<&str>) -> BackendResult<Vec<LogGroup>>;

    /// List the streams of a group in the backend's default order
    async fn list_streams(&self, group: &str) -> BackendResult<Vec<LogStreamInfo>>;

    /// Read one page of events, oldest first within the page
    async fn get_events(
        &self,
        group: &str,
        stream: &str,
        query: &EventQuery,
    ) -> BackendResult<EventPage>;

    /// Append one event, returning the stream's next sequence token
    async fn put_event(
        &self,
        group: &str,
        stream: &str,
        event: &LogEvent,
        sequence_token: Option<&str>,
    ) -> BackendResult<Option<String>>;

    /// Single read-only call proving the caller's credentials hold `capability`
    async fn check_account_permission(&self, capability: &str) -> BackendResult<bool>;
}
