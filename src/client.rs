// Log tail client - stream discovery, paging, and sequenced appends

use crate::backend::{BackendError, EventQuery, LogBackend};
use crate::config::{StreamSelectionPolicy, TailConfig};
use crate::error::{LogTailError, Result};
use crate::logs::{EventPage, LogEvent, LogGroup, LogStreamInfo, StreamHandle};
use std::cmp::Reverse;
use tracing::{debug, info, warn};

/// Client over a [`LogBackend`].
///
/// The client holds no per-stream state. Sequence tokens travel inside the
/// [`StreamHandle`] values it hands out, so two handles for the same stream
/// never silently share a token.
pub struct LogTailClient<B> {
    backend: B,
    policy: StreamSelectionPolicy,
    page_limit: Option<i32>,
    start_from_head: bool,
}

impl<B: LogBackend> LogTailClient<B> {
    /// Create a client using the policy and paging settings from `config`
    pub fn new(backend: B, config: &TailConfig) -> Self {
        Self {
            backend,
            policy: config.stream_selection_policy,
            page_limit: config.page_limit,
            start_from_head: config.start_from_head,
        }
    }

    /// Replace the stream selection policy
    pub fn with_policy(mut self, policy: StreamSelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// List log groups, optionally filtered by name prefix
    pub async fn list_groups(&self, prefix: Option<&str>) -> Result<Vec<LogGroup>> {
        debug!("Listing log groups (prefix: {:?})", prefix);
        self.backend
            .list_groups(prefix)
            .await
            .map_err(|e| backend_failure(format!("{}*", prefix.unwrap_or("")), e))
    }

    /// Resolve the active stream of `group` under the configured policy
    ///
    /// # Returns
    /// * `Ok(StreamHandle)` - Selected stream with its current sequence token
    /// * `Err(LogTailError::GroupNotFound)` - Group is missing or has no streams
    /// * `Err(LogTailError::BackendUnavailable)` - Listing call failed in transit
    /// * `Err(LogTailError::RequestRejected)` - Backend refused the listing call
    pub async fn resolve_active_stream(&self, group: &str) -> Result<StreamHandle> {
        let streams = self.list_streams(group).await?;

        let selected = match self.policy {
            StreamSelectionPolicy::First => streams.into_iter().next(),
            // first listed wins among equal timestamps; streams with no events rank last
            StreamSelectionPolicy::MostRecent => streams
                .into_iter()
                .min_by_key(|s| Reverse(s.last_event_timestamp)),
        }
        .ok_or_else(|| LogTailError::GroupNotFound(group.to_string()))?;

        debug!(
            "Resolved active stream {}/{} (policy: {})",
            group, selected.name, self.policy
        );
        Ok(StreamHandle::from_info(group, selected))
    }

    /// Resolve a stream by explicit name
    ///
    /// # Returns
    /// * `Ok(StreamHandle)` - Named stream with its current sequence token
    /// * `Err(LogTailError::InvalidEvent)` - Stream name is empty
    /// * `Err(LogTailError::StreamNotFound)` - Group has no stream by that name
    pub async fn resolve_stream(&self, group: &str, stream: &str) -> Result<StreamHandle> {
        if stream.is_empty() {
            return Err(LogTailError::InvalidEvent(
                "stream name must not be empty".to_string(),
            ));
        }

        let info = self
            .list_streams(group)
            .await?
            .into_iter()
            .find(|s| s.name == stream)
            .ok_or_else(|| LogTailError::StreamNotFound {
                group: group.to_string(),
                stream: stream.to_string(),
            })?;

        Ok(StreamHandle::from_info(group, info))
    }

    /// Fetch one page of events from `stream`
    ///
    /// Passing the same `page_token` twice without intervening writes yields
    /// the same events.
    pub async fn fetch_page(
        &self,
        stream: &StreamHandle,
        page_token: Option<&str>,
    ) -> Result<EventPage> {
        let query = EventQuery {
            page_token: page_token.map(str::to_string),
            limit: self.page_limit,
            start_from_head: self.start_from_head,
        };

        debug!("Fetching page from {} (token: {:?})", stream, page_token);
        let page = self
            .backend
            .get_events(stream.group(), stream.stream(), &query)
            .await
            .map_err(|e| match e {
                BackendError::NotFound(_) => LogTailError::StreamNotFound {
                    group: stream.group().to_string(),
                    stream: stream.stream().to_string(),
                },
                other => backend_failure(stream.to_string(), other),
            })?;

        debug!("Fetched {} event(s) from {}", page.len(), stream);
        Ok(page)
    }

    /// Walk successive pages of `stream` starting at `page_token`
    pub fn pages(&self, stream: StreamHandle, page_token: Option<String>) -> EventPager<'_, B> {
        EventPager {
            client: self,
            stream,
            page_token,
            exhausted: false,
        }
    }

    /// Publish one event using the handle's sequence token
    ///
    /// On success the returned handle carries the stream's next token and
    /// must be used for the following append. Nothing is retried here.
    ///
    /// # Returns
    /// * `Ok(StreamHandle)` - Updated handle
    /// * `Err(LogTailError::StaleSequenceToken)` - Another writer got there first
    /// * `Err(LogTailError::StreamNotFound)` - Stream no longer exists
    /// * `Err(LogTailError::InvalidEvent)` - Event or stream name failed validation
    pub async fn append_event(
        &self,
        stream: &StreamHandle,
        event: &LogEvent,
    ) -> Result<StreamHandle> {
        event.validate()?;
        if stream.stream().is_empty() {
            return Err(LogTailError::InvalidEvent(
                "stream name must not be empty".to_string(),
            ));
        }

        let next_token = self
            .backend
            .put_event(
                stream.group(),
                stream.stream(),
                event,
                stream.sequence_token(),
            )
            .await
            .map_err(|e| match e {
                BackendError::SequenceTokenMismatch { expected } => {
                    warn!(
                        "Stale sequence token {:?} for {} (backend expects {:?})",
                        stream.sequence_token(),
                        stream,
                        expected
                    );
                    LogTailError::StaleSequenceToken {
                        group: stream.group().to_string(),
                        stream: stream.stream().to_string(),
                    }
                }
                BackendError::NotFound(_) => LogTailError::StreamNotFound {
                    group: stream.group().to_string(),
                    stream: stream.stream().to_string(),
                },
                BackendError::Rejected(reason) => {
                    LogTailError::InvalidEvent(format!("{}: {}", stream, reason))
                }
                other => backend_failure(stream.to_string(), other),
            })?;

        info!("Appended event at {} to {}", event.timestamp, stream);
        Ok(stream.advance(next_token))
    }

    /// Report whether the caller's credentials hold `capability`
    ///
    /// A backend failure is an error, never `false`.
    pub async fn check_permission(&self, capability: &str) -> Result<bool> {
        match self.backend.check_account_permission(capability).await {
            Ok(granted) => {
                debug!("Permission {}: {}", capability, granted);
                Ok(granted)
            }
            Err(e) => {
                warn!("Permission check for {} failed: {}", capability, e);
                Err(LogTailError::PermissionCheckFailed {
                    capability: capability.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn list_streams(&self, group: &str) -> Result<Vec<LogStreamInfo>> {
        if group.is_empty() {
            return Err(LogTailError::GroupNotFound(group.to_string()));
        }

        debug!("Listing streams in {}", group);
        self.backend.list_streams(group).await.map_err(|e| match e {
            BackendError::NotFound(_) => LogTailError::GroupNotFound(group.to_string()),
            other => backend_failure(group, other),
        })
    }
}

/// Map a backend failure with no more specific kind, keeping what it was about
fn backend_failure(target: impl Into<String>, err: BackendError) -> LogTailError {
    let target = target.into();
    match err {
        BackendError::Unavailable(reason) => LogTailError::BackendUnavailable { target, reason },
        other => LogTailError::RequestRejected {
            target,
            reason: other.to_string(),
        },
    }
}

/// Cursor over consecutive pages of one stream.
///
/// Each call to [`EventPager::next_page`] is one backend round trip. The pager
/// ends when the backend returns no further token or repeats the current one,
/// and cannot be rewound; start a new pager to read again.
pub struct EventPager<'a, B> {
    client: &'a LogTailClient<B>,
    stream: StreamHandle,
    page_token: Option<String>,
    exhausted: bool,
}

impl<'a, B: LogBackend> EventPager<'a, B> {
    /// Fetch the next page, or `None` once the stream is exhausted
    pub async fn next_page(&mut self) -> Result<Option<EventPage>> {
        if self.exhausted {
            return Ok(None);
        }

        let page = self
            .client
            .fetch_page(&self.stream, self.page_token.as_deref())
            .await?;

        match &page.next_page_token {
            Some(next) if Some(next) != self.page_token.as_ref() => {
                self.page_token = Some(next.clone());
            }
            _ => self.exhausted = true,
        }

        Ok(Some(page))
    }

    /// Token of the last page boundary reached; resume from here to pick up new events
    pub fn page_token(&self) -> Option<&str> {
        self.page_token.as_deref()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
