// In-process log service with the same token and paging rules as the real one

use super::{BackendError, BackendResult, EventQuery, LogBackend};
use crate::logs::{EventPage, LogEvent, LogGroup, LogStreamInfo};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Events per page when the query sets no limit
const DEFAULT_PAGE_SIZE: usize = 100;

/// Prefix of forward page tokens
const FORWARD_TOKEN_PREFIX: &str = "f/";

#[derive(Debug, Default)]
struct StreamState {
    name: String,
    generation: u64,
    events: Vec<LogEvent>,
}

impl StreamState {
    fn token(&self) -> String {
        format!("T{}", self.generation)
    }

    fn info(&self) -> LogStreamInfo {
        LogStreamInfo {
            name: self.name.clone(),
            sequence_token: Some(self.token()),
            last_event_timestamp: self.events.last().map(|e| e.timestamp),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    // streams keep creation order, which is the listing order
    groups: BTreeMap<String, Vec<StreamState>>,
    denied_capabilities: HashSet<String>,
    reject_permission_check: bool,
    unavailable: bool,
}

impl State {
    fn stream(&self, group: &str, stream: &str) -> BackendResult<&StreamState> {
        self.groups
            .get(group)
            .ok_or_else(|| BackendError::NotFound(format!("log group {}", group)))?
            .iter()
            .find(|s| s.name == stream)
            .ok_or_else(|| BackendError::NotFound(format!("log stream {}/{}", group, stream)))
    }

    fn stream_mut(&mut self, group: &str, stream: &str) -> BackendResult<&mut StreamState> {
        self.groups
            .get_mut(group)
            .ok_or_else(|| BackendError::NotFound(format!("log group {}", group)))?
            .iter_mut()
            .find(|s| s.name == stream)
            .ok_or_else(|| BackendError::NotFound(format!("log stream {}/{}", group, stream)))
    }
}

/// Thread-safe in-memory log service.
///
/// Every stream starts at sequence token `T0`; each accepted append moves it
/// to `T1`, `T2`, and so on. An append presenting any other token is refused.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: RwLock<State>,
    page_size: Option<usize>,
}

impl InMemoryBackend {
    /// Create an empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty backend that serves pages of at most `page_size` events
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: RwLock::new(State::default()),
            page_size: Some(page_size.max(1)),
        }
    }

    /// Create a group if it does not exist yet
    pub fn create_group(&self, group: &str) -> BackendResult<()> {
        let mut state = self.write()?;
        state.groups.entry(group.to_string()).or_default();
        Ok(())
    }

    /// Create a stream (and its group if needed), returning its initial token
    pub fn create_stream(&self, group: &str, stream: &str) -> BackendResult<String> {
        let mut state = self.write()?;
        let streams = state.groups.entry(group.to_string()).or_default();

        if let Some(existing) = streams.iter().find(|s| s.name == stream) {
            return Ok(existing.token());
        }

        let created = StreamState {
            name: stream.to_string(),
            ..StreamState::default()
        };
        let token = created.token();
        streams.push(created);
        Ok(token)
    }

    /// Snapshot of every event stored in a stream
    pub fn events(&self, group: &str, stream: &str) -> BackendResult<Vec<LogEvent>> {
        let state = self.read()?;
        Ok(state.stream(group, stream)?.events.clone())
    }

    /// Make `check_account_permission` answer `false` for `capability`
    pub fn deny_capability(&self, capability: &str) -> BackendResult<()> {
        self.write()?
            .denied_capabilities
            .insert(capability.to_string());
        Ok(())
    }

    /// Make every permission check fail outright, as an access-denied response would
    pub fn reject_permission_checks(&self, reject: bool) -> BackendResult<()> {
        self.write()?.reject_permission_check = reject;
        Ok(())
    }

    /// Simulate a transport outage for all calls
    pub fn set_unavailable(&self, unavailable: bool) -> BackendResult<()> {
        // bypass the availability check so the outage can be lifted again
        let mut state = self
            .state
            .write()
            .map_err(|_| BackendError::Unavailable("state lock poisoned".to_string()))?;
        state.unavailable = unavailable;
        Ok(())
    }

    fn read(&self) -> BackendResult<RwLockReadGuard<'_, State>> {
        let state = self
            .state
            .read()
            .map_err(|_| BackendError::Unavailable("state lock poisoned".to_string()))?;
        if state.unavailable {
            return Err(BackendError::Unavailable("connection refused".to_string()));
        }
        Ok(state)
    }

    fn write(&self) -> BackendResult<RwLockWriteGuard<'_, State>> {
        let state = self
            .state
            .write()
            .map_err(|_| BackendError::Unavailable("state lock poisoned".to_string()))?;
        if state.unavailable {
            return Err(BackendError::Unavailable("connection refused".to_string()));
        }
        Ok(state)
    }

    fn page_size(&self, query: &EventQuery) -> usize {
        match query.limit {
            Some(limit) if limit > 0 => limit as usize,
            _ => self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        }
    }
}

fn parse_page_token(token: &str) -> BackendResult<usize> {
    token
        .strip_prefix(FORWARD_TOKEN_PREFIX)
        .and_then(|offset| offset.parse().ok())
        .ok_or_else(|| BackendError::Rejected(format!("invalid page token: {}", token)))
}

#[async_trait]
impl LogBackend for InMemoryBackend {
    async fn list_groups(&self, prefix: Option<&str>) -> BackendResult<Vec<LogGroup>> {
        let state = self.read()?;
        Ok(state
            .groups
            .keys()
            .filter(|name| prefix.map_or(true, |p| name.starts_with(p)))
            .map(|name| LogGroup::new(name.as_str()))
            .collect())
    }

    async fn list_streams(&self, group: &str) -> BackendResult<Vec<LogStreamInfo>> {
        let state = self.read()?;
        let streams = state
            .groups
            .get(group)
            .ok_or_else(|| BackendError::NotFound(format!("log group {}", group)))?;
        Ok(streams.iter().map(StreamState::info).collect())
    }

    async fn get_events(
        &self,
        group: &str,
        stream: &str,
        query: &EventQuery,
    ) -> BackendResult<EventPage> {
        let state = self.read()?;
        let events = &state.stream(group, stream)?.events;
        let page_size = self.page_size(query);

        let start = match query.page_token.as_deref() {
            Some(token) => parse_page_token(token)?.min(events.len()),
            None if query.start_from_head => 0,
            None => events.len().saturating_sub(page_size),
        };
        let end = (start + page_size).min(events.len());

        // a page that made no progress ends the sequence
        let next_page_token = if end > start {
            Some(format!("{}{}", FORWARD_TOKEN_PREFIX, end))
        } else {
            None
        };

        Ok(EventPage::new(events[start..end].to_vec(), next_page_token))
    }

    async fn put_event(
        &self,
        group: &str,
        stream: &str,
        event: &LogEvent,
        sequence_token: Option<&str>,
    ) -> BackendResult<Option<String>> {
        let mut state = self.write()?;
        let target = state.stream_mut(group, stream)?;

        let current = target.token();
        if sequence_token != Some(current.as_str()) {
            return Err(BackendError::SequenceTokenMismatch {
                expected: Some(current),
            });
        }

        // keep the stream ordered by timestamp; equal timestamps stay in arrival order
        let position = target
            .events
            .partition_point(|e| e.timestamp <= event.timestamp);
        target.events.insert(position, event.clone());
        target.generation += 1;

        Ok(Some(target.token()))
    }

    async fn check_account_permission(&self, capability: &str) -> BackendResult<bool> {
        let state = self.read()?;
        if state.reject_permission_check {
            return Err(BackendError::Rejected(format!(
                "AccessDenied: not authorized to perform {}",
                capability
            )));
        }
        Ok(!state.denied_capabilities.contains(capability))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(timestamp: i64, message: &str) -> LogEvent {
        LogEvent::new(timestamp, message).unwrap()
    }

    #[tokio::test]
    async fn test_create_stream_starts_at_t0() {
        let backend = InMemoryBackend::new();
        let token = backend.create_stream("test-logs", "app").unwrap();
        assert_eq!(token, "T0");

        let streams = backend.list_streams("test-logs").await.unwrap();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].sequence_token.as_deref(), Some("T0"));
        assert_eq!(streams[0].last_event_timestamp, None);
    }

    #[tokio::test]
    async fn test_put_event_advances_token() {
        let backend = InMemoryBackend::new();
        backend.create_stream("g", "s").unwrap();

        let next = backend
            .put_event("g", "s", &event(1000, "hello"), Some("T0"))
            .await
            .unwrap();
        assert_eq!(next.as_deref(), Some("T1"));

        let streams = backend.list_streams("g").await.unwrap();
        assert_eq!(streams[0].last_event_timestamp, Some(1000));
    }

    #[tokio::test]
    async fn test_put_event_stale_token_is_refused() {
        let backend = InMemoryBackend::new();
        backend.create_stream("g", "s").unwrap();
        backend
            .put_event("g", "s", &event(1000, "first"), Some("T0"))
            .await
            .unwrap();

        let result = backend
            .put_event("g", "s", &event(2000, "second"), Some("T0"))
            .await;
        assert_eq!(
            result,
            Err(BackendError::SequenceTokenMismatch {
                expected: Some("T1".to_string())
            })
        );
        assert_eq!(backend.events("g", "s").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_events_kept_in_timestamp_order() {
        let backend = InMemoryBackend::new();
        backend.create_stream("g", "s").unwrap();
        backend.put_event("g", "s", &event(3000, "c"), Some("T0")).await.unwrap();
        backend.put_event("g", "s", &event(1000, "a"), Some("T1")).await.unwrap();
        backend.put_event("g", "s", &event(2000, "b"), Some("T2")).await.unwrap();

        let messages: Vec<String> = backend
            .events("g", "s")
            .unwrap()
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_paging_forward() {
        let backend = InMemoryBackend::with_page_size(2);
        backend.create_stream("g", "s").unwrap();
        for i in 0..3 {
            let token = format!("T{}", i);
            backend
                .put_event("g", "s", &event(i * 10, "m"), Some(token.as_str()))
                .await
                .unwrap();
        }

        let query = EventQuery {
            start_from_head: true,
            ..EventQuery::default()
        };
        let first = backend.get_events("g", "s", &query).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first.next_page_token.as_deref(), Some("f/2"));

        let second = backend
            .get_events(
                "g",
                "s",
                &EventQuery {
                    page_token: first.next_page_token.clone(),
                    ..query.clone()
                },
            )
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second.next_page_token.as_deref(), Some("f/3"));

        let third = backend
            .get_events(
                "g",
                "s",
                &EventQuery {
                    page_token: second.next_page_token.clone(),
                    ..query
                },
            )
            .await
            .unwrap();
        assert!(third.is_empty());
        assert_eq!(third.next_page_token, None);
    }

    #[tokio::test]
    async fn test_tail_without_token_returns_newest_page() {
        let backend = InMemoryBackend::with_page_size(2);
        backend.create_stream("g", "s").unwrap();
        for i in 0..5 {
            let token = format!("T{}", i);
            backend
                .put_event("g", "s", &event(i, &format!("m{}", i)), Some(token.as_str()))
                .await
                .unwrap();
        }

        let page = backend
            .get_events("g", "s", &EventQuery::default())
            .await
            .unwrap();
        let messages: Vec<&str> = page.events.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(messages, vec!["m3", "m4"]);
    }

    #[tokio::test]
    async fn test_invalid_page_token_is_rejected() {
        let backend = InMemoryBackend::new();
        backend.create_stream("g", "s").unwrap();
        let query = EventQuery {
            page_token: Some("bogus".to_string()),
            ..EventQuery::default()
        };
        let result = backend.get_events("g", "s", &query).await;
        assert!(matches!(result, Err(BackendError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_missing_group_and_stream() {
        let backend = InMemoryBackend::new();
        assert!(matches!(
            backend.list_streams("nope").await,
            Err(BackendError::NotFound(_))
        ));

        backend.create_group("g").unwrap();
        assert!(backend.list_streams("g").await.unwrap().is_empty());
        assert!(matches!(
            backend.get_events("g", "s", &EventQuery::default()).await,
            Err(BackendError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_groups_with_prefix() {
        let backend = InMemoryBackend::new();
        backend.create_group("/aws/lambda/a").unwrap();
        backend.create_group("/aws/lambda/b").unwrap();
        backend.create_group("test-logs").unwrap();

        let all = backend.list_groups(None).await.unwrap();
        assert_eq!(all.len(), 3);

        let lambda = backend.list_groups(Some("/aws/lambda/")).await.unwrap();
        assert_eq!(lambda.len(), 2);
    }

    #[tokio::test]
    async fn test_permission_checks() {
        let backend = InMemoryBackend::new();
        assert_eq!(
            backend.check_account_permission("iam:GetAccountSummary").await,
            Ok(true)
        );

        backend.deny_capability("logs:PutLogEvents").unwrap();
        assert_eq!(
            backend.check_account_permission("logs:PutLogEvents").await,
            Ok(false)
        );

        backend.reject_permission_checks(true).unwrap();
        assert!(matches!(
            backend.check_account_permission("iam:GetAccountSummary").await,
            Err(BackendError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_outage_and_recovery() {
        let backend = InMemoryBackend::new();
        backend.create_stream("g", "s").unwrap();

        backend.set_unavailable(true).unwrap();
        assert!(matches!(
            backend.list_streams("g").await,
            Err(BackendError::Unavailable(_))
        ));

        backend.set_unavailable(false).unwrap();
        assert!(backend.list_streams("g").await.is_ok());
    }
}
