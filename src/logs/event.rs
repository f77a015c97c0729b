// Log events and pages of events

use crate::error::{LogTailError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A single log event: a timestamp and an opaque message payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Message payload; never parsed by the client
    pub message: String,
}

impl LogEvent {
    /// Create a validated event
    ///
    /// # Returns
    /// * `Ok(LogEvent)` - Timestamp is non-negative and message is non-empty
    /// * `Err(LogTailError::InvalidEvent)` - Otherwise
    pub fn new(timestamp: i64, message: impl Into<String>) -> Result<Self> {
        let event = Self {
            timestamp,
            message: message.into(),
        };
        event.validate()?;
        Ok(event)
    }

    /// Create an event stamped with the current wall-clock time
    pub fn now(message: impl Into<String>) -> Result<Self> {
        Self::new(Utc::now().timestamp_millis(), message)
    }

    /// Check the constraints the client enforces before publishing
    pub fn validate(&self) -> Result<()> {
        if self.timestamp < 0 {
            return Err(LogTailError::InvalidEvent(format!(
                "timestamp must not be negative, got {}",
                self.timestamp
            )));
        }

        if self.message.is_empty() {
            return Err(LogTailError::InvalidEvent(
                "message must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// One page of events from a stream, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPage {
    pub events: Vec<LogEvent>,
    /// Token for the following page; `None` once the stream is exhausted
    pub next_page_token: Option<String>,
}

impl EventPage {
    pub fn new(events: Vec<LogEvent>, next_page_token: Option<String>) -> Self {
        Self {
            events,
            next_page_token,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_valid_event() {
        let event = LogEvent::new(1000, "hello").unwrap();
        assert_eq!(event.timestamp, 1000);
        assert_eq!(event.message, "hello");
    }

    #[test]
    fn test_new_rejects_negative_timestamp() {
        let result = LogEvent::new(-1, "hello");
        assert!(matches!(result, Err(LogTailError::InvalidEvent(_))));
    }

    #[test]
    fn test_new_rejects_empty_message() {
        let result = LogEvent::new(1000, "");
        assert!(matches!(result, Err(LogTailError::InvalidEvent(_))));
    }

    #[test]
    fn test_zero_timestamp_is_valid() {
        assert!(LogEvent::new(0, "epoch").is_ok());
    }

    #[test]
    fn test_now_is_recent() {
        let before = Utc::now().timestamp_millis();
        let event = LogEvent::now("{ \"key1\": \"value11\" }").unwrap();
        assert!(event.timestamp >= before);
    }

    #[test]
    fn test_event_page_len() {
        let page = EventPage::new(vec![LogEvent::new(1, "a").unwrap()], None);
        assert_eq!(page.len(), 1);
        assert!(!page.is_empty());
        assert!(EventPage::default().is_empty());
    }
}
