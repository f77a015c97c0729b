// CloudWatch Logs backend built on the AWS SDK

use super::{BackendError, BackendResult, EventQuery, LogBackend};
use crate::config::TailConfig;
use crate::logs::{EventPage, LogEvent, LogGroup, LogStreamInfo};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_cloudwatchlogs as cloudwatchlogs;
use aws_sdk_cloudwatchlogs::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_cloudwatchlogs::operation::put_log_events::PutLogEventsError;
use aws_sdk_cloudwatchlogs::types::{InputLogEvent, OutputLogEvent};
use aws_types::region::Region;
use std::fmt::Debug;
use tracing::{debug, warn};

/// IAM is a global service; its endpoint lives in us-east-1
const IAM_REGION: &str = "us-east-1";

/// Capability proven by a successful GetAccountSummary call
pub const ACCOUNT_SUMMARY_CAPABILITY: &str = "iam:GetAccountSummary";

/// LogBackend over CloudWatch Logs, with IAM for the permission smoke test
#[derive(Clone)]
pub struct AwsLogBackend {
    logs: cloudwatchlogs::Client,
    iam: aws_sdk_iam::Client,
}

impl AwsLogBackend {
    /// Build SDK clients from the configuration.
    ///
    /// Credentials come from the default provider chain (environment
    /// variables, shared profile, instance role).
    pub async fn from_config(config: &TailConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &config.profile {
            loader = loader.profile_name(profile);
        }

        let sdk_config = loader.load().await;
        debug!(
            "Loaded AWS config for region {:?}",
            sdk_config.region()
        );

        let iam_config = aws_sdk_iam::config::Builder::from(&sdk_config)
            .region(Region::new(IAM_REGION))
            .build();

        Self {
            logs: cloudwatchlogs::Client::new(&sdk_config),
            iam: aws_sdk_iam::Client::from_conf(iam_config),
        }
    }
}

/// Map an SDK failure onto the backend error kinds
fn classify<E, R>(err: SdkError<E, R>) -> BackendError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: Debug,
{
    match &err {
        SdkError::ServiceError(service_err) => {
            let error_code = service_err.err().code().unwrap_or("Unknown");
            let error_message = service_err.err().message().unwrap_or("No message");
            classify_code(error_code, error_message)
        }
        SdkError::TimeoutError(_) => BackendError::Unavailable("request timed out".to_string()),
        _ => BackendError::Unavailable(err.to_string()),
    }
}

fn classify_code(code: &str, message: &str) -> BackendError {
    let detail = format!("{} - {}", code, message);
    match code {
        "ResourceNotFoundException" => BackendError::NotFound(detail),
        "InvalidSequenceTokenException" | "DataAlreadyAcceptedException" => {
            BackendError::SequenceTokenMismatch { expected: None }
        }
        "ServiceUnavailableException"
        | "ThrottlingException"
        | "LimitExceededException"
        | "RequestTimeout"
        | "InternalFailure" => BackendError::Unavailable(detail),
        _ => BackendError::Rejected(detail),
    }
}

/// GetLogEvents hands back the request token once a stream is exhausted
fn next_token(requested: Option<&str>, returned: Option<&str>) -> Option<String> {
    match returned {
        Some(token) if Some(token) != requested => Some(token.to_string()),
        _ => None,
    }
}

#[async_trait]
impl LogBackend for AwsLogBackend {
    async fn list_groups(&self, prefix: Option<&str>) -> BackendResult<Vec<LogGroup>> {
        let response = self
            .logs
            .describe_log_groups()
            .set_log_group_name_prefix(prefix.map(str::to_string))
            .send()
            .await
            .map_err(classify)?;

        Ok(response
            .log_groups()
            .iter()
            .filter_map(|group| {
                group.log_group_name().map(|name| LogGroup {
                    name: name.to_string(),
                    stored_bytes: group.stored_bytes(),
                    retention_days: group.retention_in_days(),
                    creation_time: group.creation_time(),
                })
            })
            .collect())
    }

    async fn list_streams(&self, group: &str) -> BackendResult<Vec<LogStreamInfo>> {
        let response = self
            .logs
            .describe_log_streams()
            .log_group_name(group)
            .send()
            .await
            .map_err(classify)?;

        Ok(response
            .log_streams()
            .iter()
            .filter_map(|stream| {
                stream.log_stream_name().map(|name| LogStreamInfo {
                    name: name.to_string(),
                    sequence_token: stream.upload_sequence_token().map(str::to_string),
                    last_event_timestamp: stream.last_event_timestamp(),
                })
            })
            .collect())
    }

    async fn get_events(
        &self,
        group: &str,
        stream: &str,
        query: &EventQuery,
    ) -> BackendResult<EventPage> {
        let response = self
            .logs
            .get_log_events()
            .log_group_name(group)
            .log_stream_name(stream)
            .set_next_token(query.page_token.clone())
            .set_limit(query.limit)
            .start_from_head(query.start_from_head)
            .send()
            .await
            .map_err(classify)?;

        let events: Vec<LogEvent> = response.events().iter().filter_map(to_log_event).collect();
        let skipped = response.events().len() - events.len();
        if skipped > 0 {
            warn!(
                "Skipped {} event(s) without a timestamp in {}/{}",
                skipped, group, stream
            );
        }

        Ok(EventPage::new(
            events,
            next_token(
                query.page_token.as_deref(),
                response.next_forward_token(),
            ),
        ))
    }

    async fn put_event(
        &self,
        group: &str,
        stream: &str,
        event: &LogEvent,
        sequence_token: Option<&str>,
    ) -> BackendResult<Option<String>> {
        let input = InputLogEvent::builder()
            .timestamp(event.timestamp)
            .message(event.message.clone())
            .build()
            .map_err(|e| BackendError::Rejected(format!("invalid log event: {}", e)))?;

        let response = self
            .logs
            .put_log_events()
            .log_group_name(group)
            .log_stream_name(stream)
            .log_events(input)
            .set_sequence_token(sequence_token.map(str::to_string))
            .send()
            .await
            .map_err(|err| {
                let expected = match err.as_service_error() {
                    Some(PutLogEventsError::InvalidSequenceTokenException(e)) => {
                        Some(e.expected_sequence_token().map(str::to_string))
                    }
                    Some(PutLogEventsError::DataAlreadyAcceptedException(e)) => {
                        Some(e.expected_sequence_token().map(str::to_string))
                    }
                    _ => None,
                };
                match expected {
                    Some(expected) => BackendError::SequenceTokenMismatch { expected },
                    None => classify(err),
                }
            })?;

        if let Some(rejected) = response.rejected_log_events_info() {
            return Err(BackendError::Rejected(format!(
                "event rejected by service (too old: {:?}, too new: {:?}, expired: {:?})",
                rejected.too_old_log_event_end_index(),
                rejected.too_new_log_event_start_index(),
                rejected.expired_log_event_end_index()
            )));
        }

        Ok(response.next_sequence_token().map(str::to_string))
    }

    async fn check_account_permission(&self, capability: &str) -> BackendResult<bool> {
        ensure_supported_capability(capability)?;
        debug!("Checking account permission via GetAccountSummary for {}", capability);
        self.iam
            .get_account_summary()
            .send()
            .await
            .map_err(classify)?;
        Ok(true)
    }
}

/// Only GetAccountSummary is called, so no other capability can be vouched for
fn ensure_supported_capability(capability: &str) -> BackendResult<()> {
    if capability == ACCOUNT_SUMMARY_CAPABILITY {
        Ok(())
    } else {
        Err(BackendError::Rejected(format!(
            "unsupported capability '{}'; only {} can be checked",
            capability, ACCOUNT_SUMMARY_CAPABILITY
        )))
    }
}

fn to_log_event(event: &OutputLogEvent) -> Option<LogEvent> {
    Some(LogEvent {
        timestamp: event.timestamp()?,
        message: event.message().unwrap_or_default().to_string(),
    })
}
