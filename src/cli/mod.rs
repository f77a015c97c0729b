// CLI module - User-facing command-line interface

mod output;

pub use output::print_error;

use crate::backend::{AwsLogBackend, LogBackend, ACCOUNT_SUMMARY_CAPABILITY};
use crate::client::LogTailClient;
use crate::config::{StreamSelectionPolicy, TailConfig};
use crate::error::{LogTailError, Result};
use crate::logs::{LogEvent, StreamHandle};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Payload written by the smoke test
const SMOKE_TEST_MESSAGE: &str = "{ \"key1\": \"value11\", \"key2\": \"value2\" }";

/// Delay between polls in follow mode
const FOLLOW_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Logtail - read and write cloud log streams
#[derive(Parser)]
#[command(name = "logtail")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (.toml or .json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend region (overrides AWS_REGION)
    #[arg(long, global = true)]
    region: Option<String>,

    /// Credentials profile (overrides AWS_PROFILE)
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Active stream selection policy: first | most-recent
    #[arg(long, global = true)]
    policy: Option<StreamSelectionPolicy>,

    /// Maximum events per page
    #[arg(long, global = true)]
    limit: Option<i32>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List log groups
    ListGroups {
        /// Only list groups whose name starts with this prefix
        #[arg(short, long)]
        prefix: Option<String>,
    },

    /// Print events from the active stream of a group
    Tail {
        /// Log group (defaults to AWS_LOG_GROUP / config)
        group: Option<String>,

        /// Continue from a page token printed by an earlier run
        #[arg(short = 't', long)]
        page_token: Option<String>,

        /// Number of pages to print
        #[arg(short = 'n', long, default_value = "1")]
        pages: usize,

        /// Keep polling for new events until interrupted
        #[arg(short, long)]
        follow: bool,
    },

    /// Append one event to a stream
    Write {
        /// Log group
        group: String,

        /// Message payload
        message: String,

        /// Stream to write to (defaults to the group's active stream)
        #[arg(short, long)]
        stream: Option<String>,

        /// Event timestamp in milliseconds since the epoch (defaults to now)
        #[arg(long)]
        timestamp: Option<i64>,
    },

    /// Check that the current credentials hold a capability
    CheckPermission {
        /// Capability to check
        #[arg(default_value = ACCOUNT_SUMMARY_CAPABILITY)]
        capability: String,
    },

    /// Check permissions, write a synthetic event, then read the stream back
    SmokeTest {
        /// Log group (defaults to AWS_LOG_GROUP / config)
        group: Option<String>,
    },
}

impl Cli {
    /// Whether debug logging was requested
    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Execute the parsed command
    pub async fn execute(&self) -> Result<()> {
        let config = self.load_config()?;
        let backend = AwsLogBackend::from_config(&config).await;
        let client = LogTailClient::new(backend, &config);
        self.dispatch(&client, &config).await
    }

    /// Build the effective configuration: file, then environment, then flags
    fn load_config(&self) -> Result<TailConfig> {
        let mut config = match &self.config {
            Some(path) => TailConfig::from_file(path)?,
            None => TailConfig::default(),
        };

        config.apply_env();
        self.apply_overrides(&mut config);
        config.validate()?;

        Ok(config)
    }

    fn apply_overrides(&self, config: &mut TailConfig) {
        if let Some(region) = &self.region {
            config.region = Some(region.clone());
        }
        if let Some(profile) = &self.profile {
            config.profile = Some(profile.clone());
        }
        if let Some(policy) = self.policy {
            config.stream_selection_policy = policy;
        }
        if let Some(limit) = self.limit {
            config.page_limit = Some(limit);
        }
    }

    /// Run the command against any backend
    async fn dispatch<B: LogBackend>(
        &self,
        client: &LogTailClient<B>,
        config: &TailConfig,
    ) -> Result<()> {
        match &self.command {
            Commands::ListGroups { prefix } => {
                let pb = output::create_progress_bar("Listing log groups...");
                let groups = client.list_groups(prefix.as_deref()).await;
                pb.finish_and_clear();
                output::print_groups(&groups?);
                Ok(())
            }

            Commands::Tail {
                group,
                page_token,
                pages,
                follow,
            } => {
                let group = config.group_or_default(group.as_deref())?;
                let handle = client.resolve_active_stream(&group).await?;
                output::print_stream_header(&handle);

                if *follow {
                    follow_stream(client, &handle, page_token.clone()).await
                } else {
                    print_pages(client, handle, page_token.clone(), *pages).await
                }
            }

            Commands::Write {
                group,
                message,
                stream,
                timestamp,
            } => {
                let event = match timestamp {
                    Some(ts) => LogEvent::new(*ts, message.as_str())?,
                    None => LogEvent::now(message.as_str())?,
                };

                let handle = match stream {
                    Some(stream) => client.resolve_stream(group, stream).await?,
                    None => client.resolve_active_stream(group).await?,
                };

                let next = client.append_event(&handle, &event).await?;
                output::print_appended(&next, &event);
                Ok(())
            }

            Commands::CheckPermission { capability } => {
                let granted = client.check_permission(capability).await?;
                output::print_permission(capability, granted);
                Ok(())
            }

            Commands::SmokeTest { group } => {
                let group = config.group_or_default(group.as_deref())?;
                smoke_test(client, &group).await
            }
        }
    }
}

/// Print up to `pages` pages, then the token to continue from
async fn print_pages<B: LogBackend>(
    client: &LogTailClient<B>,
    handle: StreamHandle,
    page_token: Option<String>,
    pages: usize,
) -> Result<()> {
    let mut pager = client.pages(handle, page_token);
    let mut printed = 0;

    for _ in 0..pages.max(1) {
        match pager.next_page().await? {
            Some(page) => {
                printed += page.len();
                output::print_events(&page.events);
            }
            None => break,
        }
    }

    output::print_page_summary(printed, pager.page_token(), pager.is_exhausted());
    Ok(())
}

/// Poll the stream for new events until Ctrl-C
async fn follow_stream<B: LogBackend>(
    client: &LogTailClient<B>,
    handle: &StreamHandle,
    page_token: Option<String>,
) -> Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || stop_flag.store(true, Ordering::SeqCst)) {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }

    output::print_info("Following stream, press Ctrl-C to stop");

    let mut cursor = page_token;
    while !stop.load(Ordering::SeqCst) {
        let page = client.fetch_page(handle, cursor.as_deref()).await?;
        output::print_events(&page.events);

        if let Some(next) = page.next_page_token {
            cursor = Some(next);
        }

        if page.events.is_empty() {
            tokio::time::sleep(FOLLOW_POLL_INTERVAL).await;
        }
    }

    output::print_page_summary(0, cursor.as_deref(), false);
    Ok(())
}

/// Permission check, one synthetic write, one page read back
async fn smoke_test<B: LogBackend>(client: &LogTailClient<B>, group: &str) -> Result<()> {
    let pb = output::create_progress_bar("Checking permissions...");
    match client.check_permission(ACCOUNT_SUMMARY_CAPABILITY).await {
        Ok(true) => output::finish_progress_success(pb, "Permission check passed"),
        Ok(false) => {
            output::finish_progress_error(pb, "Permission not granted");
            return Err(LogTailError::PermissionCheckFailed {
                capability: ACCOUNT_SUMMARY_CAPABILITY.to_string(),
                reason: "capability not granted".to_string(),
            });
        }
        Err(e) => {
            output::finish_progress_error(pb, e.kind());
            return Err(e);
        }
    }

    let event = LogEvent::now(SMOKE_TEST_MESSAGE)?;
    let pb = output::create_progress_bar("Writing event...");
    let handle = match write_event(client, group, &event).await {
        Ok(handle) => {
            output::finish_progress_success(pb, &format!("Wrote event to {}", handle));
            handle
        }
        Err(e) => {
            output::finish_progress_error(pb, e.kind());
            return Err(e);
        }
    };

    let page = client.fetch_page(&handle, None).await?;
    output::print_events(&page.events);
    if page.events.contains(&event) {
        output::print_success_msg("Written event read back");
    } else {
        output::print_info("Written event is not on the first page of the stream");
    }

    Ok(())
}

async fn write_event<B: LogBackend>(
    client: &LogTailClient<B>,
    group: &str,
    event: &LogEvent,
) -> Result<StreamHandle> {
    let handle = client.resolve_active_stream(group).await?;
    client.append_event(&handle, event).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    fn seeded_client() -> LogTailClient<InMemoryBackend> {
        let backend = InMemoryBackend::new();
        backend.create_stream("test-logs", "app").unwrap();
        LogTailClient::new(backend, &TailConfig::default())
    }

    #[test]
    fn test_parse_global_overrides() {
        let cli = parse(&[
            "logtail",
            "--region",
            "eu-west-1",
            "--policy",
            "most-recent",
            "--limit",
            "25",
            "tail",
            "test-logs",
        ]);

        let mut config = TailConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.region.as_deref(), Some("eu-west-1"));
        assert_eq!(
            config.stream_selection_policy,
            StreamSelectionPolicy::MostRecent
        );
        assert_eq!(config.page_limit, Some(25));
    }

    #[test]
    fn test_parse_rejects_unknown_policy() {
        let result = Cli::try_parse_from(["logtail", "--policy", "busiest", "list-groups"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_check_permission_default_capability() {
        let cli = parse(&["logtail", "check-permission"]);
        match cli.command {
            Commands::CheckPermission { capability } => {
                assert_eq!(capability, ACCOUNT_SUMMARY_CAPABILITY)
            }
            _ => panic!("expected check-permission"),
        }
    }

    #[tokio::test]
    async fn test_write_then_tail() {
        let client = seeded_client();
        let config = TailConfig::default();

        parse(&["logtail", "write", "test-logs", "hello", "--timestamp", "1000"])
            .dispatch(&client, &config)
            .await
            .unwrap();

        let events = client.backend().events("test-logs", "app").unwrap();
        assert_eq!(events, vec![LogEvent::new(1000, "hello").unwrap()]);

        parse(&["logtail", "tail", "test-logs", "--pages", "2"])
            .dispatch(&client, &config)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_write_to_unknown_stream() {
        let client = seeded_client();
        let result = parse(&["logtail", "write", "test-logs", "hi", "--stream", "other"])
            .dispatch(&client, &TailConfig::default())
            .await;
        assert!(matches!(result, Err(LogTailError::StreamNotFound { .. })));
    }

    #[tokio::test]
    async fn test_tail_without_group_needs_config() {
        let client = seeded_client();
        let result = parse(&["logtail", "tail"])
            .dispatch(&client, &TailConfig::default())
            .await;
        assert!(matches!(result, Err(LogTailError::MissingConfigField(_))));

        let config = TailConfig {
            log_group_name: Some("test-logs".to_string()),
            ..TailConfig::default()
        };
        assert!(parse(&["logtail", "tail"])
            .dispatch(&client, &config)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_smoke_test_writes_synthetic_event() {
        let client = seeded_client();
        parse(&["logtail", "smoke-test", "test-logs"])
            .dispatch(&client, &TailConfig::default())
            .await
            .unwrap();

        let events = client.backend().events("test-logs", "app").unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].message, SMOKE_TEST_MESSAGE);
    }

    #[tokio::test]
    async fn test_smoke_test_stops_on_rejected_permission() {
        let client = seeded_client();
        client.backend().reject_permission_checks(true).unwrap();

        let result = parse(&["logtail", "smoke-test", "test-logs"])
            .dispatch(&client, &TailConfig::default())
            .await;
        assert!(matches!(
            result,
            Err(LogTailError::PermissionCheckFailed { .. })
        ));
        assert!(client.backend().events("test-logs", "app").unwrap().is_empty());
    }
}
