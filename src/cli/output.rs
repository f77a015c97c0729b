// Output formatting and display for CLI

use crate::error::LogTailError;
use crate::logs::{LogEvent, LogGroup, StreamHandle};
use chrono::{DateTime, Local, TimeZone};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};

/// Print an error as a one-line diagnostic naming its kind
pub fn print_error(error: &LogTailError) {
    eprintln!("{}", diagnostic(error).red().bold());
}

/// One-line diagnostic naming the error kind and what it concerns
fn diagnostic(error: &LogTailError) -> String {
    format!("✗ {}: {}", error.kind(), error)
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a success message
pub fn print_success_msg(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a formatted table of log groups
pub fn print_groups(groups: &[LogGroup]) {
    if groups.is_empty() {
        println!("{}", "No log groups found".yellow());
        return;
    }

    #[derive(Tabled)]
    struct GroupRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Stored")]
        stored: String,
        #[tabled(rename = "Retention")]
        retention: String,
        #[tabled(rename = "Created")]
        created: String,
    }

    let rows: Vec<GroupRow> = groups
        .iter()
        .map(|g| GroupRow {
            name: truncate(&g.name, 60),
            stored: g
                .stored_bytes
                .map(|b| format_bytes(b.max(0) as u64))
                .unwrap_or_else(|| "-".to_string()),
            retention: format_retention(g.retention_days),
            created: g
                .creation_time
                .and_then(format_millis)
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    println!("\n{}\n", table);
    println!(
        "{}",
        format!("Total: {} log group(s)", groups.len())
            .dimmed()
            .italic()
    );
}

/// Print which stream is being read
pub fn print_stream_header(handle: &StreamHandle) {
    println!("\n{} {}", "Stream".bold().underline(), handle.to_string().cyan());
    println!();
}

/// Print events with timestamps
pub fn print_events(events: &[LogEvent]) {
    for event in events {
        let stamp = format_millis(event.timestamp).unwrap_or_else(|| event.timestamp.to_string());
        println!("{} {}", format!("[{}]", stamp).dimmed(), event.message);
    }
}

/// Print how many events were shown and where to continue
pub fn print_page_summary(printed: usize, next_token: Option<&str>, exhausted: bool) {
    if printed == 0 && exhausted {
        println!("{}", "No events available".yellow());
    }

    match continuation(next_token, exhausted) {
        Continuation::NextPage(token) => println!(
            "\n  {}: {}",
            "Next page token".bold(),
            token.dimmed()
        ),
        Continuation::End(resume) => {
            println!("\n{}", "End of stream".dimmed().italic());
            if let Some(token) = resume {
                println!("  {}: {}", "Resume token".bold(), token.dimmed());
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Continuation<'a> {
    NextPage(&'a str),
    /// No more pages now; the token, if any, picks up events written later
    End(Option<&'a str>),
}

fn continuation(next_token: Option<&str>, exhausted: bool) -> Continuation<'_> {
    match next_token {
        Some(token) if !exhausted => Continuation::NextPage(token),
        resume => Continuation::End(resume),
    }
}

/// Print the result of a successful append
pub fn print_appended(handle: &StreamHandle, event: &LogEvent) {
    println!("{}", "✓ Event written successfully".green().bold());
    println!("  {}: {}", "Stream".bold(), handle.to_string().cyan());
    println!("  {}: {}", "Timestamp".bold(), event.timestamp);
    println!(
        "  {}: {}",
        "Next token".bold(),
        handle.sequence_token().unwrap_or("-")
    );
}

/// Print the outcome of a permission check
pub fn print_permission(capability: &str, granted: bool) {
    if granted {
        println!(
            "{}",
            format!("✓ Permission {} granted", capability).green().bold()
        );
    } else {
        println!(
            "{}",
            format!("✗ Permission {} not granted", capability).red().bold()
        );
    }
}

/// Format epoch milliseconds as local time
fn format_millis(millis: i64) -> Option<String> {
    let datetime: DateTime<Local> = Local.timestamp_millis_opt(millis).single()?;
    Some(datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
}

/// Format a retention period
fn format_retention(days: Option<i32>) -> String {
    match days {
        Some(1) => "1 day".to_string(),
        Some(days) => format!("{} days", days),
        None => "never expire".to_string(),
    }
}

/// Format a byte count in human-readable form
fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes < KB {
        format!("{}B", bytes)
    } else if bytes < MB {
        format!("{:.1}KB", bytes as f64 / KB as f64)
    } else if bytes < GB {
        format!("{:.1}MB", bytes as f64 / MB as f64)
    } else {
        format!("{:.2}GB", bytes as f64 / GB as f64)
    }
}

/// Truncate a string to a maximum number of characters
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Create a spinner for a backend round trip
pub fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Finish a progress bar with success
pub fn finish_progress_success(pb: ProgressBar, message: &str) {
    pb.finish_with_message(format!("{} {}", "✓".green(), message));
}

/// Finish a progress bar with error
pub fn finish_progress_error(pb: ProgressBar, message: &str) {
    pb.finish_with_message(format!("{} {}", "✗".red(), message));
}
