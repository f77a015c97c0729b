// Config module - Tail settings from files, environment, and flags

use crate::error::{LogTailError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Environment variable naming the backend region
pub const REGION_ENV: &str = "AWS_REGION";

/// Environment variable naming the default log group
pub const LOG_GROUP_ENV: &str = "AWS_LOG_GROUP";

/// Environment variable naming the credentials profile
pub const PROFILE_ENV: &str = "AWS_PROFILE";

/// Largest page size the log service accepts
pub const MAX_PAGE_LIMIT: i32 = 10_000;

/// How the active stream of a group is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreamSelectionPolicy {
    /// First stream in the backend's default listing order
    #[default]
    First,
    /// Stream with the latest `last_event_timestamp`
    MostRecent,
}

impl fmt::Display for StreamSelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamSelectionPolicy::First => write!(f, "first"),
            StreamSelectionPolicy::MostRecent => write!(f, "most-recent"),
        }
    }
}

impl FromStr for StreamSelectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "first" => Ok(StreamSelectionPolicy::First),
            "most-recent" => Ok(StreamSelectionPolicy::MostRecent),
            other => Err(format!(
                "unknown stream selection policy '{}'. Must be one of: first, most-recent",
                other
            )),
        }
    }
}

/// Client configuration: where to connect and how to pick streams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TailConfig {
    /// Backend region (e.g. us-east-1)
    #[serde(default)]
    pub region: Option<String>,

    /// Default log group for single-group commands
    #[serde(default)]
    pub log_group_name: Option<String>,

    /// Active stream selection policy
    #[serde(default)]
    pub stream_selection_policy: StreamSelectionPolicy,

    /// Maximum number of events per page
    #[serde(default)]
    pub page_limit: Option<i32>,

    /// Read pages oldest-first
    #[serde(default = "default_start_from_head")]
    pub start_from_head: bool,

    /// Named credentials profile
    #[serde(default)]
    pub profile: Option<String>,
}

fn default_start_from_head() -> bool {
    true
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            region: None,
            log_group_name: None,
            stream_selection_policy: StreamSelectionPolicy::default(),
            page_limit: None,
            start_from_head: default_start_from_head(),
            profile: None,
        }
    }
}

impl TailConfig {
    /// Load configuration from a file (supports TOML and JSON)
    pub fn from_file(path: &Path) -> Result<TailConfig> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| LogTailError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        let mut config = match extension {
            "toml" => Self::parse_toml(&contents)?,
            "json" => Self::parse_json(&contents)?,
            _ => {
                return Err(LogTailError::InvalidConfig(format!(
                    "Unsupported file format: {}. Use .toml or .json",
                    extension
                )))
            }
        };

        config.expand_env_vars();
        config.validate()?;

        Ok(config)
    }

    /// Parse TOML configuration
    fn parse_toml(contents: &str) -> Result<TailConfig> {
        toml::from_str(contents)
            .map_err(|e| LogTailError::InvalidConfig(format!("Failed to parse TOML: {}", e)))
    }

    /// Parse JSON configuration
    fn parse_json(contents: &str) -> Result<TailConfig> {
        serde_json::from_str(contents)
            .map_err(|e| LogTailError::InvalidConfig(format!("Failed to parse JSON: {}", e)))
    }

    /// Overlay values found in the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overlay values returned by `lookup`; unset or empty variables are ignored
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(region) = non_empty(REGION_ENV) {
            self.region = Some(region);
        }
        if let Some(group) = non_empty(LOG_GROUP_ENV) {
            self.log_group_name = Some(group);
        }
        if let Some(profile) = non_empty(PROFILE_ENV) {
            self.profile = Some(profile);
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if matches!(self.region.as_deref(), Some("")) {
            return Err(LogTailError::ConfigValidationError(
                "region must not be empty".to_string(),
            ));
        }

        if matches!(self.log_group_name.as_deref(), Some("")) {
            return Err(LogTailError::ConfigValidationError(
                "log_group_name must not be empty".to_string(),
            ));
        }

        if let Some(limit) = self.page_limit {
            if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
                return Err(LogTailError::ConfigValidationError(format!(
                    "page_limit must be between 1 and {}, got {}",
                    MAX_PAGE_LIMIT, limit
                )));
            }
        }

        Ok(())
    }

    /// Resolve the group to operate on: an explicit name wins over the configured default
    pub fn group_or_default(&self, explicit: Option<&str>) -> Result<String> {
        match explicit.or(self.log_group_name.as_deref()) {
            Some(group) if !group.is_empty() => Ok(group.to_string()),
            _ => Err(LogTailError::MissingConfigField(format!(
                "log_group_name (pass a group or set {})",
                LOG_GROUP_ENV
            ))),
        }
    }

    /// Expand environment variables in string fields
    fn expand_env_vars(&mut self) {
        self.region = self.region.as_deref().map(expand_env_in_string);
        self.log_group_name = self.log_group_name.as_deref().map(expand_env_in_string);
        self.profile = self.profile.as_deref().map(expand_env_in_string);
    }
}

/// Expand `$VAR` and `${VAR}` references in a string
fn expand_env_in_string(s: &str) -> String {
    expand_with(s, |name| std::env::var(name).ok())
}

/// Expand references using `lookup`; unset variables are left as written.
///
/// A bare `$NAME` takes the longest run of identifier characters, so `$FOO`
/// never matches inside `$FOO_BAR`.
fn expand_with<F>(s: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find('$') {
        result.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = match after.strip_prefix('{') {
            Some(braced) => match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            },
            None => {
                let end = after
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(after.len());
                (&after[..end], end)
            }
        };

        let value = if is_env_name(name) { lookup(name) } else { None };
        match value {
            Some(value) => result.push_str(&value),
            None => result.push_str(&rest[pos..pos + 1 + consumed]),
        }
        rest = &after[consumed..];
    }

    result.push_str(rest);
    result
}

fn is_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
