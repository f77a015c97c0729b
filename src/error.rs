use thiserror::Error;

/// Main error type for the log tail client
#[derive(Debug, Error)]
pub enum LogTailError {
    // Lookup errors
    #[error("log group '{0}' not found or has no streams")]
    GroupNotFound(String),

    #[error("log stream '{stream}' not found in group '{group}'")]
    StreamNotFound { group: String, stream: String },

    // Backend errors
    #[error("backend unavailable for '{target}': {reason}")]
    BackendUnavailable { target: String, reason: String },

    #[error("backend rejected request for '{target}': {reason}")]
    RequestRejected { target: String, reason: String },

    #[error("sequence token for stream '{stream}' in group '{group}' is stale; re-resolve the stream before retrying")]
    StaleSequenceToken { group: String, stream: String },

    #[error("permission check for '{capability}' failed: {reason}")]
    PermissionCheckFailed { capability: String, reason: String },

    // Event validation
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Missing required configuration field: {0}")]
    MissingConfigField(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),
}

impl LogTailError {
    /// Stable name of the error kind, used in one-line CLI diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            LogTailError::GroupNotFound(_) => "GroupNotFound",
            LogTailError::StreamNotFound { .. } => "StreamNotFound",
            // a rejection is a backend failure that retrying will not fix
            LogTailError::BackendUnavailable { .. } | LogTailError::RequestRejected { .. } => {
                "BackendUnavailable"
            }
            LogTailError::StaleSequenceToken { .. } => "StaleSequenceToken",
            LogTailError::PermissionCheckFailed { .. } => "PermissionCheckFailed",
            LogTailError::InvalidEvent(_) => "InvalidEvent",
            LogTailError::ConfigError(_)
            | LogTailError::InvalidConfig(_)
            | LogTailError::MissingConfigField(_)
            | LogTailError::ConfigValidationError(_) => "ConfigError",
        }
    }

    /// Whether a caller may retry the same call after backing off.
    ///
    /// A stale sequence token is not transient: the stream must be
    /// re-resolved before the append is attempted again. Neither is a
    /// request the backend refused outright.
    pub fn is_transient(&self) -> bool {
        matches!(self, LogTailError::BackendUnavailable { .. })
    }
}

/// Result type alias for log tail operations
pub type Result<T> = std::result::Result<T, LogTailError>;
