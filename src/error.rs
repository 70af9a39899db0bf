//! Error types for the live issue tracker client.
//!
//! Provides structured error handling with:
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes (2=auth, 3=not_found, 4=validation, etc.)
//! - Retryability flags so callers know when a resync is worth trying
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Auth (exit 2)
    AuthMissing,
    Unauthorized,

    // Not Found (exit 3)
    IssueNotFound,
    ProjectNotFound,

    // Validation (exit 4)
    InvalidStatus,
    InvalidPriority,
    InvalidArgument,

    // Stream (exit 5)
    StreamClosed,

    // Remote (exit 6)
    ApiError,
    HttpError,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::AuthMissing => "AUTH_MISSING",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::IssueNotFound => "ISSUE_NOT_FOUND",
            Self::ProjectNotFound => "PROJECT_NOT_FOUND",
            Self::InvalidStatus => "INVALID_STATUS",
            Self::InvalidPriority => "INVALID_PRIORITY",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::StreamClosed => "STREAM_CLOSED",
            Self::ApiError => "API_ERROR",
            Self::HttpError => "HTTP_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::AuthMissing | Self::Unauthorized => 2,
            Self::IssueNotFound | Self::ProjectNotFound => 3,
            Self::InvalidStatus | Self::InvalidPriority | Self::InvalidArgument => 4,
            Self::StreamClosed => 5,
            Self::ApiError | Self::HttpError => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether retrying (or resubscribing) could plausibly succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StreamClosed
                | Self::HttpError
                | Self::ApiError
                | Self::InvalidStatus
                | Self::InvalidPriority
                | Self::InvalidArgument
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in client operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("No authentication token found")]
    AuthMissing,

    #[error("Event stream '{key}' closed: {reason}")]
    StreamClosed { key: String, reason: String },

    #[error("Issue not found: {id}")]
    IssueNotFound { id: String },

    #[error("Project not found: {id}")]
    ProjectNotFound { id: String },

    #[error("Server returned {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Api { status: u16, message: Option<String> },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Invalid priority: {0}")]
    InvalidPriority(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::AuthMissing => ErrorCode::AuthMissing,
            Self::Api { status: 401 | 403, .. } => ErrorCode::Unauthorized,
            Self::Api { .. } => ErrorCode::ApiError,
            Self::StreamClosed { .. } => ErrorCode::StreamClosed,
            Self::IssueNotFound { .. } => ErrorCode::IssueNotFound,
            Self::ProjectNotFound { .. } => ErrorCode::ProjectNotFound,
            Self::Http(_) => ErrorCode::HttpError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::InvalidStatus(_) => ErrorCode::InvalidStatus,
            Self::InvalidPriority(_) => ErrorCode::InvalidPriority,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Message suitable for showing in a view's error state.
    ///
    /// Uses the server's error payload message when one was returned,
    /// otherwise falls back to the caller's generic message.
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Api {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }

    /// Context-aware recovery hint.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::AuthMissing => Some(
                "Log in first, then store the token:\n  \
                 itl config set-token <token>\n  \
                 or export ITL_TOKEN=<token>"
                    .to_string(),
            ),

            Self::Api { status: 401 | 403, .. } => Some(
                "The server rejected the token. Refresh it with `itl config set-token <token>`."
                    .to_string(),
            ),

            Self::StreamClosed { .. } => Some(
                "The live stream stopped. Re-run the command, or enable retries with \
                 ITL_RECONNECT_RETRIES=<n>."
                    .to_string(),
            ),

            Self::IssueNotFound { id } => Some(format!(
                "No issue with ID '{id}'. Use `itl issues list` to see available issues."
            )),

            Self::ProjectNotFound { id } => Some(format!(
                "No project with ID '{id}'. Use `itl projects list` to see available projects."
            )),

            Self::Http(_) => Some(
                "Could not reach the server. Check `itl config show` for the API URL.".to_string(),
            ),

            Self::InvalidStatus(_) => Some(
                "Valid statuses: OPEN, IN_PROGRESS, CLOSED. \
                 Synonyms: done→CLOSED, wip→IN_PROGRESS, todo→OPEN"
                    .to_string(),
            ),

            Self::InvalidPriority(_) => Some(
                "Valid priorities: LOW, MEDIUM, HIGH, CRITICAL (or P0-P3)".to_string(),
            ),

            Self::InvalidArgument(msg) if msg.contains("sort") => Some(
                "Sort format is <field>,<direction> with field one of createdAt, priority, \
                 title, status and direction asc or desc"
                    .to_string(),
            ),

            Self::Api { .. }
            | Self::Io(_)
            | Self::Json(_)
            | Self::InvalidArgument(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
