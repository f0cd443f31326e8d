//! Error types module
//!
//! All client-side failures are unified under `KbError`. The variants mirror the
//! three families the application distinguishes (authentication, HTTP, local
//! validation) plus the plumbing failures that can happen underneath them.

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for session problems and rejected requests
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Fixed notification shown when a login attempt is rejected.
pub const LOGIN_FAILED_MESSAGE: &str = "Invalid username, password or verification code";

/// Fallback notification when a save fails without a server message.
pub const SAVE_FAILED_MESSAGE: &str = "Failed to save";

#[derive(Debug, thiserror::Error)]
pub enum KbError {
    /// Login or token revalidation rejected, or the session was invalidated.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Non-2xx response from the record or file APIs.
    #[error("API request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    /// Local form invalidity. Never reaches the network.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response body: {0}")]
    Decode(String),

    #[error("Token storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type KbResult<T> = Result<T, KbError>;

impl KbError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        KbError::Http {
            status,
            message: message.into(),
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            KbError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 401/403 responses end the session.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    /// Machine-readable error code (e.g., "AUTH_ERROR")
    pub fn error_code(&self) -> &'static str {
        match self {
            KbError::Auth(_) => "AUTH_ERROR",
            KbError::Http { .. } => "HTTP_ERROR",
            KbError::Validation(_) => "VALIDATION_ERROR",
            KbError::Transport(_) => "TRANSPORT_ERROR",
            KbError::Decode(_) => "DECODE_ERROR",
            KbError::Storage(_) => "STORAGE_ERROR",
            KbError::Config(_) => "CONFIG_ERROR",
        }
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            KbError::Validation(_) => LogLevel::Debug,
            KbError::Auth(_) => LogLevel::Warn,
            KbError::Http { status, .. } if *status < 500 => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }

    /// Text for the transient user-visible notification.
    ///
    /// Server-reported messages are shown as-is; an empty message falls back to
    /// `SAVE_FAILED_MESSAGE`.
    pub fn user_message(&self) -> String {
        let message = match self {
            KbError::Http { message, .. } => message.trim(),
            KbError::Auth(message)
            | KbError::Validation(message)
            | KbError::Transport(message)
            | KbError::Decode(message)
            | KbError::Storage(message)
            | KbError::Config(message) => message.trim(),
        };
        if message.is_empty() {
            SAVE_FAILED_MESSAGE.to_string()
        } else {
            message.to_string()
        }
    }

    /// Notification for a failed login: always the fixed friendly text, except
    /// for local validation problems which are reported verbatim.
    pub fn login_message(&self) -> String {
        match self {
            KbError::Validation(message) => message.clone(),
            _ => LOGIN_FAILED_MESSAGE.to_string(),
        }
    }
}

impl From<serde_json::Error> for KbError {
    fn from(err: serde_json::Error) -> Self {
        KbError::Decode(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for KbError {
    fn from(err: validator::ValidationErrors) -> Self {
        KbError::Validation(err.to_string())
    }
}

impl From<envy::Error> for KbError {
    fn from(err: envy::Error) -> Self {
        KbError::Config(err.to_string())
    }
}
