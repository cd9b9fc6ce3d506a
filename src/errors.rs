// src/errors.rs
use reqwest::StatusCode;

use crate::form::ParameterField;

/// Coarse failure classes surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Status,
    Malformed,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Service returned {status}: {message}")]
    Status {
        status: StatusCode,
        /// `message` (or `error`) field from the JSON error body, if the service sent one.
        server_message: Option<String>,
        message: String,
    },

    #[error("Malformed response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("Invalid service URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Transport { .. } | ClientError::Timeout { .. } => ErrorKind::Transport,
            ClientError::Status { .. } => ErrorKind::Status,
            ClientError::Decode { .. } | ClientError::InvalidUrl(_) => ErrorKind::Malformed,
        }
    }

    /// Best message for an alert: the server's own message when it sent one.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Status {
                server_message: Some(msg),
                ..
            } => msg.clone(),
            other => other.to_string(),
        }
    }

    /// GET retries only make sense for failures that might go away.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport { .. } | ClientError::Timeout { .. } => true,
            ClientError::Status { status, .. } => status.is_server_error(),
            _ => false,
        }
    }

    pub(crate) fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout {
                url: url.to_string(),
            }
        } else if err.is_decode() {
            ClientError::Decode {
                url: url.to_string(),
                reason: err.to_string(),
            }
        } else {
            ClientError::Transport {
                url: url.to_string(),
                source: err,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error("{field} must be a number, got {value:?}")]
    InvalidNumber {
        field: ParameterField,
        value: String,
    },

    #[error("{field} must be a whole number, got {value:?}")]
    InvalidInteger {
        field: ParameterField,
        value: String,
    },

    #[error("{field} must not be empty")]
    Empty { field: ParameterField },

    #[error("Unknown strategy {0:?}")]
    UnknownStrategy(String),

    #[error("Unknown mode {0:?}")]
    UnknownMode(String),

    #[error("Unknown combination mode {0:?}")]
    UnknownCombMode(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RunError {
    #[error("A backtest is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Form(#[from] FormError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid API base URL {url:?}: {reason}")]
    BaseUrl { url: String, reason: String },

    #[error("Timeout must be at least one second")]
    ZeroTimeout,
}
