//! Error taxonomy for the relay
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 1.0.0: Split session, Helix and configuration failures into typed errors

use thiserror::Error;

/// Fatal misconfiguration. Never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid setting {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse command config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Failures surfaced by the chat session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Connect, read or write failure. Covered by the reconnect policy.
    #[error("network error: {0}")]
    Transient(#[from] std::io::Error),

    #[error("not connected")]
    NotConnected,

    #[error("no channel to send to")]
    NoChannel,

    #[error("session stopped")]
    Stopped,

    /// Reconnect attempts exhausted. The session stays down until restarted.
    #[error("giving up after {attempts} reconnect attempts: {last_error}")]
    Fatal { attempts: u32, last_error: String },
}

impl SessionError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Fatal { .. } | SessionError::Stopped)
    }
}

/// Failures surfaced by Helix calls.
#[derive(Debug, Error)]
pub enum HelixError {
    /// The server said no token was sent at all.
    #[error("OAuth token is missing")]
    TokenMissing,

    /// The token was rejected again after a refresh.
    #[error("OAuth token rejected after refresh")]
    AuthExpired,

    #[error("rate limited (reset at {reset_epoch:?})")]
    RateLimited { reset_epoch: Option<i64> },

    #[error("gave up after {retries} rate-limit retries")]
    RetriesExhausted { retries: u32 },

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    /// Refresh failed; the stored refresh token or client secret is wrong.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl HelixError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            HelixError::RateLimited { .. } => Some(429),
            HelixError::Http { status, .. } => Some(*status),
            HelixError::TokenMissing | HelixError::AuthExpired => Some(401),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for HelixError {
    fn from(e: reqwest::Error) -> Self {
        HelixError::Transport(e.to_string())
    }
}
