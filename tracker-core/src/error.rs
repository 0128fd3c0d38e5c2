//! Error types for the tracker

use thiserror::Error;

/// Tracker-wide error type
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TrackerError {
    pub fn network(msg: impl Into<String>) -> Self {
        TrackerError::Network(msg.into())
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        TrackerError::Auth(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        TrackerError::Parse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        TrackerError::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        TrackerError::Internal(msg.into())
    }
}

/// Result type alias for tracker operations
pub type TrackerResult<T> = Result<T, TrackerError>;
