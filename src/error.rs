//! Writer Error Types
//!
//! Centralized error handling using thiserror for type-safe errors.

use std::path::PathBuf;
use thiserror::Error;

use crate::writer::DataKind;

/// Top-level error type for metric writers
#[derive(Error, Debug)]
pub enum WriterError {
    #[error("Writing {kind} is not supported by this writer")]
    Unsupported { kind: DataKind },

    #[error("No active tracking session (was an API key configured?)")]
    NoActiveSession,

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl WriterError {
    /// Create an unsupported-kind error
    pub fn unsupported(kind: DataKind) -> Self {
        Self::Unsupported { kind }
    }

    /// Returns true for errors raised because the writer does not handle a data kind
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }
}

/// Tracking session errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to open session for project '{project}': {reason}")]
    OpenFailed { project: String, reason: String },

    #[error("Session I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {field}")]
    MissingField { field: String },
}

/// Result type alias for writer operations
pub type WriterResult<T> = std::result::Result<T, WriterError>;

/// Result type alias for session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Result type alias for config operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
