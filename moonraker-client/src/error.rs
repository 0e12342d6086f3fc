//! Client error types

use thiserror::Error;

/// Moonraker client error type
#[derive(Debug, Error)]
pub enum MoonrakerError {
    /// Transport failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Moonraker answered with a non-success status
    #[error("Request to moonraker failed with status {status}: {body}")]
    Status { status: u16, body: String },

    /// Invalid client configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl MoonrakerError {
    /// HTTP status of a rejected request
    pub fn status(&self) -> Option<u16> {
        match self {
            MoonrakerError::Status { status, .. } => Some(*status),
            MoonrakerError::Http(e) => e.status().map(|s| s.as_u16()),
            MoonrakerError::InvalidConfig(_) => None,
        }
    }
}

/// Result type for client operations
pub type MoonrakerResult<T> = Result<T, MoonrakerError>;
