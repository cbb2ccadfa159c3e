//! Error types for action dispatch

use thiserror::Error;

/// Failure of a single dispatched action.
///
/// These never escape a workflow run: the interpreter logs them and routes
/// execution into the step's error branch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    #[error("{operation} failed: {status}")]
    HttpStatus { operation: &'static str, status: u16 },

    #[error("Request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("Invalid configuration for {action_type}: {reason}")]
    InvalidConfig { action_type: String, reason: String },

    #[error("HTTP client error: {0}")]
    Client(String),
}

impl ActionError {
    pub fn request(url: impl Into<String>, message: impl ToString) -> Self {
        Self::Request {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ActionError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
