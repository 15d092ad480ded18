//! Error types for the flow engine
//!
//! Graph mutations never fail: an invalid flow is described by
//! [`ValidationIssue`](crate::validation::ValidationIssue) values instead.
//! These errors cover the outer operations (history, store, lifecycle).

use thiserror::Error;

use crate::types::FlowStatus;

/// Result type alias using FlowError
pub type Result<T> = std::result::Result<T, FlowError>;

/// Errors that can occur around a flow
#[derive(Debug, Error)]
pub enum FlowError {
    /// The flow still has error-severity validation issues
    #[error("Flow has {count} validation error(s): {first}")]
    ValidationFailed { count: usize, first: String },

    /// A status change that the lifecycle does not allow
    #[error("Cannot move flow from '{from}' to '{to}'")]
    InvalidTransition { from: FlowStatus, to: FlowStatus },

    /// Flow not found in a store
    #[error("Flow not found: {0}")]
    NotFound(i64),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compression error
    #[error("Compression error: {0}")]
    Compression(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlowError {
    /// Create a compression error from any displayable cause
    pub fn compression(err: impl std::fmt::Display) -> Self {
        Self::Compression(err.to_string())
    }
}
