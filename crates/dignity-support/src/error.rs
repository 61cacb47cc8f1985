//! Error types for the dignity-support crate.

use thiserror::Error;

use dignity_core::Permission;

#[derive(Error, Debug)]
pub enum SupportError {
    /// Repository errors pass through unchanged.
    #[error(transparent)]
    Graph(#[from] dignity_graph::GraphError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Permission denied: {actor} lacks {permission}")]
    PermissionDenied { actor: String, permission: Permission },

    #[error("Guidance rule table error: {0}")]
    Rules(String),

    #[error("Audit error: {0}")]
    Audit(#[from] dignity_audit::SinkError),
}

impl SupportError {
    /// Retryable without changing the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SupportError::Graph(e) if e.is_retryable())
    }
}

impl From<dignity_core::CoreError> for SupportError {
    fn from(e: dignity_core::CoreError) -> Self {
        SupportError::Graph(e.into())
    }
}

pub type Result<T> = std::result::Result<T, SupportError>;
