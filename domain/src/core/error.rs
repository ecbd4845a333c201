//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Invalid label '{name}': min ({min}) must be lower than max ({max})")]
    InvalidLabelBounds { name: String, min: i32, max: i32 },

    #[error("Invalid approval value '{0}'")]
    InvalidApprovalValue(String),

    #[error("Failed to parse query output: {0}")]
    QueryParse(String),
}

impl DomainError {
    /// Check if this error came from an unusable event record
    pub fn is_malformed_event(&self) -> bool {
        matches!(self, DomainError::MalformedEvent(_))
    }
}
