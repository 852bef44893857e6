//! Error types for the Proclusive workflow engines

use thiserror::Error;

use crate::domain::{ApplicationId, ProfileId, ReferralId};

/// Errors that can occur while running a workflow operation
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Non-database persistence failure (in-memory stores, row decoding)
    #[error("storage error: {0}")]
    Storage(String),

    /// Application not found
    #[error("application not found: {0}")]
    ApplicationNotFound(ApplicationId),

    /// Profile not found
    #[error("profile not found: {0}")]
    ProfileNotFound(ProfileId),

    /// Referral not found
    #[error("referral not found: {0}")]
    ReferralNotFound(ReferralId),

    /// Caller input rejected before any mutation
    #[error("validation failed for {field}: {message}")]
    Validation { field: String, message: String },

    /// Invalid state transition
    #[error("invalid state transition for {entity_type}/{entity_id}: {from} -> {to}")]
    InvalidStateTransition {
        entity_type: String,
        entity_id: String,
        from: String,
        to: String,
    },

    /// Invariant violation
    #[error("invariant violation: {invariant} - {message}")]
    InvariantViolation { invariant: String, message: String },

    /// Authorization error
    #[error("authorization error: {0}")]
    Unauthorized(String),

    /// Notification delivery error
    #[error("notification error: {0}")]
    Notification(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl WorkflowError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        WorkflowError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_transition(
        entity_type: impl Into<String>,
        entity_id: impl ToString,
        from: impl ToString,
        to: impl ToString,
    ) -> Self {
        WorkflowError::InvalidStateTransition {
            entity_type: entity_type.into(),
            entity_id: entity_id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Whether the error was raised before any state was written
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            WorkflowError::Validation { .. }
                | WorkflowError::InvalidStateTransition { .. }
                | WorkflowError::InvariantViolation { .. }
                | WorkflowError::ApplicationNotFound(_)
                | WorkflowError::ProfileNotFound(_)
                | WorkflowError::ReferralNotFound(_)
                | WorkflowError::Unauthorized(_)
        )
    }
}

/// Result type for workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;
