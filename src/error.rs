//! Error taxonomy shared by the store, the workflow and the server
//!
//! Validation, NotFound and Precondition errors are raised before any state
//! is mutated. Upstream errors carry the completion API status when one was
//! received. Storage errors only affect the action that triggered them.

use thiserror::Error;

/// Result alias used across the crate
pub type LabResult<T> = Result<T, LabError>;

#[derive(Debug, Error)]
pub enum LabError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Precondition not met: {0}")]
    Precondition(String),

    #[error("Completion request failed: {message}")]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl LabError {
    pub fn validation(message: impl Into<String>) -> Self {
        LabError::Validation(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        LabError::Precondition(message.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        LabError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        LabError::Upstream {
            status,
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        LabError::Storage(message.into())
    }

    /// Short machine-readable category name
    pub fn kind(&self) -> &'static str {
        match self {
            LabError::Validation(_) => "validation",
            LabError::NotFound { .. } => "not_found",
            LabError::Precondition(_) => "precondition",
            LabError::Upstream { .. } => "upstream",
            LabError::Storage(_) => "storage",
        }
    }

    /// Message shown to the person driving the session
    pub fn user_message(&self) -> String {
        match self {
            LabError::Upstream {
                status: Some(status),
                message,
            } => format!(
                "The completion service returned HTTP {}: {}. Please try again.",
                status, message
            ),
            LabError::Upstream {
                status: None,
                message,
            } => format!("{}. Please try again.", message),
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for LabError {
    fn from(e: serde_json::Error) -> Self {
        LabError::Storage(format!("JSON serialization failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = LabError::not_found("Session", "abc");
        assert_eq!(err.to_string(), "Session not found: abc");
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn test_upstream_user_message_includes_status() {
        let err = LabError::upstream(Some(429), "rate limited");
        let msg = err.user_message();
        assert!(msg.contains("429"));
        assert!(msg.contains("rate limited"));
        assert!(msg.contains("try again"));
    }

    #[test]
    fn test_upstream_user_message_without_status() {
        let err = LabError::upstream(None, "connection refused");
        assert_eq!(err.user_message(), "connection refused. Please try again.");
    }

    #[test]
    fn test_precondition_user_message_is_display() {
        let err = LabError::precondition("summary is empty");
        assert_eq!(err.user_message(), "Precondition not met: summary is empty");
    }
}
