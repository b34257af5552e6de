//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Invalid autonomy level: {0} (must be conservative, balanced, or aggressive)")]
    InvalidAutonomyLevel(String),

    #[error("Invalid evaluation model: {0}")]
    InvalidModel(String),

    #[error("Invalid feedback: {0} (must be correct or incorrect)")]
    InvalidFeedback(String),

    #[error("Invalid priority: {0} (must be low, normal, or high)")]
    InvalidPriority(String),

    #[error("Unknown agent status: {0}")]
    UnknownStatus(String),

    #[error("Task description must not be empty")]
    EmptyTask,

    #[error("Budget must not be negative: {0}")]
    NegativeBudget(f64),
}

impl DomainError {
    /// Check if this error represents bad caller input (as opposed to a
    /// violated internal invariant).
    pub fn is_validation(&self) -> bool {
        !matches!(self, DomainError::InvalidTransition { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_error_display() {
        let error = DomainError::InvalidTransition {
            from: "completed".to_string(),
            to: "working".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid status transition: completed -> working"
        );
    }

    #[test]
    fn test_is_validation() {
        assert!(DomainError::EmptyTask.is_validation());
        assert!(DomainError::InvalidAutonomyLevel("x".into()).is_validation());
        assert!(
            !DomainError::InvalidTransition {
                from: "a".into(),
                to: "b".into()
            }
            .is_validation()
        );
    }
}
