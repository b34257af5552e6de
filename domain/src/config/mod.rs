//! Process-wide engine configuration.
//!
//! Singleton, persisted in the store, mutable only through the control
//! plane's `config set` command, and read on every approval engine
//! invocation.

use crate::approval::autonomy::AutonomyLevel;
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Evaluation-model identifiers the engine accepts.
pub const KNOWN_EVALUATION_MODELS: &[&str] = &[
    "gpt-4o",
    "gpt-4-turbo",
    "gpt-4",
    "claude-3.5-sonnet",
    "claude-3-opus",
    "claude-3-sonnet",
    "o1-preview",
    "o1-mini",
];

const DEFAULT_EVALUATION_MODEL: &str = "claude-3.5-sonnet";

/// Runtime-mutable engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Active autonomy level
    pub autonomy_level: AutonomyLevel,
    /// Model identifier used for advisory risk evaluation
    pub evaluation_model: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            autonomy_level: AutonomyLevel::Balanced,
            evaluation_model: DEFAULT_EVALUATION_MODEL.to_string(),
        }
    }
}

impl EngineConfig {
    /// Set the evaluation model, validating against the known list.
    pub fn set_evaluation_model(&mut self, model: &str) -> Result<(), DomainError> {
        if !KNOWN_EVALUATION_MODELS.contains(&model) {
            return Err(DomainError::InvalidModel(model.to_string()));
        }
        self.evaluation_model = model.to_string();
        Ok(())
    }

    pub fn set_autonomy_level(&mut self, level: AutonomyLevel) {
        self.autonomy_level = level;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.autonomy_level, AutonomyLevel::Balanced);
        assert_eq!(config.evaluation_model, "claude-3.5-sonnet");
    }

    #[test]
    fn test_model_validation() {
        let mut config = EngineConfig::default();
        assert!(config.set_evaluation_model("gpt-4o").is_ok());
        assert_eq!(config.evaluation_model, "gpt-4o");

        let err = config.set_evaluation_model("invalid-model");
        assert!(matches!(err, Err(DomainError::InvalidModel(_))));
        assert_eq!(config.evaluation_model, "gpt-4o");
    }
}
