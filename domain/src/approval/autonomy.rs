//! Autonomy levels and their threshold profiles

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Named threshold profile controlling how readily the engine
/// auto-approves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AutonomyLevel {
    /// Escalate eagerly; approve only very safe, very confident calls
    Conservative,
    /// The default middle ground
    #[default]
    Balanced,
    /// Approve most things; escalate only clearly risky calls
    Aggressive,
}

/// Thresholds in effect for one autonomy level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Confidence below this escalates unconditionally
    pub confidence: f64,
    /// Risk above this escalates unconditionally
    pub risk: f64,
    /// Base probability for the residual random escalation draw
    pub base_escalate_probability: f64,
}

impl AutonomyLevel {
    pub fn as_str(&self) -> &str {
        match self {
            AutonomyLevel::Conservative => "conservative",
            AutonomyLevel::Balanced => "balanced",
            AutonomyLevel::Aggressive => "aggressive",
        }
    }

    /// The fixed threshold profile for this level.
    pub fn thresholds(&self) -> Thresholds {
        match self {
            AutonomyLevel::Conservative => Thresholds {
                confidence: 0.8,
                risk: 0.3,
                base_escalate_probability: 0.7,
            },
            AutonomyLevel::Balanced => Thresholds {
                confidence: 0.6,
                risk: 0.5,
                base_escalate_probability: 0.4,
            },
            AutonomyLevel::Aggressive => Thresholds {
                confidence: 0.4,
                risk: 0.7,
                base_escalate_probability: 0.2,
            },
        }
    }
}

impl std::fmt::Display for AutonomyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AutonomyLevel {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "conservative" => Ok(AutonomyLevel::Conservative),
            "balanced" => Ok(AutonomyLevel::Balanced),
            "aggressive" => Ok(AutonomyLevel::Aggressive),
            other => Err(DomainError::InvalidAutonomyLevel(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles() {
        let c = AutonomyLevel::Conservative.thresholds();
        assert_eq!((c.confidence, c.risk, c.base_escalate_probability), (0.8, 0.3, 0.7));

        let b = AutonomyLevel::Balanced.thresholds();
        assert_eq!((b.confidence, b.risk, b.base_escalate_probability), (0.6, 0.5, 0.4));

        let a = AutonomyLevel::Aggressive.thresholds();
        assert_eq!((a.confidence, a.risk, a.base_escalate_probability), (0.4, 0.7, 0.2));
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("invalid".parse::<AutonomyLevel>().is_err());
        assert_eq!(
            "balanced".parse::<AutonomyLevel>().unwrap(),
            AutonomyLevel::Balanced
        );
    }
}
