//! The escalation decision rule.
//!
//! A pure function of the numeric inputs: risk score, confidence score,
//! the active threshold profile, budget state, and one pseudo-random draw.
//! Keeping the draw an explicit input makes the rule fully deterministic
//! under test.

use super::autonomy::Thresholds;
use serde::{Deserialize, Serialize};

/// Why the rule chose to escalate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    /// Risk score above the level's risk threshold
    RiskAboveThreshold,
    /// Confidence score below the level's confidence threshold
    LowConfidence,
    /// Budget guard: ≥80% spent and the request is non-trivial
    BudgetGuard,
    /// Residual probabilistic escalation draw
    Probabilistic,
}

impl EscalationReason {
    pub fn as_str(&self) -> &str {
        match self {
            EscalationReason::RiskAboveThreshold => "risk_above_threshold",
            EscalationReason::LowConfidence => "low_confidence",
            EscalationReason::BudgetGuard => "budget_guard",
            EscalationReason::Probabilistic => "probabilistic",
        }
    }
}

/// Inputs to one rule evaluation.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput {
    /// Classified risk score in `[0, 1]`
    pub risk: f64,
    /// Learned confidence score in `[0, 1]`
    pub confidence: f64,
    /// Threshold profile of the active autonomy level
    pub thresholds: Thresholds,
    /// Fraction of the agent's budget already spent, in `[0, 1]`
    pub budget_spent_ratio: f64,
    /// Whether the request is trivial (reads, tests) for budget purposes
    pub trivial: bool,
    /// Pseudo-random draw in `[0, 1)` for the residual escalation branch
    pub draw: f64,
}

/// Outcome of the rule: auto-approve, or escalate with the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    Approve,
    Escalate(EscalationReason),
}

impl RuleOutcome {
    pub fn is_escalate(&self) -> bool {
        matches!(self, RuleOutcome::Escalate(_))
    }
}

/// Evaluate the decision rule.
///
/// Order matters: the unconditional branches (risk, confidence, budget)
/// are checked before the probabilistic one, so a deterministic escalation
/// is never attributed to the random draw.
pub fn decide(input: RuleInput) -> RuleOutcome {
    let Thresholds {
        confidence,
        risk,
        base_escalate_probability,
    } = input.thresholds;

    if input.risk > risk {
        return RuleOutcome::Escalate(EscalationReason::RiskAboveThreshold);
    }
    if input.confidence < confidence {
        return RuleOutcome::Escalate(EscalationReason::LowConfidence);
    }
    if input.budget_spent_ratio >= crate::agent::value_objects::Budget::GUARD_RATIO
        && !input.trivial
    {
        return RuleOutcome::Escalate(EscalationReason::BudgetGuard);
    }

    let escalate_probability = base_escalate_probability * (1.0 - input.confidence);
    if input.draw < escalate_probability {
        return RuleOutcome::Escalate(EscalationReason::Probabilistic);
    }

    RuleOutcome::Approve
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::autonomy::AutonomyLevel;

    fn input(level: AutonomyLevel, risk: f64, confidence: f64, draw: f64) -> RuleInput {
        RuleInput {
            risk,
            confidence,
            thresholds: level.thresholds(),
            budget_spent_ratio: 0.0,
            trivial: risk <= 0.2,
            draw,
        }
    }

    #[test]
    fn test_high_risk_always_escalates() {
        for level in [
            AutonomyLevel::Conservative,
            AutonomyLevel::Balanced,
            AutonomyLevel::Aggressive,
        ] {
            let outcome = decide(input(level, 1.0, 0.9, 0.99));
            assert_eq!(
                outcome,
                RuleOutcome::Escalate(EscalationReason::RiskAboveThreshold),
                "level {level}"
            );
        }
    }

    #[test]
    fn test_low_confidence_always_escalates() {
        for level in [
            AutonomyLevel::Conservative,
            AutonomyLevel::Balanced,
            AutonomyLevel::Aggressive,
        ] {
            let outcome = decide(input(level, 0.1, 0.2, 0.99));
            assert_eq!(
                outcome,
                RuleOutcome::Escalate(EscalationReason::LowConfidence),
                "level {level}"
            );
        }
    }

    #[test]
    fn test_neutral_confidence_escalates_under_balanced() {
        // A read with neutral 0.5 confidence: risk 0.1 < 0.5 passes, but
        // 0.5 < 0.6 confidence threshold does not.
        let outcome = decide(input(AutonomyLevel::Balanced, 0.1, 0.5, 0.99));
        assert_eq!(outcome, RuleOutcome::Escalate(EscalationReason::LowConfidence));
    }

    #[test]
    fn test_earned_confidence_auto_approves() {
        // Same read once feedback history has raised confidence past 0.6.
        let outcome = decide(input(AutonomyLevel::Balanced, 0.1, 0.75, 0.99));
        assert_eq!(outcome, RuleOutcome::Approve);
    }

    #[test]
    fn test_budget_guard_overrides_approval() {
        let mut rule_input = input(AutonomyLevel::Aggressive, 0.5, 0.9, 0.99);
        rule_input.budget_spent_ratio = 0.85;
        rule_input.trivial = false;
        assert_eq!(
            decide(rule_input),
            RuleOutcome::Escalate(EscalationReason::BudgetGuard)
        );

        // Trivial reads stay exempt even over budget
        rule_input.risk = 0.1;
        rule_input.trivial = true;
        assert_eq!(decide(rule_input), RuleOutcome::Approve);
    }

    #[test]
    fn test_probabilistic_branch_uses_draw() {
        // Balanced, risk ok, confidence 0.7 => p = 0.4 * 0.3 = 0.12
        let escalated = decide(input(AutonomyLevel::Balanced, 0.2, 0.7, 0.11));
        assert_eq!(
            escalated,
            RuleOutcome::Escalate(EscalationReason::Probabilistic)
        );

        let approved = decide(input(AutonomyLevel::Balanced, 0.2, 0.7, 0.13));
        assert_eq!(approved, RuleOutcome::Approve);
    }

    #[test]
    fn test_conservative_escalates_often_even_when_confident() {
        // p = 0.7 * (1 - 0.82) ≈ 0.126 with thresholds passed
        let outcome = decide(input(AutonomyLevel::Conservative, 0.2, 0.82, 0.1));
        assert!(outcome.is_escalate());
    }
}
