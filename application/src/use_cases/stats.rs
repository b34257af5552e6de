//! Aggregate statistics over the decision history and agent population.

use crate::ports::store::{Store, StoreError};
use chrono::{Duration, Utc};
use overseer_domain::confidence_from_history;
use serde::{Deserialize, Serialize};

/// Snapshot of the engine's track record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsReport {
    pub total_decisions: u64,
    pub approvals: u64,
    pub denials: u64,
    pub escalations: u64,
    /// Fraction of decisions that were escalated
    pub escalation_rate: f64,
    pub feedback_count: u64,
    /// Share of feedback marked correct, `None` without any feedback
    pub accuracy: Option<f64>,
    /// Confidence the engine would use for the next evaluation
    pub current_confidence: f64,
    pub live_agents: usize,
    pub total_agents: usize,
}

pub fn compute_stats(store: &dyn Store) -> Result<StatsReport, StoreError> {
    let tally = store.decision_tally()?;
    let samples = store.feedback_since(Utc::now() - Duration::days(30))?;
    let current_confidence = confidence_from_history(&samples);

    let feedback_count = tally.feedback_correct + tally.feedback_incorrect;
    let accuracy = if feedback_count > 0 {
        Some(tally.feedback_correct as f64 / feedback_count as f64)
    } else {
        None
    };
    let escalation_rate = if tally.total > 0 {
        tally.escalations as f64 / tally.total as f64
    } else {
        0.0
    };

    Ok(StatsReport {
        total_decisions: tally.total,
        approvals: tally.approvals,
        denials: tally.denials,
        escalations: tally.escalations,
        escalation_rate,
        feedback_count,
        accuracy,
        current_confidence,
        live_agents: store.count_live_agents()?,
        total_agents: store.list_agents(true)?.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::store::DecisionStore;
    use crate::testing::MemoryStore;
    use overseer_domain::{AgentId, AutonomyLevel, DecisionOutcome, Feedback, NewDecision};

    fn decision(outcome: DecisionOutcome) -> NewDecision {
        NewDecision {
            agent_id: AgentId::new("a1"),
            payload: serde_json::json!({"tool": "bash"}),
            outcome,
            risk_score: 0.5,
            confidence_score: 0.6,
            autonomy_level: AutonomyLevel::Balanced,
            model_used: "claude-3.5-sonnet".into(),
            reasoning: None,
            degraded: false,
        }
    }

    #[test]
    fn test_empty_store_reports_neutral() {
        let store = MemoryStore::new();
        let report = compute_stats(&store).unwrap();
        assert_eq!(report.total_decisions, 0);
        assert_eq!(report.accuracy, None);
        assert_eq!(report.escalation_rate, 0.0);
        assert_eq!(report.current_confidence, 0.5);
    }

    #[test]
    fn test_counts_and_rates() {
        let store = MemoryStore::new();
        for _ in 0..6 {
            store.insert_decision(&decision(DecisionOutcome::Approve)).unwrap();
        }
        for _ in 0..3 {
            store.insert_decision(&decision(DecisionOutcome::Escalate)).unwrap();
        }
        let denied = store.insert_decision(&decision(DecisionOutcome::Deny)).unwrap();
        store.attach_feedback(denied.id, Feedback::Correct).unwrap();

        let report = compute_stats(&store).unwrap();
        assert_eq!(report.total_decisions, 10);
        assert_eq!(report.approvals, 6);
        assert_eq!(report.escalations, 3);
        assert_eq!(report.denials, 1);
        assert_eq!(report.escalation_rate, 0.3);
        assert_eq!(report.feedback_count, 1);
        assert_eq!(report.accuracy, Some(1.0));
    }
}
