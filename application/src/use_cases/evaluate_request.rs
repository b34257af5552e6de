//! The approval engine: decides what happens to one agent request.
//!
//! Evaluation order per request: classify risk from the keyword table,
//! compute learned confidence from recent feedback, consult the advisory
//! service (tolerating its absence), then run the numeric decision rule.
//! Every evaluation persists a decision record and logs a manager
//! response, whatever the outcome.

use crate::interaction_log::InteractionLogger;
use crate::ports::probability::ProbabilitySource;
use crate::ports::risk_evaluator::{AdvisoryVerdict, RiskAdvisory, RiskContext, RiskEvaluator};
use crate::ports::store::{Store, StoreError};
use chrono::{Duration, Utc};
use overseer_domain::{
    Agent, Decision, DecisionOutcome, NewDecision, RiskTable, RuleInput, RuleOutcome, SessionId,
    confidence_from_history, decide,
};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// How far back feedback-bearing decisions count toward confidence.
const FEEDBACK_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Risk/confidence-based approval engine.
pub struct ApprovalEngine {
    store: Arc<dyn Store>,
    probability: Arc<dyn ProbabilitySource>,
    logger: InteractionLogger,
    risk_table: RiskTable,
    advisory: Option<Arc<dyn RiskEvaluator>>,
    /// When set, an advisory `deny` verdict downgrades a rule approval to
    /// a denial. The advisory can never upgrade an escalation.
    advisory_overrides_rule: bool,
}

impl ApprovalEngine {
    pub fn new(store: Arc<dyn Store>, probability: Arc<dyn ProbabilitySource>) -> Self {
        let logger = InteractionLogger::new(store.clone());
        Self {
            store,
            probability,
            logger,
            risk_table: RiskTable::default(),
            advisory: None,
            advisory_overrides_rule: false,
        }
    }

    pub fn with_risk_table(mut self, table: RiskTable) -> Self {
        self.risk_table = table;
        self
    }

    pub fn with_advisory(mut self, advisory: Arc<dyn RiskEvaluator>) -> Self {
        self.advisory = Some(advisory);
        self
    }

    pub fn with_advisory_override(mut self, enabled: bool) -> Self {
        self.advisory_overrides_rule = enabled;
        self
    }

    /// Evaluate one request from an agent and persist the decision.
    pub async fn evaluate(
        &self,
        agent: &Agent,
        session: &SessionId,
        payload: &Value,
    ) -> Result<Decision, EngineError> {
        let payload_text = payload.to_string();
        let assessment = self.risk_table.classify(&payload_text);

        let window_start = Utc::now() - Duration::days(FEEDBACK_WINDOW_DAYS);
        let samples = self.store.feedback_since(window_start)?;
        let confidence = confidence_from_history(&samples);

        let config = self.store.load_engine_config()?;

        let (advisory, degraded) = self
            .consult_advisory(agent, payload, assessment.score, confidence, &config.evaluation_model)
            .await;

        let rule_outcome = decide(RuleInput {
            risk: assessment.score,
            confidence,
            thresholds: config.autonomy_level.thresholds(),
            budget_spent_ratio: agent.budget.spent_ratio(),
            trivial: assessment.is_trivial(),
            draw: self.probability.draw(),
        });

        let (outcome, reasoning) = match rule_outcome {
            RuleOutcome::Escalate(reason) => {
                let text = advisory
                    .as_ref()
                    .map(|a| a.reasoning.clone())
                    .unwrap_or_else(|| format!("escalated: {}", reason.as_str()));
                (DecisionOutcome::Escalate, Some(text))
            }
            RuleOutcome::Approve => match advisory.as_ref() {
                Some(a) if self.advisory_overrides_rule && a.verdict == AdvisoryVerdict::Deny => {
                    (DecisionOutcome::Deny, Some(a.reasoning.clone()))
                }
                Some(a) => (DecisionOutcome::Approve, Some(a.reasoning.clone())),
                None => (DecisionOutcome::Approve, None),
            },
        };

        debug!(
            agent_id = %agent.id,
            risk = assessment.score,
            category = assessment.category.as_deref().unwrap_or("unmatched"),
            confidence,
            outcome = outcome.as_str(),
            degraded,
            "request evaluated"
        );

        let decision = self.store.insert_decision(&NewDecision {
            agent_id: agent.id.clone(),
            payload: payload.clone(),
            outcome,
            risk_score: assessment.score,
            confidence_score: confidence,
            autonomy_level: config.autonomy_level,
            model_used: config.evaluation_model,
            reasoning,
            degraded,
        })?;

        self.logger.manager_response(
            &agent.id,
            session,
            format!("decision {}: {}", decision.id, decision.outcome),
            Some(serde_json::json!({
                "risk_score": decision.risk_score,
                "confidence_score": decision.confidence_score,
                "degraded": decision.degraded,
            })),
        );

        Ok(decision)
    }

    /// Ask the advisory service for a second opinion. Returns the advisory
    /// (if any) and whether this evaluation ran degraded.
    async fn consult_advisory(
        &self,
        agent: &Agent,
        payload: &Value,
        risk_score: f64,
        confidence_score: f64,
        model: &str,
    ) -> (Option<RiskAdvisory>, bool) {
        let Some(advisory) = self.advisory.as_ref() else {
            return (None, false);
        };
        let context = RiskContext {
            agent_task: &agent.task,
            repo_path: &agent.repo_path,
            payload,
            risk_score,
            confidence_score,
            budget_remaining: agent.budget.remaining(),
            priority: agent.priority,
            model,
        };
        match advisory.evaluate(&context).await {
            Ok(result) => (Some(result), false),
            Err(e) => {
                warn!(agent_id = %agent.id, error = %e, "advisory service unavailable, proceeding degraded");
                (None, true)
            }
        }
    }
}
