//! Port for the advisory risk evaluation service.
//!
//! Advisory only: the numeric keyword rule decides; the service adds
//! reasoning text and a second opinion. When it is unreachable or slow the
//! engine proceeds degraded rather than blocking agents.

use async_trait::async_trait;
use overseer_domain::Priority;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// What the advisory service recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryVerdict {
    Approve,
    Deny,
    Escalate,
}

/// Advisory assessment of one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAdvisory {
    pub verdict: AdvisoryVerdict,
    pub reasoning: String,
    /// Service's own risk estimate in `[0, 1]`, if it gave one
    pub risk_level: Option<f64>,
    /// Estimated cost of the operation, if the service priced it
    pub cost_estimate: Option<f64>,
}

/// Everything the service needs to judge one request.
#[derive(Debug, Clone, Serialize)]
pub struct RiskContext<'a> {
    pub agent_task: &'a str,
    pub repo_path: &'a str,
    pub payload: &'a Value,
    pub risk_score: f64,
    pub confidence_score: f64,
    pub budget_remaining: f64,
    pub priority: Priority,
    pub model: &'a str,
}

#[derive(Debug, Error)]
pub enum RiskServiceError {
    #[error("risk service unreachable: {0}")]
    Unreachable(String),

    #[error("risk service timed out")]
    Timeout,

    #[error("risk service returned malformed response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait RiskEvaluator: Send + Sync {
    async fn evaluate(&self, context: &RiskContext<'_>)
    -> Result<RiskAdvisory, RiskServiceError>;
}
