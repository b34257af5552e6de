//! Approval domain entities: pending requests and decision records

use crate::agent::value_objects::AgentId;
use crate::approval::autonomy::AutonomyLevel;
use crate::core::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// What kind of action a pending approval request covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// A tool invocation escalated by the decision rule
    ToolRequest,
    /// A paid operation blocked by the budget guard
    BudgetExceeded,
    /// A permission-denied signal from the subprocess
    PermissionDenied,
}

impl RequestKind {
    pub fn as_str(&self) -> &str {
        match self {
            RequestKind::ToolRequest => "tool_request",
            RequestKind::BudgetExceeded => "budget_exceeded",
            RequestKind::PermissionDenied => "permission_denied",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RequestKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tool_request" => Ok(RequestKind::ToolRequest),
            "budget_exceeded" => Ok(RequestKind::BudgetExceeded),
            "permission_denied" => Ok(RequestKind::PermissionDenied),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Resolution state of an approval request. Resolved rows are kept so a
/// second resolution attempt can be told apart from an unknown id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Denied,
}

impl RequestStatus {
    pub fn as_str(&self) -> &str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Denied => "denied",
        }
    }
}

impl FromStr for RequestStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "denied" => Ok(RequestStatus::Denied),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// A pending decision blocking one agent.
///
/// Exists from the moment the engine escalates until an external caller
/// approves or denies it. At most one open request blocks a given agent at
/// a time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Monotonic identifier assigned by the store
    pub id: i64,
    /// The blocked agent
    pub agent_id: AgentId,
    /// Kind of action being held
    pub kind: RequestKind,
    /// Opaque request payload as emitted by the agent
    pub payload: Value,
    /// Resolution state
    pub status: RequestStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl ApprovalRequest {
    pub fn is_open(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

/// Outcome of one approval engine evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    Approve,
    Deny,
    Escalate,
}

impl DecisionOutcome {
    pub fn as_str(&self) -> &str {
        match self {
            DecisionOutcome::Approve => "approve",
            DecisionOutcome::Deny => "deny",
            DecisionOutcome::Escalate => "escalate",
        }
    }
}

impl std::fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DecisionOutcome {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(DecisionOutcome::Approve),
            "deny" => Ok(DecisionOutcome::Deny),
            "escalate" => Ok(DecisionOutcome::Escalate),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Later user verdict on a decision. Once attached it is permanent and
/// feeds future confidence computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Correct,
    Incorrect,
}

impl Feedback {
    pub fn as_str(&self) -> &str {
        match self {
            Feedback::Correct => "correct",
            Feedback::Incorrect => "incorrect",
        }
    }
}

impl FromStr for Feedback {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "correct" => Ok(Feedback::Correct),
            "incorrect" => Ok(Feedback::Incorrect),
            other => Err(DomainError::InvalidFeedback(other.to_string())),
        }
    }
}

/// A decision to be persisted (before the store assigns an id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDecision {
    pub agent_id: AgentId,
    pub payload: Value,
    pub outcome: DecisionOutcome,
    pub risk_score: f64,
    pub confidence_score: f64,
    pub autonomy_level: AutonomyLevel,
    pub model_used: String,
    /// Human-readable justification, usually from the advisory service
    pub reasoning: Option<String>,
    /// True when the advisory service was unreachable and the numeric rule
    /// ran alone
    pub degraded: bool,
}

/// An immutable record of an approval engine outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    /// Monotonic identifier assigned by the store
    pub id: i64,
    pub agent_id: AgentId,
    pub payload: Value,
    pub outcome: DecisionOutcome,
    pub risk_score: f64,
    pub confidence_score: f64,
    pub autonomy_level: AutonomyLevel,
    pub model_used: String,
    pub reasoning: Option<String>,
    pub degraded: bool,
    /// Attached after the fact via the feedback command
    pub feedback: Option<Feedback>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_parsing() {
        assert_eq!("correct".parse::<Feedback>().unwrap(), Feedback::Correct);
        assert_eq!(
            "incorrect".parse::<Feedback>().unwrap(),
            Feedback::Incorrect
        );
        assert!("maybe".parse::<Feedback>().is_err());
    }

    #[test]
    fn test_request_open_state() {
        let request = ApprovalRequest {
            id: 1,
            agent_id: AgentId::new("a1"),
            kind: RequestKind::ToolRequest,
            payload: serde_json::json!({"tool": "edit"}),
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        };
        assert!(request.is_open());

        let resolved = ApprovalRequest {
            status: RequestStatus::Approved,
            ..request
        };
        assert!(!resolved.is_open());
    }

    #[test]
    fn test_outcome_round_trip() {
        for outcome in [
            DecisionOutcome::Approve,
            DecisionOutcome::Deny,
            DecisionOutcome::Escalate,
        ] {
            assert_eq!(
                outcome.as_str().parse::<DecisionOutcome>().unwrap(),
                outcome
            );
        }
    }
}
