//! Agent domain entities

use super::value_objects::{AgentId, Budget};
use crate::core::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle status of a supervised agent.
///
/// Transitions are monotonic except the `Working` <-> `WaitingApproval`
/// cycle; see [`AgentStatus::can_transition`] for the exhaustive table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Created but the subprocess has not been spawned yet
    Idle,
    /// Subprocess spawn requested
    Active,
    /// Subprocess is emitting output and tool requests
    Working,
    /// Blocked on an escalated approval request
    WaitingApproval,
    /// Subprocess finished successfully
    Completed,
    /// Subprocess crashed beyond the retry budget or was terminated
    Failed,
    /// Terminal record kept for history; no further transitions
    Archived,
}

impl AgentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Active => "active",
            AgentStatus::Working => "working",
            AgentStatus::WaitingApproval => "waiting_approval",
            AgentStatus::Completed => "completed",
            AgentStatus::Failed => "failed",
            AgentStatus::Archived => "archived",
        }
    }

    /// Whether the agent has stopped doing work. Archival is still allowed
    /// from `Completed` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AgentStatus::Completed | AgentStatus::Failed | AgentStatus::Archived
        )
    }

    /// Whether a subprocess is (or should be) running in this status.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            AgentStatus::Active | AgentStatus::Working | AgentStatus::WaitingApproval
        )
    }

    /// Exhaustive transition table for the lifecycle state machine.
    pub fn can_transition(&self, to: AgentStatus) -> bool {
        use AgentStatus::*;
        matches!(
            (self, to),
            (Idle, Active)
                | (Active, Working)
                | (Active, Failed)
                | (Working, WaitingApproval)
                | (WaitingApproval, Working)
                | (Working, Completed)
                | (Working, Failed)
                | (WaitingApproval, Failed)
                | (Completed, Archived)
                | (Failed, Archived)
        )
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AgentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(AgentStatus::Idle),
            "active" => Ok(AgentStatus::Active),
            "working" => Ok(AgentStatus::Working),
            "waiting_approval" => Ok(AgentStatus::WaitingApproval),
            "completed" => Ok(AgentStatus::Completed),
            "failed" => Ok(AgentStatus::Failed),
            "archived" => Ok(AgentStatus::Archived),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Scheduling priority for an agent's task. Ordered so that `High` sorts
/// above `Normal` above `Low`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Priority {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            other => Err(DomainError::InvalidPriority(other.to_string())),
        }
    }
}

/// One supervised unit of work (Entity).
///
/// Owned exclusively by the supervisor: created on task submission, mutated
/// only through lifecycle transitions, never deleted — terminal agents are
/// archived, not purged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Short unique token identifying this agent
    pub id: AgentId,
    /// The task the agent was asked to carry out
    pub task: String,
    /// Path to the isolated repository workspace
    pub repo_path: String,
    /// Current lifecycle status
    pub status: AgentStatus,
    /// Scheduling priority
    pub priority: Priority,
    /// Monetary budget ceiling and spend
    pub budget: Budget,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(
        id: AgentId,
        task: impl Into<String>,
        repo_path: impl Into<String>,
        priority: Priority,
        budget: Budget,
    ) -> Result<Self, DomainError> {
        let task = task.into();
        if task.trim().is_empty() {
            return Err(DomainError::EmptyTask);
        }
        Ok(Self {
            id,
            task,
            repo_path: repo_path.into(),
            status: AgentStatus::Idle,
            priority,
            budget,
            created_at: Utc::now(),
        })
    }

    /// Apply a lifecycle transition, enforcing the state machine table.
    pub fn transition(&mut self, to: AgentStatus) -> Result<(), DomainError> {
        if !self.status.can_transition(to) {
            return Err(DomainError::InvalidTransition {
                from: self.status.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        self.status = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_agent() -> Agent {
        Agent::new(
            AgentId::new("a1b2c3d4"),
            "Fix authentication bug",
            "/repos/webapp",
            Priority::High,
            Budget::new(200.0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_task_rejected() {
        let result = Agent::new(
            AgentId::new("x"),
            "   ",
            "/repo",
            Priority::Normal,
            Budget::new(100.0).unwrap(),
        );
        assert!(matches!(result, Err(DomainError::EmptyTask)));
    }

    #[test]
    fn test_happy_path_lifecycle() {
        let mut agent = test_agent();
        assert_eq!(agent.status, AgentStatus::Idle);

        agent.transition(AgentStatus::Active).unwrap();
        agent.transition(AgentStatus::Working).unwrap();
        agent.transition(AgentStatus::Completed).unwrap();
        agent.transition(AgentStatus::Archived).unwrap();

        assert!(agent.status.is_terminal());
    }

    #[test]
    fn test_approval_cycle_is_reversible() {
        let mut agent = test_agent();
        agent.transition(AgentStatus::Active).unwrap();
        agent.transition(AgentStatus::Working).unwrap();

        // The only backward edge in the machine
        agent.transition(AgentStatus::WaitingApproval).unwrap();
        agent.transition(AgentStatus::Working).unwrap();
        agent.transition(AgentStatus::WaitingApproval).unwrap();
        agent.transition(AgentStatus::Working).unwrap();

        assert_eq!(agent.status, AgentStatus::Working);
    }

    #[test]
    fn test_no_backward_transitions() {
        let mut agent = test_agent();
        agent.transition(AgentStatus::Active).unwrap();
        agent.transition(AgentStatus::Working).unwrap();
        agent.transition(AgentStatus::Completed).unwrap();

        assert!(agent.transition(AgentStatus::Working).is_err());
        assert!(agent.transition(AgentStatus::Idle).is_err());
    }

    #[test]
    fn test_archived_is_final() {
        for status in [
            AgentStatus::Idle,
            AgentStatus::Active,
            AgentStatus::Working,
            AgentStatus::WaitingApproval,
            AgentStatus::Completed,
            AgentStatus::Failed,
        ] {
            assert!(!AgentStatus::Archived.can_transition(status));
        }
    }

    #[test]
    fn test_failure_reachable_while_waiting() {
        let mut agent = test_agent();
        agent.transition(AgentStatus::Active).unwrap();
        agent.transition(AgentStatus::Working).unwrap();
        agent.transition(AgentStatus::WaitingApproval).unwrap();
        agent.transition(AgentStatus::Failed).unwrap();
        assert_eq!(agent.status, AgentStatus::Failed);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            AgentStatus::Idle,
            AgentStatus::Active,
            AgentStatus::Working,
            AgentStatus::WaitingApproval,
            AgentStatus::Completed,
            AgentStatus::Failed,
            AgentStatus::Archived,
        ] {
            assert_eq!(status.as_str().parse::<AgentStatus>().unwrap(), status);
        }
    }
}
