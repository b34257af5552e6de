//! Interaction log entities

use crate::agent::value_objects::{AgentId, SessionId};
use crate::core::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// Type of one logged interaction event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    /// The agent asked the supervisor for something (usually a tool call)
    AgentRequest,
    /// The supervisor answered (decision, resolution)
    ManagerResponse,
    /// Free-form output emitted by the agent
    AgentOutput,
    /// Supervisor-internal event (spawn, restart, archive)
    SystemEvent,
}

impl InteractionType {
    pub fn as_str(&self) -> &str {
        match self {
            InteractionType::AgentRequest => "agent_request",
            InteractionType::ManagerResponse => "manager_response",
            InteractionType::AgentOutput => "agent_output",
            InteractionType::SystemEvent => "system_event",
        }
    }
}

impl std::fmt::Display for InteractionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InteractionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agent_request" => Ok(InteractionType::AgentRequest),
            "manager_response" => Ok(InteractionType::ManagerResponse),
            "agent_output" => Ok(InteractionType::AgentOutput),
            "system_event" => Ok(InteractionType::SystemEvent),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// Direction of one logged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    AgentToSupervisor,
    SupervisorToAgent,
    System,
}

impl Direction {
    pub fn as_str(&self) -> &str {
        match self {
            Direction::AgentToSupervisor => "agent_to_supervisor",
            Direction::SupervisorToAgent => "supervisor_to_agent",
            Direction::System => "system",
        }
    }
}

impl FromStr for Direction {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agent_to_supervisor" => Ok(Direction::AgentToSupervisor),
            "supervisor_to_agent" => Ok(Direction::SupervisorToAgent),
            "system" => Ok(Direction::System),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// An entry to append (before the store assigns an id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEntry {
    pub agent_id: AgentId,
    pub session_id: SessionId,
    pub kind: InteractionType,
    pub direction: Direction,
    pub content: String,
    pub metadata: Option<Value>,
}

/// An append-only, ordered interaction event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEntry {
    pub id: i64,
    pub agent_id: AgentId,
    pub session_id: SessionId,
    pub kind: InteractionType,
    pub direction: Direction,
    pub content: String,
    pub metadata: Option<Value>,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate view of one session, derived purely from its entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub first_entry: DateTime<Utc>,
    pub last_entry: DateTime<Utc>,
    pub entry_count: u64,
}
