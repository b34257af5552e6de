//! Durable state store ports.
//!
//! The store is synchronous: the backing engine runs embedded in-process
//! and every call is a short transaction. Callers on the async runtime go
//! through `tokio::task::block_in_place` only if profiling ever shows the
//! need; in practice single-row reads and writes are microseconds.

use chrono::{DateTime, Utc};
use overseer_domain::{
    Agent, AgentId, AgentStatus, ApprovalRequest, Decision, EngineConfig, Feedback,
    FeedbackSample, InteractionEntry, InteractionType, NewDecision, NewEntry, RequestKind,
    SessionId, SessionSummary,
};
use serde_json::Value;
use thiserror::Error;

/// Errors surfaced by any store operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("approval request {0} is already resolved")]
    AlreadyResolved(i64),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("store is corrupt or unreadable: {0}")]
    Corrupt(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Persistence for agent records.
pub trait AgentStore: Send + Sync {
    fn insert_agent(&self, agent: &Agent) -> Result<(), StoreError>;

    fn get_agent(&self, id: &AgentId) -> Result<Agent, StoreError>;

    /// All agents, optionally including archived ones, newest first.
    fn list_agents(&self, include_archived: bool) -> Result<Vec<Agent>, StoreError>;

    fn update_agent_status(&self, id: &AgentId, status: AgentStatus) -> Result<(), StoreError>;

    fn record_agent_spend(&self, id: &AgentId, amount: f64) -> Result<(), StoreError>;

    /// Number of agents currently in a live status (active, working,
    /// waiting_approval).
    fn count_live_agents(&self) -> Result<usize, StoreError>;
}

/// Persistence for the approval queue.
pub trait ApprovalStore: Send + Sync {
    fn enqueue_request(
        &self,
        agent_id: &AgentId,
        kind: RequestKind,
        payload: &Value,
    ) -> Result<ApprovalRequest, StoreError>;

    fn get_request(&self, id: i64) -> Result<ApprovalRequest, StoreError>;

    /// All requests still awaiting resolution, oldest first.
    fn pending_requests(&self) -> Result<Vec<ApprovalRequest>, StoreError>;

    /// The open request blocking an agent, if any. The queue holds at most
    /// one open request per agent.
    fn open_request_for(&self, agent_id: &AgentId) -> Result<Option<ApprovalRequest>, StoreError>;

    /// Mark a pending request approved or denied.
    ///
    /// Returns `NotFound` for an unknown id and `AlreadyResolved` for a
    /// request that was resolved earlier; callers need to tell the two
    /// apart.
    fn resolve_request(&self, id: i64, approved: bool) -> Result<ApprovalRequest, StoreError>;
}

/// Persistence for decision records and the feedback attached to them.
pub trait DecisionStore: Send + Sync {
    fn insert_decision(&self, decision: &NewDecision) -> Result<Decision, StoreError>;

    fn get_decision(&self, id: i64) -> Result<Decision, StoreError>;

    /// Most recent decisions, newest first.
    fn recent_decisions(&self, limit: usize) -> Result<Vec<Decision>, StoreError>;

    /// Attach feedback to a decision. Feedback is permanent: a second
    /// attach fails with `Conflict` and leaves the first verdict in place.
    fn attach_feedback(&self, id: i64, feedback: Feedback) -> Result<(), StoreError>;

    /// Confidence/feedback pairs for decisions with feedback recorded at or
    /// after `since`. This is the confidence computation's input window.
    fn feedback_since(&self, since: DateTime<Utc>) -> Result<Vec<FeedbackSample>, StoreError>;

    /// Aggregate counts over all decisions ever recorded.
    fn decision_tally(&self) -> Result<DecisionTally, StoreError>;
}

/// Outcome and feedback counts over the whole decision history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecisionTally {
    pub total: u64,
    pub approvals: u64,
    pub denials: u64,
    pub escalations: u64,
    pub feedback_correct: u64,
    pub feedback_incorrect: u64,
}

/// Persistence for the interaction log.
pub trait InteractionStore: Send + Sync {
    fn append_entry(&self, entry: &NewEntry) -> Result<i64, StoreError>;

    /// Entries matching the filter. Plain retrieval is oldest first, in
    /// append order; a free-text search returns newest first.
    fn query_entries(&self, filter: &EntryFilter) -> Result<Vec<InteractionEntry>, StoreError>;

    /// Sessions for one agent with first/last timestamps and counts.
    fn sessions_for(&self, agent_id: &AgentId) -> Result<Vec<SessionSummary>, StoreError>;
}

/// Filter for interaction log queries. Empty filter means everything.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub agent_id: Option<AgentId>,
    pub session_id: Option<SessionId>,
    pub kind: Option<InteractionType>,
    /// Case-insensitive substring search over entry content. When set,
    /// results come back newest first.
    pub search: Option<String>,
    /// Cap on returned rows: the most recent N. `None` means no cap.
    pub limit: Option<usize>,
}

/// Persistence for the runtime-mutable engine configuration.
pub trait ConfigStore: Send + Sync {
    /// Load the persisted engine config, falling back to defaults when no
    /// row exists yet.
    fn load_engine_config(&self) -> Result<EngineConfig, StoreError>;

    fn save_engine_config(&self, config: &EngineConfig) -> Result<(), StoreError>;
}

/// The full store surface the use cases depend on.
pub trait Store:
    AgentStore + ApprovalStore + DecisionStore + InteractionStore + ConfigStore
{
}

impl<T> Store for T where
    T: AgentStore + ApprovalStore + DecisionStore + InteractionStore + ConfigStore
{
}
