//! In-memory store used by the use case tests.

use crate::ports::store::{
    AgentStore, ApprovalStore, ConfigStore, DecisionStore, DecisionTally, EntryFilter,
    InteractionStore, StoreError,
};
use chrono::{DateTime, Utc};
use overseer_domain::{
    Agent, AgentId, AgentStatus, ApprovalRequest, Decision, DecisionOutcome, EngineConfig,
    Feedback, FeedbackSample, InteractionEntry, NewDecision, NewEntry, RequestKind, RequestStatus,
    SessionSummary,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct State {
    agents: HashMap<AgentId, Agent>,
    requests: Vec<ApprovalRequest>,
    decisions: Vec<Decision>,
    entries: Vec<InteractionEntry>,
    config: Option<EngineConfig>,
    next_request_id: i64,
    next_decision_id: i64,
    next_entry_id: i64,
}

/// Non-durable store with the same semantics as the production backend.
#[derive(Default)]
pub(crate) struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

fn lock(state: &Mutex<State>) -> std::sync::MutexGuard<'_, State> {
    // Test-only store; a poisoned lock means a test already panicked.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl AgentStore for MemoryStore {
    fn insert_agent(&self, agent: &Agent) -> Result<(), StoreError> {
        let mut state = lock(&self.state);
        if state.agents.contains_key(&agent.id) {
            return Err(StoreError::Constraint(format!(
                "agent {} already exists",
                agent.id
            )));
        }
        state.agents.insert(agent.id.clone(), agent.clone());
        Ok(())
    }

    fn get_agent(&self, id: &AgentId) -> Result<Agent, StoreError> {
        lock(&self.state)
            .agents
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("agent {id}")))
    }

    fn list_agents(&self, include_archived: bool) -> Result<Vec<Agent>, StoreError> {
        let state = lock(&self.state);
        let mut agents: Vec<Agent> = state
            .agents
            .values()
            .filter(|a| include_archived || a.status != AgentStatus::Archived)
            .cloned()
            .collect();
        agents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(agents)
    }

    fn update_agent_status(&self, id: &AgentId, status: AgentStatus) -> Result<(), StoreError> {
        let mut state = lock(&self.state);
        let agent = state
            .agents
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("agent {id}")))?;
        agent.status = status;
        Ok(())
    }

    fn record_agent_spend(&self, id: &AgentId, amount: f64) -> Result<(), StoreError> {
        let mut state = lock(&self.state);
        let agent = state
            .agents
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("agent {id}")))?;
        agent.budget.record_spend(amount);
        Ok(())
    }

    fn count_live_agents(&self) -> Result<usize, StoreError> {
        Ok(lock(&self.state)
            .agents
            .values()
            .filter(|a| a.status.is_live())
            .count())
    }
}

impl ApprovalStore for MemoryStore {
    fn enqueue_request(
        &self,
        agent_id: &AgentId,
        kind: RequestKind,
        payload: &Value,
    ) -> Result<ApprovalRequest, StoreError> {
        let mut state = lock(&self.state);
        if state
            .requests
            .iter()
            .any(|r| r.agent_id == *agent_id && r.is_open())
        {
            return Err(StoreError::Constraint(format!(
                "agent {agent_id} already has an open request"
            )));
        }
        state.next_request_id += 1;
        let request = ApprovalRequest {
            id: state.next_request_id,
            agent_id: agent_id.clone(),
            kind,
            payload: payload.clone(),
            status: RequestStatus::Pending,
            created_at: Utc::now(),
        };
        state.requests.push(request.clone());
        Ok(request)
    }

    fn get_request(&self, id: i64) -> Result<ApprovalRequest, StoreError> {
        lock(&self.state)
            .requests
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("request {id}")))
    }

    fn pending_requests(&self) -> Result<Vec<ApprovalRequest>, StoreError> {
        Ok(lock(&self.state)
            .requests
            .iter()
            .filter(|r| r.is_open())
            .cloned()
            .collect())
    }

    fn open_request_for(&self, agent_id: &AgentId) -> Result<Option<ApprovalRequest>, StoreError> {
        Ok(lock(&self.state)
            .requests
            .iter()
            .find(|r| r.agent_id == *agent_id && r.is_open())
            .cloned())
    }

    fn resolve_request(&self, id: i64, approved: bool) -> Result<ApprovalRequest, StoreError> {
        let mut state = lock(&self.state);
        let request = state
            .requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("request {id}")))?;
        if !request.is_open() {
            return Err(StoreError::AlreadyResolved(id));
        }
        request.status = if approved {
            RequestStatus::Approved
        } else {
            RequestStatus::Denied
        };
        Ok(request.clone())
    }
}

impl DecisionStore for MemoryStore {
    fn insert_decision(&self, decision: &NewDecision) -> Result<Decision, StoreError> {
        let mut state = lock(&self.state);
        state.next_decision_id += 1;
        let record = Decision {
            id: state.next_decision_id,
            agent_id: decision.agent_id.clone(),
            payload: decision.payload.clone(),
            outcome: decision.outcome,
            risk_score: decision.risk_score,
            confidence_score: decision.confidence_score,
            autonomy_level: decision.autonomy_level,
            model_used: decision.model_used.clone(),
            reasoning: decision.reasoning.clone(),
            degraded: decision.degraded,
            feedback: None,
            created_at: Utc::now(),
        };
        state.decisions.push(record.clone());
        Ok(record)
    }

    fn get_decision(&self, id: i64) -> Result<Decision, StoreError> {
        lock(&self.state)
            .decisions
            .iter()
            .find(|d| d.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("decision {id}")))
    }

    fn recent_decisions(&self, limit: usize) -> Result<Vec<Decision>, StoreError> {
        let state = lock(&self.state);
        Ok(state.decisions.iter().rev().take(limit).cloned().collect())
    }

    fn attach_feedback(&self, id: i64, feedback: Feedback) -> Result<(), StoreError> {
        let mut state = lock(&self.state);
        let decision = state
            .decisions
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("decision {id}")))?;
        if decision.feedback.is_some() {
            return Err(StoreError::Conflict(format!(
                "decision {id} already has feedback"
            )));
        }
        decision.feedback = Some(feedback);
        Ok(())
    }

    fn feedback_since(&self, since: DateTime<Utc>) -> Result<Vec<FeedbackSample>, StoreError> {
        Ok(lock(&self.state)
            .decisions
            .iter()
            .filter(|d| d.created_at >= since)
            .filter_map(|d| {
                d.feedback.map(|feedback| FeedbackSample {
                    confidence: d.confidence_score,
                    feedback,
                })
            })
            .collect())
    }

    fn decision_tally(&self) -> Result<DecisionTally, StoreError> {
        let state = lock(&self.state);
        let mut tally = DecisionTally::default();
        for decision in &state.decisions {
            tally.total += 1;
            match decision.outcome {
                DecisionOutcome::Approve => tally.approvals += 1,
                DecisionOutcome::Deny => tally.denials += 1,
                DecisionOutcome::Escalate => tally.escalations += 1,
            }
            match decision.feedback {
                Some(Feedback::Correct) => tally.feedback_correct += 1,
                Some(Feedback::Incorrect) => tally.feedback_incorrect += 1,
                None => {}
            }
        }
        Ok(tally)
    }
}

impl InteractionStore for MemoryStore {
    fn append_entry(&self, entry: &NewEntry) -> Result<i64, StoreError> {
        let mut state = lock(&self.state);
        state.next_entry_id += 1;
        let id = state.next_entry_id;
        state.entries.push(InteractionEntry {
            id,
            agent_id: entry.agent_id.clone(),
            session_id: entry.session_id.clone(),
            kind: entry.kind,
            direction: entry.direction,
            content: entry.content.clone(),
            metadata: entry.metadata.clone(),
            timestamp: Utc::now(),
        });
        Ok(id)
    }

    fn query_entries(&self, filter: &EntryFilter) -> Result<Vec<InteractionEntry>, StoreError> {
        let state = lock(&self.state);
        let term = filter.search.as_ref().map(|t| t.to_lowercase());
        // Newest first so the limit keeps the most recent entries.
        let mut entries: Vec<InteractionEntry> = state
            .entries
            .iter()
            .rev()
            .filter(|e| filter.agent_id.as_ref().is_none_or(|id| e.agent_id == *id))
            .filter(|e| {
                filter
                    .session_id
                    .as_ref()
                    .is_none_or(|id| e.session_id == *id)
            })
            .filter(|e| filter.kind.is_none_or(|k| e.kind == k))
            .filter(|e| {
                term.as_ref()
                    .is_none_or(|t| e.content.to_lowercase().contains(t))
            })
            .cloned()
            .collect();
        if let Some(limit) = filter.limit {
            entries.truncate(limit);
        }
        if filter.search.is_none() {
            entries.reverse();
        }
        Ok(entries)
    }

    fn sessions_for(&self, agent_id: &AgentId) -> Result<Vec<SessionSummary>, StoreError> {
        let state = lock(&self.state);
        let mut sessions: HashMap<String, SessionSummary> = HashMap::new();
        for entry in state.entries.iter().filter(|e| e.agent_id == *agent_id) {
            sessions
                .entry(entry.session_id.as_str().to_string())
                .and_modify(|s| {
                    s.last_entry = s.last_entry.max(entry.timestamp);
                    s.first_entry = s.first_entry.min(entry.timestamp);
                    s.entry_count += 1;
                })
                .or_insert_with(|| SessionSummary {
                    session_id: entry.session_id.clone(),
                    first_entry: entry.timestamp,
                    last_entry: entry.timestamp,
                    entry_count: 1,
                });
        }
        let mut summaries: Vec<SessionSummary> = sessions.into_values().collect();
        summaries.sort_by(|a, b| a.first_entry.cmp(&b.first_entry));
        Ok(summaries)
    }
}

impl ConfigStore for MemoryStore {
    fn load_engine_config(&self) -> Result<EngineConfig, StoreError> {
        Ok(lock(&self.state).config.clone().unwrap_or_default())
    }

    fn save_engine_config(&self, config: &EngineConfig) -> Result<(), StoreError> {
        lock(&self.state).config = Some(config.clone());
        Ok(())
    }
}
