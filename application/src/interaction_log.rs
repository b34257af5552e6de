//! Interaction logging helper.
//!
//! Thin wrapper over the interaction store that swallows write failures:
//! losing a log line must never stall supervision, so errors are reported
//! via tracing and dropped.

use crate::ports::store::Store;
use overseer_domain::{AgentId, Direction, InteractionType, NewEntry, SessionId};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct InteractionLogger {
    store: Arc<dyn Store>,
}

impl InteractionLogger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub fn record(&self, entry: NewEntry) {
        if let Err(e) = self.store.append_entry(&entry) {
            warn!(
                agent_id = %entry.agent_id,
                kind = entry.kind.as_str(),
                error = %e,
                "failed to append interaction log entry"
            );
        }
    }

    pub fn agent_request(
        &self,
        agent_id: &AgentId,
        session_id: &SessionId,
        content: impl Into<String>,
        metadata: Option<Value>,
    ) {
        self.record(NewEntry {
            agent_id: agent_id.clone(),
            session_id: session_id.clone(),
            kind: InteractionType::AgentRequest,
            direction: Direction::AgentToSupervisor,
            content: content.into(),
            metadata,
        });
    }

    pub fn manager_response(
        &self,
        agent_id: &AgentId,
        session_id: &SessionId,
        content: impl Into<String>,
        metadata: Option<Value>,
    ) {
        self.record(NewEntry {
            agent_id: agent_id.clone(),
            session_id: session_id.clone(),
            kind: InteractionType::ManagerResponse,
            direction: Direction::SupervisorToAgent,
            content: content.into(),
            metadata,
        });
    }

    pub fn agent_output(
        &self,
        agent_id: &AgentId,
        session_id: &SessionId,
        content: impl Into<String>,
    ) {
        self.record(NewEntry {
            agent_id: agent_id.clone(),
            session_id: session_id.clone(),
            kind: InteractionType::AgentOutput,
            direction: Direction::AgentToSupervisor,
            content: content.into(),
            metadata: None,
        });
    }

    pub fn system_event(
        &self,
        agent_id: &AgentId,
        session_id: &SessionId,
        content: impl Into<String>,
    ) {
        self.record(NewEntry {
            agent_id: agent_id.clone(),
            session_id: session_id.clone(),
            kind: InteractionType::SystemEvent,
            direction: Direction::System,
            content: content.into(),
            metadata: None,
        });
    }
}
