//! The agent supervisor: owns subprocess lifecycles end to end.
//!
//! Each started agent gets a monitor task that drives its subprocess:
//! reading events, routing tool requests through the approval engine,
//! parking the agent while an escalated request awaits a human verdict,
//! and restarting crashed subprocesses within the retry budget. Control
//! plane calls reach a running monitor through a per-agent channel.

use crate::interaction_log::InteractionLogger;
use crate::ports::agent_process::{AgentEvent, AgentLauncher, AgentProcessHandle, ProcessError};
use crate::ports::notifier::{Notification, Notifier};
use crate::ports::store::{EntryFilter, Store, StoreError};
use crate::use_cases::evaluate_request::{ApprovalEngine, EngineError};
use crate::use_cases::stats::{StatsReport, compute_stats};
use overseer_domain::{
    Agent, AgentId, AgentStatus, ApprovalRequest, Budget, Decision, DecisionOutcome, DomainError,
    EngineConfig, Feedback, InteractionEntry, Priority, RequestKind, SessionId, SessionSummary,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Operational limits for the supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorLimits {
    /// Hard cap on agents in a live status at once
    pub max_concurrent_agents: usize,
    /// How many crashes a subprocess may survive before the agent fails
    pub restart_budget: u32,
    /// After this long a pending approval is flagged as overdue
    pub approval_timeout: Duration,
}

impl Default for SupervisorLimits {
    fn default() -> Self {
        Self {
            max_concurrent_agents: 8,
            restart_budget: 3,
            approval_timeout: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("agent {0} not found")]
    AgentNotFound(AgentId),

    #[error("approval request {0} not found")]
    RequestNotFound(i64),

    #[error("approval request {0} is already resolved")]
    AlreadyResolved(i64),

    #[error("decision {0} not found")]
    DecisionNotFound(i64),

    #[error("decision {0} already has feedback")]
    FeedbackAlreadyRecorded(i64),

    #[error("repository path is not a directory: {0}")]
    InvalidRepoPath(String),

    #[error("agent limit reached ({0} live)")]
    AgentLimitReached(usize),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Commands a monitor task accepts from the control plane.
#[derive(Debug)]
enum AgentControl {
    Resolution { request_id: i64, approved: bool },
    Terminate,
}

struct AgentHandle {
    control: mpsc::Sender<AgentControl>,
    task: JoinHandle<()>,
}

/// How one subprocess session ended, as seen by the monitor loop.
enum SessionEnd {
    /// Agent reached a terminal status; stop monitoring
    Finished,
    /// Subprocess died without a result event; restart may apply
    Crashed,
    /// Operator terminated the agent
    Terminated,
}

/// What the event handler wants the session loop to do next.
enum EventFlow {
    Continue,
    Finished,
    Terminated,
    Crashed,
}

pub struct Supervisor {
    store: Arc<dyn Store>,
    engine: ApprovalEngine,
    launcher: Arc<dyn AgentLauncher>,
    notifier: Arc<dyn Notifier>,
    logger: InteractionLogger,
    limits: SupervisorLimits,
    agents: Mutex<HashMap<AgentId, AgentHandle>>,
    /// Request ids already reported as overdue, so each is flagged once
    overdue_flagged: Mutex<HashSet<i64>>,
}

impl Supervisor {
    pub fn new(
        store: Arc<dyn Store>,
        engine: ApprovalEngine,
        launcher: Arc<dyn AgentLauncher>,
        notifier: Arc<dyn Notifier>,
        limits: SupervisorLimits,
    ) -> Self {
        let logger = InteractionLogger::new(store.clone());
        Self {
            store,
            engine,
            launcher,
            notifier,
            logger,
            limits,
            agents: Mutex::new(HashMap::new()),
            overdue_flagged: Mutex::new(HashSet::new()),
        }
    }

    /// Register a new agent in `Idle`. The daemon picks it up on the next
    /// scheduling pass.
    pub fn submit(
        &self,
        task: impl Into<String>,
        repo_path: impl Into<String>,
        priority: Priority,
        budget_ceiling: f64,
    ) -> Result<Agent, SupervisorError> {
        let repo_path = repo_path.into();
        if !Path::new(&repo_path).is_dir() {
            return Err(SupervisorError::InvalidRepoPath(repo_path));
        }

        let id = AgentId::from_uuid(&Uuid::new_v4().to_string());
        let agent = Agent::new(
            id,
            task,
            repo_path,
            priority,
            Budget::new(budget_ceiling)?,
        )?;
        self.store.insert_agent(&agent)?;

        info!(agent_id = %agent.id, priority = %agent.priority, "agent submitted");
        Ok(agent)
    }

    /// Start one idle agent: transition to `Active` and spawn its monitor.
    pub async fn start(self: &Arc<Self>, agent_id: &AgentId) -> Result<(), SupervisorError> {
        let live = self.store.count_live_agents()?;
        if live >= self.limits.max_concurrent_agents {
            return Err(SupervisorError::AgentLimitReached(live));
        }

        let mut agent = self.load_agent(agent_id)?;
        agent.transition(AgentStatus::Active)?;
        self.store.update_agent_status(agent_id, AgentStatus::Active)?;

        let (tx, rx) = mpsc::channel(16);
        let task = tokio::spawn(Self::monitor(self.clone(), agent_id.clone(), rx));
        self.agents
            .lock()
            .await
            .insert(agent_id.clone(), AgentHandle { control: tx, task });

        info!(agent_id = %agent_id, "agent started");
        Ok(())
    }

    /// Start idle agents (highest priority first, then oldest) until the
    /// concurrency cap is reached. Returns how many were started.
    pub async fn start_pending(self: &Arc<Self>) -> Result<usize, SupervisorError> {
        let mut idle: Vec<Agent> = self
            .store
            .list_agents(false)?
            .into_iter()
            .filter(|a| a.status == AgentStatus::Idle)
            .collect();
        idle.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.created_at.cmp(&b.created_at))
        });

        let mut started = 0;
        for agent in idle {
            match self.start(&agent.id).await {
                Ok(()) => started += 1,
                Err(SupervisorError::AgentLimitReached(_)) => break,
                Err(e) => {
                    warn!(agent_id = %agent.id, error = %e, "failed to start agent");
                }
            }
        }
        Ok(started)
    }

    /// Resolve a pending approval request.
    ///
    /// An unknown id and an already-resolved one are distinct errors so
    /// callers can react idempotently.
    pub async fn resolve(
        &self,
        request_id: i64,
        approved: bool,
    ) -> Result<ApprovalRequest, SupervisorError> {
        let request = self
            .store
            .resolve_request(request_id, approved)
            .map_err(|e| match e {
                StoreError::NotFound(_) => SupervisorError::RequestNotFound(request_id),
                StoreError::AlreadyResolved(id) => SupervisorError::AlreadyResolved(id),
                other => SupervisorError::Store(other),
            })?;

        let agents = self.agents.lock().await;
        if let Some(handle) = agents.get(&request.agent_id) {
            if handle
                .control
                .send(AgentControl::Resolution {
                    request_id,
                    approved,
                })
                .await
                .is_err()
            {
                warn!(agent_id = %request.agent_id, request_id, "monitor gone, resolution recorded but not relayed");
            }
        } else {
            // No live monitor (e.g. the daemon restarted since the
            // escalation). Record the state change so a later start sees it.
            warn!(agent_id = %request.agent_id, request_id, "resolved request for an agent with no running monitor");
            if let Ok(agent) = self.store.get_agent(&request.agent_id)
                && agent.status == AgentStatus::WaitingApproval
            {
                let _ = self
                    .store
                    .update_agent_status(&request.agent_id, AgentStatus::Working);
            }
        }
        Ok(request)
    }

    /// Stop an agent's subprocess and mark it failed.
    pub async fn terminate(&self, agent_id: &AgentId) -> Result<(), SupervisorError> {
        let agents = self.agents.lock().await;
        if let Some(handle) = agents.get(agent_id) {
            if handle.control.send(AgentControl::Terminate).await.is_ok() {
                return Ok(());
            }
        }
        drop(agents);

        // No monitor: flip the stored status directly.
        let mut agent = self.load_agent(agent_id)?;
        agent.transition(AgentStatus::Failed)?;
        self.store
            .update_agent_status(agent_id, AgentStatus::Failed)?;
        Ok(())
    }

    /// Archive one terminal agent.
    pub fn archive(&self, agent_id: &AgentId) -> Result<(), SupervisorError> {
        let mut agent = self.load_agent(agent_id)?;
        agent.transition(AgentStatus::Archived)?;
        self.store
            .update_agent_status(agent_id, AgentStatus::Archived)?;
        info!(agent_id = %agent_id, "agent archived");
        Ok(())
    }

    /// Archive completed and failed agents older than `older_than`.
    /// Returns how many were archived.
    pub fn archive_finished(
        &self,
        older_than: chrono::Duration,
    ) -> Result<usize, SupervisorError> {
        let cutoff = chrono::Utc::now() - older_than;
        let mut archived = 0;
        for agent in self.store.list_agents(false)? {
            let terminal = matches!(agent.status, AgentStatus::Completed | AgentStatus::Failed);
            if terminal && agent.created_at < cutoff {
                self.archive(&agent.id)?;
                archived += 1;
            }
        }
        Ok(archived)
    }

    /// Check pending requests against the approval timeout and notify for
    /// newly overdue ones. Requests stay open; timeouts never auto-resolve,
    /// and each request is flagged at most once.
    pub async fn flag_overdue_approvals(&self) -> Result<usize, SupervisorError> {
        let timeout = chrono::Duration::from_std(self.limits.approval_timeout)
            .unwrap_or_else(|_| chrono::Duration::hours(1));
        let cutoff = chrono::Utc::now() - timeout;

        let mut newly_overdue = Vec::new();
        {
            let mut flagged = self.overdue_flagged.lock().await;
            for request in self.store.pending_requests()? {
                if request.created_at < cutoff && flagged.insert(request.id) {
                    newly_overdue.push(request);
                }
            }
        }

        for request in &newly_overdue {
            warn!(agent_id = %request.agent_id, request_id = request.id, "approval request overdue");
            self.notifier
                .notify(Notification::ApprovalOverdue {
                    agent_id: request.agent_id.clone(),
                    request_id: request.id,
                })
                .await;
        }
        Ok(newly_overdue.len())
    }

    /// Terminate every running monitor and wait for them to finish.
    pub async fn shutdown(&self) {
        let handles: Vec<(AgentId, AgentHandle)> =
            self.agents.lock().await.drain().collect();
        for (agent_id, handle) in &handles {
            if handle.control.send(AgentControl::Terminate).await.is_err() {
                warn!(agent_id = %agent_id, "monitor already stopped");
            }
        }
        for (_, handle) in handles {
            let _ = handle.task.await;
        }
    }

    // Query surface for the control plane.

    pub fn agent(&self, agent_id: &AgentId) -> Result<Agent, SupervisorError> {
        self.load_agent(agent_id)
    }

    pub fn list_agents(&self, include_archived: bool) -> Result<Vec<Agent>, SupervisorError> {
        Ok(self.store.list_agents(include_archived)?)
    }

    pub fn pending_requests(&self) -> Result<Vec<ApprovalRequest>, SupervisorError> {
        Ok(self.store.pending_requests()?)
    }

    pub fn decision_history(&self, limit: usize) -> Result<Vec<Decision>, SupervisorError> {
        Ok(self.store.recent_decisions(limit)?)
    }

    pub fn record_feedback(
        &self,
        decision_id: i64,
        feedback: Feedback,
    ) -> Result<(), SupervisorError> {
        self.store
            .attach_feedback(decision_id, feedback)
            .map_err(|e| match e {
                StoreError::NotFound(_) => SupervisorError::DecisionNotFound(decision_id),
                StoreError::Conflict(_) => SupervisorError::FeedbackAlreadyRecorded(decision_id),
                other => SupervisorError::Store(other),
            })
    }

    pub fn interaction_log(
        &self,
        filter: &EntryFilter,
    ) -> Result<Vec<InteractionEntry>, SupervisorError> {
        Ok(self.store.query_entries(filter)?)
    }

    pub fn sessions(&self, agent_id: &AgentId) -> Result<Vec<SessionSummary>, SupervisorError> {
        Ok(self.store.sessions_for(agent_id)?)
    }

    pub fn stats(&self) -> Result<StatsReport, SupervisorError> {
        Ok(compute_stats(self.store.as_ref())?)
    }

    pub fn engine_config(&self) -> Result<EngineConfig, SupervisorError> {
        Ok(self.store.load_engine_config()?)
    }

    pub fn update_engine_config(
        &self,
        update: impl FnOnce(&mut EngineConfig) -> Result<(), DomainError>,
    ) -> Result<EngineConfig, SupervisorError> {
        let mut config = self.store.load_engine_config()?;
        update(&mut config)?;
        self.store.save_engine_config(&config)?;
        Ok(config)
    }

    fn load_agent(&self, agent_id: &AgentId) -> Result<Agent, SupervisorError> {
        self.store.get_agent(agent_id).map_err(|e| match e {
            StoreError::NotFound(_) => SupervisorError::AgentNotFound(agent_id.clone()),
            other => SupervisorError::Store(other),
        })
    }

    /// Apply a lifecycle transition and persist it.
    fn set_status(&self, agent_id: &AgentId, to: AgentStatus) -> Result<(), SupervisorError> {
        let mut agent = self.load_agent(agent_id)?;
        agent.transition(to)?;
        self.store.update_agent_status(agent_id, to)?;
        Ok(())
    }

    /// First event of a fresh subprocess moves `Active` to `Working`.
    /// After a restart the agent is already `Working`.
    fn mark_working(&self, agent_id: &AgentId) {
        match self.store.get_agent(agent_id) {
            Ok(agent) if agent.status == AgentStatus::Active => {
                if let Err(e) = self.set_status(agent_id, AgentStatus::Working) {
                    warn!(agent_id = %agent_id, error = %e, "failed to mark agent working");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(agent_id = %agent_id, error = %e, "failed to load agent"),
        }
    }

    fn fail_agent(&self, agent_id: &AgentId, session: &SessionId, reason: &str) {
        if let Err(e) = self.set_status(agent_id, AgentStatus::Failed) {
            warn!(agent_id = %agent_id, error = %e, "failed to mark agent failed");
        }
        self.logger
            .system_event(agent_id, session, format!("agent failed: {reason}"));
    }

    /// Monitor task: owns one agent's subprocess across restarts.
    async fn monitor(self: Arc<Self>, agent_id: AgentId, mut control: mpsc::Receiver<AgentControl>) {
        let mut restarts: u32 = 0;
        loop {
            let session = SessionId::new(Uuid::new_v4().to_string());
            let agent = match self.store.get_agent(&agent_id) {
                Ok(agent) => agent,
                Err(e) => {
                    error!(agent_id = %agent_id, error = %e, "monitor cannot load agent");
                    break;
                }
            };

            if restarts == 0 {
                self.logger
                    .system_event(&agent_id, &session, "agent session started");
            } else {
                self.logger.system_event(
                    &agent_id,
                    &session,
                    format!("agent restarted (attempt {restarts})"),
                );
            }

            let mut process = match self.launcher.launch(&agent).await {
                Ok(process) => process,
                Err(e) => {
                    warn!(agent_id = %agent_id, error = %e, "failed to launch agent process");
                    if self.spend_restart(&mut restarts, &agent_id, &session).await {
                        continue;
                    }
                    break;
                }
            };

            match self
                .drive_session(&agent_id, &session, process.as_mut(), &mut control)
                .await
            {
                SessionEnd::Finished | SessionEnd::Terminated => break,
                SessionEnd::Crashed => {
                    let _ = process.terminate().await;
                    if self.spend_restart(&mut restarts, &agent_id, &session).await {
                        continue;
                    }
                    break;
                }
            }
        }
        self.agents.lock().await.remove(&agent_id);
    }

    /// Consume one restart. Returns false (and fails the agent) once the
    /// budget is exhausted.
    async fn spend_restart(
        &self,
        restarts: &mut u32,
        agent_id: &AgentId,
        session: &SessionId,
    ) -> bool {
        *restarts += 1;
        if *restarts > self.limits.restart_budget {
            let reason = format!(
                "crashed {} times, restart budget exhausted",
                self.limits.restart_budget + 1
            );
            self.fail_agent(agent_id, session, &reason);
            self.notifier
                .notify(Notification::AgentFailed {
                    agent_id: agent_id.clone(),
                    reason,
                })
                .await;
            return false;
        }
        warn!(agent_id = %agent_id, attempt = *restarts, "agent process crashed, restarting");
        true
    }

    /// Drive one subprocess session until it finishes, crashes, or is
    /// terminated.
    async fn drive_session(
        &self,
        agent_id: &AgentId,
        session: &SessionId,
        process: &mut dyn AgentProcessHandle,
        control: &mut mpsc::Receiver<AgentControl>,
    ) -> SessionEnd {
        loop {
            tokio::select! {
                command = control.recv() => match command {
                    Some(AgentControl::Terminate) | None => {
                        let _ = process.terminate().await;
                        self.fail_agent(agent_id, session, "terminated by operator");
                        return SessionEnd::Terminated;
                    }
                    Some(AgentControl::Resolution { request_id, .. }) => {
                        warn!(agent_id = %agent_id, request_id, "resolution arrived while agent is not waiting; dropped");
                    }
                },
                event = process.next_event() => match event {
                    Ok(Some(event)) => {
                        match self.handle_event(agent_id, session, process, control, event).await {
                            EventFlow::Continue => {}
                            EventFlow::Finished => return SessionEnd::Finished,
                            EventFlow::Terminated => return SessionEnd::Terminated,
                            EventFlow::Crashed => return SessionEnd::Crashed,
                        }
                    }
                    Ok(None) => {
                        let code = process.wait().await.ok().flatten();
                        warn!(agent_id = %agent_id, exit_code = code, "agent process exited without a result");
                        return SessionEnd::Crashed;
                    }
                    Err(ProcessError::Protocol(message)) => {
                        warn!(agent_id = %agent_id, %message, "dropping malformed agent event");
                    }
                    Err(e) => {
                        warn!(agent_id = %agent_id, error = %e, "agent stream error");
                        return SessionEnd::Crashed;
                    }
                },
            }
        }
    }

    async fn handle_event(
        &self,
        agent_id: &AgentId,
        session: &SessionId,
        process: &mut dyn AgentProcessHandle,
        control: &mut mpsc::Receiver<AgentControl>,
        event: AgentEvent,
    ) -> EventFlow {
        match event {
            AgentEvent::Output { content } => {
                self.mark_working(agent_id);
                self.logger.agent_output(agent_id, session, content);
                EventFlow::Continue
            }
            AgentEvent::Result { success, summary } => {
                self.mark_working(agent_id);
                if success {
                    if let Err(e) = self.set_status(agent_id, AgentStatus::Completed) {
                        warn!(agent_id = %agent_id, error = %e, "failed to mark agent completed");
                    }
                    self.logger
                        .system_event(agent_id, session, format!("agent completed: {summary}"));
                    self.notifier
                        .notify(Notification::AgentCompleted {
                            agent_id: agent_id.clone(),
                            summary,
                        })
                        .await;
                } else {
                    self.fail_agent(agent_id, session, &summary);
                    self.notifier
                        .notify(Notification::AgentFailed {
                            agent_id: agent_id.clone(),
                            reason: summary,
                        })
                        .await;
                }
                EventFlow::Finished
            }
            AgentEvent::ToolRequest { id, payload } => {
                self.mark_working(agent_id);
                self.logger.agent_request(
                    agent_id,
                    session,
                    payload.to_string(),
                    Some(serde_json::json!({"sequence": id})),
                );
                self.handle_tool_request(agent_id, session, process, control, id, payload)
                    .await
            }
            AgentEvent::PermissionDenied { id, payload } => {
                self.mark_working(agent_id);
                self.logger.agent_request(
                    agent_id,
                    session,
                    payload.to_string(),
                    Some(serde_json::json!({"sequence": id, "permission_denied": true})),
                );
                // Sandbox refusals skip the engine: always a human call.
                self.escalate(
                    agent_id,
                    session,
                    process,
                    control,
                    id,
                    RequestKind::PermissionDenied,
                    &payload,
                )
                .await
            }
        }
    }

    async fn handle_tool_request(
        &self,
        agent_id: &AgentId,
        session: &SessionId,
        process: &mut dyn AgentProcessHandle,
        control: &mut mpsc::Receiver<AgentControl>,
        sequence: u64,
        payload: Value,
    ) -> EventFlow {
        let agent = match self.store.get_agent(agent_id) {
            Ok(agent) => agent,
            Err(e) => {
                error!(agent_id = %agent_id, error = %e, "cannot load agent for evaluation");
                return EventFlow::Crashed;
            }
        };

        let decision = match self.engine.evaluate(&agent, session, &payload).await {
            Ok(decision) => decision,
            Err(e) => {
                error!(agent_id = %agent_id, error = %e, "request evaluation failed");
                return EventFlow::Crashed;
            }
        };

        match decision.outcome {
            DecisionOutcome::Approve => {
                self.record_payload_cost(agent_id, &payload);
                if process.send_resolution(sequence, true).await.is_err() {
                    return EventFlow::Crashed;
                }
                EventFlow::Continue
            }
            DecisionOutcome::Deny => {
                if process.send_resolution(sequence, false).await.is_err() {
                    return EventFlow::Crashed;
                }
                EventFlow::Continue
            }
            DecisionOutcome::Escalate => {
                let kind = if agent.budget.guard_active() {
                    RequestKind::BudgetExceeded
                } else {
                    RequestKind::ToolRequest
                };
                self.escalate(agent_id, session, process, control, sequence, kind, &payload)
                    .await
            }
        }
    }

    /// Queue an approval request and park the agent until a verdict
    /// arrives. At most one open request exists per agent; a leftover open
    /// request (from a crash while parked) is reused instead of duplicated.
    #[allow(clippy::too_many_arguments)]
    async fn escalate(
        &self,
        agent_id: &AgentId,
        session: &SessionId,
        process: &mut dyn AgentProcessHandle,
        control: &mut mpsc::Receiver<AgentControl>,
        sequence: u64,
        kind: RequestKind,
        payload: &Value,
    ) -> EventFlow {
        let request = match self.store.open_request_for(agent_id) {
            Ok(Some(existing)) => {
                info!(agent_id = %agent_id, request_id = existing.id, "reusing open approval request");
                existing
            }
            Ok(None) => match self.store.enqueue_request(agent_id, kind, payload) {
                Ok(request) => request,
                Err(e) => {
                    error!(agent_id = %agent_id, error = %e, "failed to enqueue approval request");
                    return EventFlow::Crashed;
                }
            },
            Err(e) => {
                error!(agent_id = %agent_id, error = %e, "failed to check open requests");
                return EventFlow::Crashed;
            }
        };

        if let Err(e) = self.set_status(agent_id, AgentStatus::WaitingApproval) {
            warn!(agent_id = %agent_id, error = %e, "failed to mark agent waiting");
        }
        self.notifier
            .notify(Notification::ApprovalNeeded {
                agent_id: agent_id.clone(),
                request_id: request.id,
                summary: payload.to_string(),
            })
            .await;

        self.park(agent_id, session, process, control, sequence, &request)
            .await
    }

    /// Block on the control channel until the pending request is resolved.
    /// There is no timeout here: overdue requests are flagged by the
    /// housekeeping tick and stay pending until a human decides.
    async fn park(
        &self,
        agent_id: &AgentId,
        session: &SessionId,
        process: &mut dyn AgentProcessHandle,
        control: &mut mpsc::Receiver<AgentControl>,
        sequence: u64,
        request: &ApprovalRequest,
    ) -> EventFlow {
        loop {
            match control.recv().await {
                Some(AgentControl::Resolution {
                    request_id,
                    approved,
                }) if request_id == request.id => {
                    if let Err(e) = self.set_status(agent_id, AgentStatus::Working) {
                        warn!(agent_id = %agent_id, error = %e, "failed to resume agent");
                    }
                    self.logger.manager_response(
                        agent_id,
                        session,
                        format!(
                            "request {} {}",
                            request.id,
                            if approved { "approved" } else { "denied" }
                        ),
                        None,
                    );
                    if approved {
                        self.record_payload_cost(agent_id, &request.payload);
                    }
                    if process.send_resolution(sequence, approved).await.is_err() {
                        return EventFlow::Crashed;
                    }
                    return EventFlow::Continue;
                }
                Some(AgentControl::Resolution { request_id, .. }) => {
                    warn!(agent_id = %agent_id, request_id, expected = request.id, "resolution for a different request; dropped");
                }
                Some(AgentControl::Terminate) | None => {
                    let _ = process.terminate().await;
                    self.fail_agent(agent_id, session, "terminated while awaiting approval");
                    return EventFlow::Terminated;
                }
            }
        }
    }

    /// Approved paid operations charge the agent's budget when the payload
    /// declares a cost.
    fn record_payload_cost(&self, agent_id: &AgentId, payload: &Value) {
        if let Some(cost) = payload.get("cost").and_then(Value::as_f64)
            && cost > 0.0
            && let Err(e) = self.store.record_agent_spend(agent_id, cost)
        {
            warn!(agent_id = %agent_id, cost, error = %e, "failed to record spend");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::agent_process::{AgentLauncher, AgentProcessHandle};
    use crate::ports::notifier::NullNotifier;
    use crate::ports::probability::FixedProbability;
    use crate::ports::store::{ApprovalStore, DecisionStore};
    use crate::testing::MemoryStore;
    use async_trait::async_trait;
    use overseer_domain::{AutonomyLevel, NewDecision};
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    /// Subprocess stand-in that replays a scripted event list and records
    /// the resolutions it receives.
    struct ScriptedProcess {
        events: VecDeque<AgentEvent>,
        resolutions: Arc<StdMutex<Vec<(u64, bool)>>>,
    }

    #[async_trait]
    impl AgentProcessHandle for ScriptedProcess {
        async fn next_event(&mut self) -> Result<Option<AgentEvent>, ProcessError> {
            Ok(self.events.pop_front())
        }

        async fn send_resolution(
            &mut self,
            request_id: u64,
            approved: bool,
        ) -> Result<(), ProcessError> {
            self.resolutions.lock().unwrap().push((request_id, approved));
            Ok(())
        }

        async fn terminate(&mut self) -> Result<(), ProcessError> {
            self.events.clear();
            Ok(())
        }

        async fn wait(&mut self) -> Result<Option<i32>, ProcessError> {
            Ok(Some(0))
        }
    }

    struct ScriptedLauncher {
        script: StdMutex<VecDeque<Vec<AgentEvent>>>,
        resolutions: Arc<StdMutex<Vec<(u64, bool)>>>,
        launches: StdMutex<u32>,
    }

    impl ScriptedLauncher {
        fn new(sessions: Vec<Vec<AgentEvent>>) -> Self {
            Self {
                script: StdMutex::new(sessions.into()),
                resolutions: Arc::new(StdMutex::new(Vec::new())),
                launches: StdMutex::new(0),
            }
        }

        fn launch_count(&self) -> u32 {
            *self.launches.lock().unwrap()
        }
    }

    #[async_trait]
    impl AgentLauncher for ScriptedLauncher {
        async fn launch(
            &self,
            _agent: &Agent,
        ) -> Result<Box<dyn AgentProcessHandle>, ProcessError> {
            *self.launches.lock().unwrap() += 1;
            let events = self.script.lock().unwrap().pop_front().unwrap_or_default();
            Ok(Box::new(ScriptedProcess {
                events: events.into(),
                resolutions: self.resolutions.clone(),
            }))
        }
    }

    fn seed_confident_history(store: &MemoryStore, agent_id: &AgentId) {
        for _ in 0..10 {
            let d = store
                .insert_decision(&NewDecision {
                    agent_id: agent_id.clone(),
                    payload: serde_json::json!({"tool": "bash"}),
                    outcome: DecisionOutcome::Approve,
                    risk_score: 0.1,
                    confidence_score: 0.8,
                    autonomy_level: AutonomyLevel::Balanced,
                    model_used: "claude-3.5-sonnet".into(),
                    reasoning: None,
                    degraded: false,
                })
                .unwrap();
            store.attach_feedback(d.id, Feedback::Correct).unwrap();
        }
    }

    fn supervisor(
        store: Arc<MemoryStore>,
        launcher: Arc<ScriptedLauncher>,
    ) -> Arc<Supervisor> {
        let engine = ApprovalEngine::new(store.clone(), Arc::new(FixedProbability(0.99)));
        Arc::new(Supervisor::new(
            store,
            engine,
            launcher,
            Arc::new(NullNotifier),
            SupervisorLimits::default(),
        ))
    }

    fn submit_agent(supervisor: &Supervisor) -> Agent {
        let dir = std::env::temp_dir();
        supervisor
            .submit(
                "Refactor the config loader",
                dir.to_string_lossy().to_string(),
                Priority::Normal,
                100.0,
            )
            .unwrap()
    }

    async fn wait_for_status(store: &MemoryStore, id: &AgentId, status: AgentStatus) {
        use crate::ports::store::AgentStore;
        for _ in 0..200 {
            if store.get_agent(id).unwrap().status == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "agent never reached {status}, stuck at {}",
            store.get_agent(id).unwrap().status
        );
    }

    #[tokio::test]
    async fn test_submit_rejects_bad_repo_path() {
        let store = Arc::new(MemoryStore::new());
        let launcher = Arc::new(ScriptedLauncher::new(vec![]));
        let sup = supervisor(store, launcher);

        let result = sup.submit("task", "/definitely/not/a/dir", Priority::Normal, 50.0);
        assert!(matches!(result, Err(SupervisorError::InvalidRepoPath(_))));
    }

    #[tokio::test]
    async fn test_trusted_agent_runs_to_completion() {
        let store = Arc::new(MemoryStore::new());
        let launcher = Arc::new(ScriptedLauncher::new(vec![vec![
            AgentEvent::Output {
                content: "reading the test suite".into(),
            },
            AgentEvent::ToolRequest {
                id: 1,
                payload: serde_json::json!({"tool": "bash", "command": "cat tests/login.rs"}),
            },
            AgentEvent::Result {
                success: true,
                summary: "fixed".into(),
            },
        ]]));
        let sup = supervisor(store.clone(), launcher.clone());

        let agent = submit_agent(&sup);
        seed_confident_history(&store, &agent.id);
        sup.start(&agent.id).await.unwrap();

        wait_for_status(&store, &agent.id, AgentStatus::Completed).await;
        assert_eq!(
            *launcher.resolutions.lock().unwrap(),
            vec![(1, true)],
            "read should auto-approve"
        );
        assert!(store.pending_requests().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_escalation_parks_agent_until_approved() {
        let store = Arc::new(MemoryStore::new());
        let launcher = Arc::new(ScriptedLauncher::new(vec![vec![
            AgentEvent::ToolRequest {
                id: 1,
                payload: serde_json::json!({"tool": "bash", "command": "rm -rf target/"}),
            },
            AgentEvent::Result {
                success: true,
                summary: "cleaned".into(),
            },
        ]]));
        let sup = supervisor(store.clone(), launcher.clone());

        let agent = submit_agent(&sup);
        seed_confident_history(&store, &agent.id);
        sup.start(&agent.id).await.unwrap();

        wait_for_status(&store, &agent.id, AgentStatus::WaitingApproval).await;
        let pending = store.pending_requests().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].agent_id, agent.id);

        sup.resolve(pending[0].id, true).await.unwrap();

        wait_for_status(&store, &agent.id, AgentStatus::Completed).await;
        assert_eq!(*launcher.resolutions.lock().unwrap(), vec![(1, true)]);
    }

    #[tokio::test]
    async fn test_denied_agent_resumes_working() {
        let store = Arc::new(MemoryStore::new());
        let launcher = Arc::new(ScriptedLauncher::new(vec![vec![
            AgentEvent::ToolRequest {
                id: 1,
                payload: serde_json::json!({"tool": "bash", "command": "sudo apt install jq"}),
            },
            AgentEvent::Result {
                success: true,
                summary: "worked around it".into(),
            },
        ]]));
        let sup = supervisor(store.clone(), launcher.clone());

        let agent = submit_agent(&sup);
        sup.start(&agent.id).await.unwrap();

        wait_for_status(&store, &agent.id, AgentStatus::WaitingApproval).await;
        let pending = store.pending_requests().unwrap();
        sup.resolve(pending[0].id, false).await.unwrap();

        // Denial is relayed, the agent keeps going and finishes.
        wait_for_status(&store, &agent.id, AgentStatus::Completed).await;
        assert_eq!(*launcher.resolutions.lock().unwrap(), vec![(1, false)]);
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent_and_distinguishes_unknown() {
        let store = Arc::new(MemoryStore::new());
        let launcher = Arc::new(ScriptedLauncher::new(vec![vec![AgentEvent::ToolRequest {
            id: 1,
            payload: serde_json::json!({"command": "drop table users"}),
        }]]));
        let sup = supervisor(store.clone(), launcher);

        let agent = submit_agent(&sup);
        sup.start(&agent.id).await.unwrap();
        wait_for_status(&store, &agent.id, AgentStatus::WaitingApproval).await;
        let request_id = store.pending_requests().unwrap()[0].id;

        sup.resolve(request_id, true).await.unwrap();
        assert!(matches!(
            sup.resolve(request_id, true).await,
            Err(SupervisorError::AlreadyResolved(_))
        ));
        assert!(matches!(
            sup.resolve(9999, true).await,
            Err(SupervisorError::RequestNotFound(9999))
        ));
    }

    #[tokio::test]
    async fn test_feedback_is_permanent_once_recorded() {
        let store = Arc::new(MemoryStore::new());
        let launcher = Arc::new(ScriptedLauncher::new(vec![]));
        let sup = supervisor(store.clone(), launcher);

        let decision = store
            .insert_decision(&NewDecision {
                agent_id: AgentId::new("a1b2c3d4"),
                payload: serde_json::json!({"tool": "bash"}),
                outcome: DecisionOutcome::Approve,
                risk_score: 0.1,
                confidence_score: 0.8,
                autonomy_level: AutonomyLevel::Balanced,
                model_used: "claude-3.5-sonnet".into(),
                reasoning: None,
                degraded: false,
            })
            .unwrap();

        sup.record_feedback(decision.id, Feedback::Correct).unwrap();
        assert!(matches!(
            sup.record_feedback(decision.id, Feedback::Incorrect),
            Err(SupervisorError::FeedbackAlreadyRecorded(id)) if id == decision.id
        ));
        // The first verdict stands.
        assert_eq!(
            store.get_decision(decision.id).unwrap().feedback,
            Some(Feedback::Correct)
        );
    }

    #[tokio::test]
    async fn test_crash_restarts_until_budget_exhausted() {
        let store = Arc::new(MemoryStore::new());
        // Every session EOFs immediately with no result event.
        let launcher = Arc::new(ScriptedLauncher::new(vec![]));
        let sup = supervisor(store.clone(), launcher.clone());

        let agent = submit_agent(&sup);
        sup.start(&agent.id).await.unwrap();

        wait_for_status(&store, &agent.id, AgentStatus::Failed).await;
        // Initial launch plus three restarts.
        assert_eq!(launcher.launch_count(), 4);
    }

    #[tokio::test]
    async fn test_terminate_fails_running_agent() {
        let store = Arc::new(MemoryStore::new());
        let launcher = Arc::new(ScriptedLauncher::new(vec![vec![AgentEvent::ToolRequest {
            id: 1,
            payload: serde_json::json!({"command": "drop database prod"}),
        }]]));
        let sup = supervisor(store.clone(), launcher);

        let agent = submit_agent(&sup);
        sup.start(&agent.id).await.unwrap();
        wait_for_status(&store, &agent.id, AgentStatus::WaitingApproval).await;

        sup.terminate(&agent.id).await.unwrap();
        wait_for_status(&store, &agent.id, AgentStatus::Failed).await;
    }

    #[tokio::test]
    async fn test_concurrency_cap_blocks_start() {
        let store = Arc::new(MemoryStore::new());
        // Keep one agent parked forever so it stays live.
        let launcher = Arc::new(ScriptedLauncher::new(vec![vec![AgentEvent::ToolRequest {
            id: 1,
            payload: serde_json::json!({"command": "rm -rf /"}),
        }]]));
        let engine = ApprovalEngine::new(store.clone(), Arc::new(FixedProbability(0.99)));
        let sup = Arc::new(Supervisor::new(
            store.clone(),
            engine,
            launcher,
            Arc::new(NullNotifier),
            SupervisorLimits {
                max_concurrent_agents: 1,
                ..Default::default()
            },
        ));

        let first = submit_agent(&sup);
        let second = submit_agent(&sup);
        sup.start(&first.id).await.unwrap();
        wait_for_status(&store, &first.id, AgentStatus::WaitingApproval).await;

        assert!(matches!(
            sup.start(&second.id).await,
            Err(SupervisorError::AgentLimitReached(1))
        ));
    }

    #[tokio::test]
    async fn test_archive_requires_terminal_status() {
        let store = Arc::new(MemoryStore::new());
        let launcher = Arc::new(ScriptedLauncher::new(vec![vec![AgentEvent::Result {
            success: true,
            summary: "done".into(),
        }]]));
        let sup = supervisor(store.clone(), launcher);

        let agent = submit_agent(&sup);
        assert!(matches!(
            sup.archive(&agent.id),
            Err(SupervisorError::Domain(DomainError::InvalidTransition { .. }))
        ));

        sup.start(&agent.id).await.unwrap();
        wait_for_status(&store, &agent.id, AgentStatus::Completed).await;
        sup.archive(&agent.id).unwrap();

        use crate::ports::store::AgentStore;
        assert_eq!(
            store.get_agent(&agent.id).unwrap().status,
            AgentStatus::Archived
        );
    }

    #[tokio::test]
    async fn test_overdue_requests_flagged_once() {
        use crate::ports::store::AgentStore;
        use std::sync::atomic::{AtomicUsize, Ordering};

        #[derive(Default)]
        struct CountingNotifier {
            overdue: AtomicUsize,
        }

        #[async_trait]
        impl Notifier for CountingNotifier {
            async fn notify(&self, notification: Notification) {
                if matches!(notification, Notification::ApprovalOverdue { .. }) {
                    self.overdue.fetch_add(1, Ordering::SeqCst);
                }
            }
        }

        let store = Arc::new(MemoryStore::new());
        let agent = Agent::new(
            AgentId::new("a1"),
            "task",
            "/tmp",
            Priority::Normal,
            Budget::new(10.0).unwrap(),
        )
        .unwrap();
        store.insert_agent(&agent).unwrap();
        store
            .enqueue_request(
                &agent.id,
                RequestKind::ToolRequest,
                &serde_json::json!({"command": "git push"}),
            )
            .unwrap();

        let notifier = Arc::new(CountingNotifier::default());
        let engine = ApprovalEngine::new(store.clone(), Arc::new(FixedProbability(0.99)));
        let sup = Supervisor::new(
            store,
            engine,
            Arc::new(ScriptedLauncher::new(vec![])),
            notifier.clone(),
            SupervisorLimits {
                approval_timeout: Duration::from_secs(0),
                ..Default::default()
            },
        );

        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(sup.flag_overdue_approvals().await.unwrap(), 1);
        assert_eq!(sup.flag_overdue_approvals().await.unwrap(), 0);
        assert_eq!(notifier.overdue.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_approved_cost_charges_budget() {
        use crate::ports::store::AgentStore;
        let store = Arc::new(MemoryStore::new());
        let launcher = Arc::new(ScriptedLauncher::new(vec![vec![
            AgentEvent::ToolRequest {
                id: 1,
                payload: serde_json::json!({"tool": "bash", "command": "terraform apply", "cost": 12.5}),
            },
            AgentEvent::Result {
                success: true,
                summary: "applied".into(),
            },
        ]]));
        let sup = supervisor(store.clone(), launcher);

        let agent = submit_agent(&sup);
        sup.start(&agent.id).await.unwrap();
        wait_for_status(&store, &agent.id, AgentStatus::WaitingApproval).await;
        let request_id = store.pending_requests().unwrap()[0].id;
        sup.resolve(request_id, true).await.unwrap();
        wait_for_status(&store, &agent.id, AgentStatus::Completed).await;

        assert_eq!(store.get_agent(&agent.id).unwrap().budget.spent(), 12.5);
    }
}
