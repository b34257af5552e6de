//! Port for out-of-band operator notifications.
//!
//! Fire and forget: a notification failure is logged by the adapter and
//! never propagates into supervision.

use async_trait::async_trait;
use overseer_domain::AgentId;

/// An operator-facing event worth interrupting someone for.
#[derive(Debug, Clone)]
pub enum Notification {
    /// A request was escalated and awaits a verdict.
    ApprovalNeeded {
        agent_id: AgentId,
        request_id: i64,
        summary: String,
    },
    /// A pending request outlived the configured approval timeout.
    ApprovalOverdue { agent_id: AgentId, request_id: i64 },
    /// An agent exhausted its restart budget or was terminated.
    AgentFailed { agent_id: AgentId, reason: String },
    /// An agent finished its task.
    AgentCompleted { agent_id: AgentId, summary: String },
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification);
}

/// No-op notifier for setups without a notify command configured.
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, _notification: Notification) {}
}
