//! Notifier that shells out to a user-configured command.
//!
//! The command runs through `sh -c` with the event described in
//! environment variables, so anything from `notify-send` to a webhook
//! script works. Failures are logged and dropped.

use async_trait::async_trait;
use overseer_application::ports::notifier::{Notification, Notifier};
use tracing::warn;

pub struct CommandNotifier {
    command: String,
}

impl CommandNotifier {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

fn describe(notification: &Notification) -> (&'static str, String, String) {
    match notification {
        Notification::ApprovalNeeded {
            agent_id, summary, ..
        } => (
            "approval_needed",
            agent_id.to_string(),
            format!("agent {agent_id} awaits approval: {summary}"),
        ),
        Notification::ApprovalOverdue {
            agent_id,
            request_id,
        } => (
            "approval_overdue",
            agent_id.to_string(),
            format!("request {request_id} for agent {agent_id} is overdue"),
        ),
        Notification::AgentFailed { agent_id, reason } => (
            "agent_failed",
            agent_id.to_string(),
            format!("agent {agent_id} failed: {reason}"),
        ),
        Notification::AgentCompleted { agent_id, summary } => (
            "agent_completed",
            agent_id.to_string(),
            format!("agent {agent_id} completed: {summary}"),
        ),
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn notify(&self, notification: Notification) {
        let (event, agent_id, message) = describe(&notification);
        let result = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .env("OVERSEER_EVENT", event)
            .env("OVERSEER_AGENT_ID", &agent_id)
            .env("OVERSEER_MESSAGE", &message)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .await;

        match result {
            Ok(status) if status.success() => {}
            Ok(status) => warn!(event, %status, "notify command exited non-zero"),
            Err(e) => warn!(event, error = %e, "failed to run notify command"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overseer_domain::AgentId;

    #[tokio::test]
    async fn test_notify_runs_command_with_event_env() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("event.txt");
        let notifier =
            CommandNotifier::new(format!("printf '%s' \"$OVERSEER_EVENT\" > {}", out.display()));

        notifier
            .notify(Notification::AgentCompleted {
                agent_id: AgentId::new("a1"),
                summary: "done".into(),
            })
            .await;

        assert_eq!(std::fs::read_to_string(out).unwrap(), "agent_completed");
    }
}
