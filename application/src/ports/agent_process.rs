//! Port for launching and driving agent subprocesses.
//!
//! The wire protocol is newline-delimited JSON: the subprocess writes one
//! [`AgentEvent`] per line on stdout, and the supervisor answers tool
//! requests with resolution frames on stdin. A subprocess that emitted a
//! `tool_request` must not emit further events until its resolution
//! arrives.

use async_trait::async_trait;
use overseer_domain::Agent;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One event read from an agent subprocess.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentEvent {
    /// The agent wants to run a tool and awaits a verdict.
    ToolRequest {
        /// Subprocess-local sequence number, echoed back in the resolution
        id: u64,
        payload: Value,
    },
    /// Free-form progress output.
    Output { content: String },
    /// The sandbox refused an operation; always escalated to a human. The
    /// agent awaits a resolution frame just like for a tool request.
    PermissionDenied {
        /// Subprocess-local sequence number, echoed back in the resolution
        id: u64,
        payload: Value,
    },
    /// The agent finished its task.
    Result { success: bool, summary: String },
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn agent process: {0}")]
    Spawn(String),

    #[error("agent process i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed event from agent process: {0}")]
    Protocol(String),
}

/// A handle on one running agent subprocess.
#[async_trait]
pub trait AgentProcessHandle: Send {
    /// Next event from the subprocess. `Ok(None)` means clean stdout EOF.
    /// Malformed lines surface as `ProcessError::Protocol`; the caller
    /// decides whether to tolerate or restart.
    async fn next_event(&mut self) -> Result<Option<AgentEvent>, ProcessError>;

    /// Answer a pending tool request.
    async fn send_resolution(&mut self, request_id: u64, approved: bool)
    -> Result<(), ProcessError>;

    /// Stop the subprocess. Idempotent.
    async fn terminate(&mut self) -> Result<(), ProcessError>;

    /// Wait for exit and return the status code if the platform reports one.
    async fn wait(&mut self) -> Result<Option<i32>, ProcessError>;
}

/// Port for spawning agent subprocesses.
#[async_trait]
pub trait AgentLauncher: Send + Sync {
    async fn launch(&self, agent: &Agent) -> Result<Box<dyn AgentProcessHandle>, ProcessError>;
}
