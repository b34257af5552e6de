//! Control plane wire protocol.
//!
//! NDJSON over the daemon's Unix socket: one request object per line in,
//! one response object per line out. The payload shapes are plain JSON so
//! any local tool can drive the daemon, not just the bundled CLI.

use overseer_application::SupervisorError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ControlRequest {
    /// Liveness probe
    Ping,
    /// Graceful daemon shutdown
    Shutdown,
    AddAgent {
        task: String,
        repo_path: String,
        #[serde(default)]
        priority: Option<String>,
        budget: f64,
    },
    ListAgents {
        #[serde(default)]
        include_archived: bool,
    },
    GetAgent {
        agent_id: String,
    },
    Terminate {
        agent_id: String,
    },
    Archive {
        agent_id: String,
    },
    /// Pending approval requests
    Queue,
    Approve {
        request_id: i64,
    },
    Deny {
        request_id: i64,
    },
    Feedback {
        decision_id: i64,
        feedback: String,
    },
    History {
        #[serde(default = "default_history_limit")]
        limit: usize,
    },
    Stats,
    Log {
        #[serde(default)]
        agent_id: Option<String>,
        #[serde(default)]
        session_id: Option<String>,
        #[serde(default)]
        kind: Option<String>,
        #[serde(default)]
        search: Option<String>,
        #[serde(default)]
        limit: Option<usize>,
    },
    Sessions {
        agent_id: String,
    },
    GetConfig,
    SetConfig {
        #[serde(default)]
        autonomy_level: Option<String>,
        #[serde(default)]
        evaluation_model: Option<String>,
    },
}

fn default_history_limit() -> usize {
    20
}

/// Machine-readable failure classes, mapped to CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlErrorCode {
    Validation,
    NotFound,
    AlreadyResolved,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ControlResponse {
    Ok {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
    },
    Error {
        code: ControlErrorCode,
        message: String,
    },
}

impl ControlResponse {
    pub fn ok() -> Self {
        ControlResponse::Ok { data: None }
    }

    pub fn ok_with(data: Value) -> Self {
        ControlResponse::Ok { data: Some(data) }
    }

    pub fn error(code: ControlErrorCode, message: impl Into<String>) -> Self {
        ControlResponse::Error {
            code,
            message: message.into(),
        }
    }
}

impl From<SupervisorError> for ControlResponse {
    fn from(e: SupervisorError) -> Self {
        let code = match &e {
            SupervisorError::AgentNotFound(_)
            | SupervisorError::RequestNotFound(_)
            | SupervisorError::DecisionNotFound(_) => ControlErrorCode::NotFound,
            SupervisorError::AlreadyResolved(_) | SupervisorError::FeedbackAlreadyRecorded(_) => {
                ControlErrorCode::AlreadyResolved
            }
            SupervisorError::InvalidRepoPath(_)
            | SupervisorError::AgentLimitReached(_)
            | SupervisorError::Domain(_) => ControlErrorCode::Validation,
            SupervisorError::Engine(_) | SupervisorError::Store(_) => ControlErrorCode::Internal,
        };
        ControlResponse::error(code, e.to_string())
    }
}
