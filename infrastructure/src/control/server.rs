//! Control socket server.
//!
//! Listens on a Unix domain socket for NDJSON requests and dispatches them
//! to the supervisor. Socket permissions are restricted to the owning user;
//! anyone who can open the socket can drive the daemon.

use super::protocol::{ControlErrorCode, ControlRequest, ControlResponse};
use overseer_application::ports::store::EntryFilter;
use overseer_application::{Supervisor, SupervisorError};
use overseer_domain::{AgentId, AutonomyLevel, Feedback, InteractionType, Priority, SessionId};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Maximum allowed line length for incoming NDJSON requests (1 MB).
const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Cap on total readable bytes per connection, so a line that never ends
/// cannot accumulate unbounded memory.
const MAX_CONNECTION_BYTES: u64 = 10 * 1024 * 1024;

pub struct ControlServer {
    socket_path: PathBuf,
    supervisor: Arc<Supervisor>,
    shutdown: CancellationToken,
}

impl ControlServer {
    pub fn new(
        socket_path: PathBuf,
        supervisor: Arc<Supervisor>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            socket_path,
            supervisor,
            shutdown,
        }
    }

    /// Bind the socket and serve until the shutdown token fires.
    pub async fn run(&self) -> Result<(), std::io::Error> {
        let listener = bind_socket(&self.socket_path)?;
        info!(path = %self.socket_path.display(), "control socket listening");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, _addr)) => {
                        let supervisor = self.supervisor.clone();
                        let shutdown = self.shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, supervisor, shutdown).await {
                                debug!(error = %e, "control connection ended");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "control socket accept error"),
                },
            }
        }

        let _ = std::fs::remove_file(&self.socket_path);
        info!("control socket stopped");
        Ok(())
    }
}

fn bind_socket(socket_path: &Path) -> Result<UnixListener, std::io::Error> {
    if let Some(parent) = socket_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    // Remove a stale socket unconditionally; checking existence first
    // would race with removal.
    match std::fs::remove_file(socket_path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let listener = UnixListener::bind(socket_path)?;

    // Owner-only: other local users must not control the daemon.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(listener)
}

async fn handle_connection(
    stream: UnixStream,
    supervisor: Arc<Supervisor>,
    shutdown: CancellationToken,
) -> Result<(), std::io::Error> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader.take(MAX_CONNECTION_BYTES)).lines();

    while let Some(line) = lines.next_line().await? {
        if line.len() > MAX_LINE_LENGTH {
            write_response(
                &mut writer,
                &ControlResponse::error(ControlErrorCode::Validation, "request too large"),
            )
            .await?;
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request: ControlRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                write_response(
                    &mut writer,
                    &ControlResponse::error(
                        ControlErrorCode::Validation,
                        format!("invalid request: {e}"),
                    ),
                )
                .await?;
                continue;
            }
        };

        let response = dispatch(&supervisor, &shutdown, request).await;
        write_response(&mut writer, &response).await?;
    }

    Ok(())
}

async fn write_response(
    writer: &mut tokio::net::unix::OwnedWriteHalf,
    response: &ControlResponse,
) -> Result<(), std::io::Error> {
    let mut json = serde_json::to_string(response).unwrap_or_else(|_| {
        r#"{"status":"error","code":"internal","message":"unencodable response"}"#.to_string()
    });
    json.push('\n');
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await
}

/// Execute one control request against the supervisor.
async fn dispatch(
    supervisor: &Arc<Supervisor>,
    shutdown: &CancellationToken,
    request: ControlRequest,
) -> ControlResponse {
    match dispatch_inner(supervisor, shutdown, request).await {
        Ok(response) => response,
        Err(e) => e.into(),
    }
}

async fn dispatch_inner(
    supervisor: &Arc<Supervisor>,
    shutdown: &CancellationToken,
    request: ControlRequest,
) -> Result<ControlResponse, SupervisorError> {
    match request {
        ControlRequest::Ping => Ok(ControlResponse::ok_with(json!({"pong": true}))),
        ControlRequest::Shutdown => {
            info!("shutdown requested over control socket");
            shutdown.cancel();
            Ok(ControlResponse::ok())
        }
        ControlRequest::AddAgent {
            task,
            repo_path,
            priority,
            budget,
        } => {
            let priority = match priority.as_deref() {
                Some(text) => text.parse::<Priority>()?,
                None => Priority::default(),
            };
            let agent = supervisor.submit(task, repo_path, priority, budget)?;
            // Start immediately if there is capacity; otherwise the
            // scheduling tick picks the agent up later.
            supervisor.start_pending().await?;
            Ok(ControlResponse::ok_with(serde_json::to_value(&agent).unwrap_or_default()))
        }
        ControlRequest::ListAgents { include_archived } => {
            let agents = supervisor.list_agents(include_archived)?;
            Ok(ControlResponse::ok_with(json!({"agents": agents})))
        }
        ControlRequest::GetAgent { agent_id } => {
            let agent = supervisor.agent(&AgentId::new(agent_id))?;
            Ok(ControlResponse::ok_with(serde_json::to_value(&agent).unwrap_or_default()))
        }
        ControlRequest::Terminate { agent_id } => {
            supervisor.terminate(&AgentId::new(agent_id)).await?;
            Ok(ControlResponse::ok())
        }
        ControlRequest::Archive { agent_id } => {
            supervisor.archive(&AgentId::new(agent_id))?;
            Ok(ControlResponse::ok())
        }
        ControlRequest::Queue => {
            let requests = supervisor.pending_requests()?;
            Ok(ControlResponse::ok_with(json!({"requests": requests})))
        }
        ControlRequest::Approve { request_id } => {
            let request = supervisor.resolve(request_id, true).await?;
            Ok(ControlResponse::ok_with(serde_json::to_value(&request).unwrap_or_default()))
        }
        ControlRequest::Deny { request_id } => {
            let request = supervisor.resolve(request_id, false).await?;
            Ok(ControlResponse::ok_with(serde_json::to_value(&request).unwrap_or_default()))
        }
        ControlRequest::Feedback {
            decision_id,
            feedback,
        } => {
            let feedback = feedback.parse::<Feedback>()?;
            supervisor.record_feedback(decision_id, feedback)?;
            Ok(ControlResponse::ok())
        }
        ControlRequest::History { limit } => {
            let decisions = supervisor.decision_history(limit)?;
            Ok(ControlResponse::ok_with(json!({"decisions": decisions})))
        }
        ControlRequest::Stats => {
            let report = supervisor.stats()?;
            Ok(ControlResponse::ok_with(serde_json::to_value(&report).unwrap_or_default()))
        }
        ControlRequest::Log {
            agent_id,
            session_id,
            kind,
            search,
            limit,
        } => {
            let kind = kind
                .as_deref()
                .map(|text| text.parse::<InteractionType>())
                .transpose()?;
            let filter = EntryFilter {
                agent_id: agent_id.map(AgentId::new),
                session_id: session_id.map(SessionId::new),
                kind,
                search,
                limit,
            };
            let entries = supervisor.interaction_log(&filter)?;
            Ok(ControlResponse::ok_with(json!({"entries": entries})))
        }
        ControlRequest::Sessions { agent_id } => {
            let sessions = supervisor.sessions(&AgentId::new(agent_id))?;
            Ok(ControlResponse::ok_with(json!({"sessions": sessions})))
        }
        ControlRequest::GetConfig => {
            let config = supervisor.engine_config()?;
            Ok(ControlResponse::ok_with(serde_json::to_value(&config).unwrap_or_default()))
        }
        ControlRequest::SetConfig {
            autonomy_level,
            evaluation_model,
        } => {
            let level = autonomy_level
                .as_deref()
                .map(|text| text.parse::<AutonomyLevel>())
                .transpose()?;
            let config = supervisor.update_engine_config(|config| {
                if let Some(level) = level {
                    config.set_autonomy_level(level);
                }
                if let Some(model) = evaluation_model.as_deref() {
                    config.set_evaluation_model(model)?;
                }
                Ok(())
            })?;
            Ok(ControlResponse::ok_with(serde_json::to_value(&config).unwrap_or_default()))
        }
    }
}
