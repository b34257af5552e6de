//! Launcher for coding-agent subprocesses.
//!
//! Spawns the configured agent CLI inside the agent's repository workspace
//! and speaks the NDJSON event protocol over its stdio: events arrive one
//! JSON object per stdout line, resolutions go back as one JSON object per
//! stdin line. The child is killed if the handle is dropped.

use async_trait::async_trait;
use overseer_application::ports::agent_process::{
    AgentEvent, AgentLauncher, AgentProcessHandle, ProcessError,
};
use overseer_domain::Agent;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

/// Cap on one stdout event line (1 MB). A line past this is a protocol
/// violation, not grounds to buffer without bound.
const MAX_EVENT_LINE: usize = 1024 * 1024;

/// How the agent CLI is invoked. The task is appended as the final
/// argument; the agent id and repo path are also exported as environment
/// variables for wrappers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for AgentCommand {
    fn default() -> Self {
        Self {
            program: "claude".to_string(),
            args: vec!["--output-format".to_string(), "stream-json".to_string()],
        }
    }
}

/// Resolution frame written to the agent's stdin.
#[derive(Debug, Serialize)]
struct ResolutionFrame {
    #[serde(rename = "type")]
    kind: &'static str,
    request_id: u64,
    approved: bool,
}

pub struct ClaudeLauncher {
    command: AgentCommand,
}

impl ClaudeLauncher {
    pub fn new(command: AgentCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl AgentLauncher for ClaudeLauncher {
    async fn launch(&self, agent: &Agent) -> Result<Box<dyn AgentProcessHandle>, ProcessError> {
        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg(&agent.task)
            .current_dir(&agent.repo_path)
            .env("OVERSEER_AGENT_ID", agent.id.as_str())
            .env("OVERSEER_REPO_PATH", &agent.repo_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ProcessError::Spawn(format!("{}: {e}", self.command.program))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ProcessError::Spawn("child stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProcessError::Spawn("child stdout not captured".into()))?;

        debug!(agent_id = %agent.id, program = %self.command.program, "agent process spawned");

        Ok(Box::new(ClaudeProcessHandle {
            child,
            stdin: Some(stdin),
            lines: BufReader::new(stdout).lines(),
        }))
    }
}

pub struct ClaudeProcessHandle {
    child: Child,
    stdin: Option<ChildStdin>,
    lines: Lines<BufReader<ChildStdout>>,
}

#[async_trait]
impl AgentProcessHandle for ClaudeProcessHandle {
    async fn next_event(&mut self) -> Result<Option<AgentEvent>, ProcessError> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                return Ok(None);
            };
            if line.len() > MAX_EVENT_LINE {
                return Err(ProcessError::Protocol(format!(
                    "event line of {} bytes exceeds the {MAX_EVENT_LINE} byte cap",
                    line.len()
                )));
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            return serde_json::from_str(line)
                .map(Some)
                .map_err(|e| ProcessError::Protocol(e.to_string()));
        }
    }

    async fn send_resolution(
        &mut self,
        request_id: u64,
        approved: bool,
    ) -> Result<(), ProcessError> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ProcessError::Protocol("agent stdin already closed".into()))?;
        let frame = ResolutionFrame {
            kind: "resolution",
            request_id,
            approved,
        };
        let mut json = serde_json::to_string(&frame)
            .map_err(|e| ProcessError::Protocol(e.to_string()))?;
        json.push('\n');
        stdin.write_all(json.as_bytes()).await?;
        stdin.flush().await?;
        Ok(())
    }

    async fn terminate(&mut self) -> Result<(), ProcessError> {
        // Closing stdin asks the agent to wind down; the kill covers the
        // ones that don't.
        self.stdin.take();
        if let Err(e) = self.child.start_kill() {
            if e.kind() != std::io::ErrorKind::InvalidInput {
                warn!(error = %e, "failed to kill agent process");
            }
        }
        Ok(())
    }

    async fn wait(&mut self) -> Result<Option<i32>, ProcessError> {
        let status = self.child.wait().await?;
        Ok(status.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overseer_domain::{AgentId, Budget, Priority};

    fn echo_agent(script: &str) -> (ClaudeLauncher, Agent) {
        let launcher = ClaudeLauncher::new(AgentCommand {
            program: "sh".into(),
            args: vec!["-c".into(), script.into(), "--".into()],
        });
        let agent = Agent::new(
            AgentId::new("a1b2c3d4"),
            "noop",
            std::env::temp_dir().to_string_lossy().to_string(),
            Priority::Normal,
            Budget::new(10.0).unwrap(),
        )
        .unwrap();
        (launcher, agent)
    }

    #[tokio::test]
    async fn test_reads_events_until_eof() {
        let (launcher, agent) = echo_agent(
            r#"printf '{"event":"output","content":"hello"}\n{"event":"result","success":true,"summary":"done"}\n'"#,
        );
        let mut process = launcher.launch(&agent).await.unwrap();

        let first = process.next_event().await.unwrap();
        assert!(matches!(first, Some(AgentEvent::Output { ref content }) if content == "hello"));

        let second = process.next_event().await.unwrap();
        assert!(matches!(second, Some(AgentEvent::Result { success: true, .. })));

        assert!(process.next_event().await.unwrap().is_none());
        assert_eq!(process.wait().await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_malformed_line_is_a_protocol_error() {
        let (launcher, agent) = echo_agent("echo 'not json'");
        let mut process = launcher.launch(&agent).await.unwrap();
        assert!(matches!(
            process.next_event().await,
            Err(ProcessError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_resolution_reaches_child_stdin() {
        // Child echoes its stdin back on stdout.
        let (launcher, agent) = echo_agent("head -n 1");
        let mut process = launcher.launch(&agent).await.unwrap();

        process.send_resolution(7, true).await.unwrap();
        let event = process.next_event().await;
        // The echoed resolution frame is not a valid AgentEvent.
        assert!(matches!(event, Err(ProcessError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_missing_program_fails_spawn() {
        let launcher = ClaudeLauncher::new(AgentCommand {
            program: "definitely-not-a-real-binary".into(),
            args: vec![],
        });
        let agent = Agent::new(
            AgentId::new("a1"),
            "noop",
            std::env::temp_dir().to_string_lossy().to_string(),
            Priority::Normal,
            Budget::new(10.0).unwrap(),
        )
        .unwrap();
        assert!(matches!(
            launcher.launch(&agent).await,
            Err(ProcessError::Spawn(_))
        ));
    }
}
