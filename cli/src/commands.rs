//! Client-side command handlers.
//!
//! Each subcommand is translated into one control request; the response is
//! rendered for humans (or dumped as JSON with `--json`) and mapped to a
//! process exit code so scripts can branch on the failure class.

use anyhow::{Result, bail};
use overseer_infrastructure::{
    ControlClient, ControlErrorCode, ControlRequest, ControlResponse,
};
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::cli::{Command, ConfigAction};

/// Exit codes for scripted callers.
pub const EXIT_INTERNAL: u8 = 1;
pub const EXIT_VALIDATION: u8 = 2;
pub const EXIT_NOT_FOUND: u8 = 3;
pub const EXIT_ALREADY_RESOLVED: u8 = 4;

pub async fn run(command: Command, socket_path: PathBuf, json: bool) -> Result<ExitCode> {
    let request = to_request(&command)?;
    let client = ControlClient::new(socket_path);
    let response = client.request(&request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(exit_code(&response));
    }

    match &response {
        ControlResponse::Ok { data } => render(&command, data.as_ref()),
        ControlResponse::Error { message, .. } => eprintln!("error: {message}"),
    }
    Ok(exit_code(&response))
}

fn exit_code(response: &ControlResponse) -> ExitCode {
    match response {
        ControlResponse::Ok { .. } => ExitCode::SUCCESS,
        ControlResponse::Error { code, .. } => ExitCode::from(match code {
            ControlErrorCode::Validation => EXIT_VALIDATION,
            ControlErrorCode::NotFound => EXIT_NOT_FOUND,
            ControlErrorCode::AlreadyResolved => EXIT_ALREADY_RESOLVED,
            ControlErrorCode::Internal => EXIT_INTERNAL,
        }),
    }
}

fn to_request(command: &Command) -> Result<ControlRequest> {
    Ok(match command {
        Command::Daemon => bail!("the daemon command is handled before dispatch"),
        Command::Add {
            task,
            repo,
            priority,
            budget,
        } => ControlRequest::AddAgent {
            task: task.clone(),
            repo_path: repo.clone(),
            priority: Some(priority.clone()),
            budget: *budget,
        },
        Command::Status {
            agent_id: Some(id), ..
        } => ControlRequest::GetAgent {
            agent_id: id.clone(),
        },
        Command::Status { agent_id: None, all } => ControlRequest::ListAgents {
            include_archived: *all,
        },
        Command::Queue => ControlRequest::Queue,
        Command::Approve { request_id } => ControlRequest::Approve {
            request_id: *request_id,
        },
        Command::Deny { request_id } => ControlRequest::Deny {
            request_id: *request_id,
        },
        Command::Terminate { agent_id } => ControlRequest::Terminate {
            agent_id: agent_id.clone(),
        },
        Command::Archive { agent_id } => ControlRequest::Archive {
            agent_id: agent_id.clone(),
        },
        Command::Feedback {
            decision_id,
            verdict,
        } => ControlRequest::Feedback {
            decision_id: *decision_id,
            feedback: verdict.clone(),
        },
        Command::History { limit } => ControlRequest::History { limit: *limit },
        Command::Stats => ControlRequest::Stats,
        Command::Log {
            agent,
            session,
            kind,
            search,
            limit,
        } => ControlRequest::Log {
            agent_id: agent.clone(),
            session_id: session.clone(),
            kind: kind.clone(),
            search: search.clone(),
            limit: *limit,
        },
        Command::Sessions { agent_id } => ControlRequest::Sessions {
            agent_id: agent_id.clone(),
        },
        Command::Config { action } => match action {
            ConfigAction::Show => ControlRequest::GetConfig,
            ConfigAction::Set { autonomy, model } => ControlRequest::SetConfig {
                autonomy_level: autonomy.clone(),
                evaluation_model: model.clone(),
            },
        },
        Command::Ping => ControlRequest::Ping,
        Command::Stop => ControlRequest::Shutdown,
    })
}

fn render(command: &Command, data: Option<&Value>) {
    match command {
        Command::Add { .. } => {
            if let Some(data) = data {
                println!(
                    "agent {} submitted ({})",
                    text(data, "/id"),
                    text(data, "/status")
                );
            }
        }
        Command::Status { agent_id: Some(_), .. } => {
            if let Some(agent) = data {
                print_agent(agent);
            }
        }
        Command::Status { agent_id: None, .. } => {
            let agents = list(data, "/agents");
            if agents.is_empty() {
                println!("no agents");
                return;
            }
            println!(
                "{:<10} {:<18} {:<8} {:>10} {:>10}  {}",
                "ID", "STATUS", "PRIO", "SPENT", "BUDGET", "TASK"
            );
            for agent in agents {
                println!(
                    "{:<10} {:<18} {:<8} {:>10.2} {:>10.2}  {}",
                    text(agent, "/id"),
                    text(agent, "/status"),
                    text(agent, "/priority"),
                    number(agent, "/budget/spent"),
                    number(agent, "/budget/ceiling"),
                    text(agent, "/task"),
                );
            }
        }
        Command::Queue => {
            let requests = list(data, "/requests");
            if requests.is_empty() {
                println!("approval queue is empty");
                return;
            }
            for request in requests {
                println!(
                    "#{} agent {} [{}] since {}",
                    number(request, "/id"),
                    text(request, "/agent_id"),
                    text(request, "/kind"),
                    text(request, "/created_at"),
                );
                println!("    {}", compact(request, "/payload"));
            }
        }
        Command::Approve { request_id } => println!("request {request_id} approved"),
        Command::Deny { request_id } => println!("request {request_id} denied"),
        Command::Terminate { agent_id } => println!("agent {agent_id} terminated"),
        Command::Archive { agent_id } => println!("agent {agent_id} archived"),
        Command::Feedback { decision_id, .. } => {
            println!("feedback recorded for decision {decision_id}")
        }
        Command::History { .. } => {
            let decisions = list(data, "/decisions");
            if decisions.is_empty() {
                println!("no decisions yet");
                return;
            }
            for decision in decisions {
                let feedback = decision
                    .pointer("/feedback")
                    .and_then(Value::as_str)
                    .unwrap_or("-");
                println!(
                    "#{} {} agent {} risk {:.2} confidence {:.2} feedback {}",
                    number(decision, "/id"),
                    text(decision, "/outcome"),
                    text(decision, "/agent_id"),
                    number(decision, "/risk_score"),
                    number(decision, "/confidence_score"),
                    feedback,
                );
            }
        }
        Command::Stats => {
            if let Some(data) = data {
                println!("decisions:      {}", number(data, "/total_decisions"));
                println!("  approved:     {}", number(data, "/approvals"));
                println!("  denied:       {}", number(data, "/denials"));
                println!("  escalated:    {}", number(data, "/escalations"));
                println!("escalation rate: {:.1}%", number(data, "/escalation_rate") * 100.0);
                println!("feedback:       {}", number(data, "/feedback_count"));
                match data.pointer("/accuracy").and_then(Value::as_f64) {
                    Some(accuracy) => println!("accuracy:       {:.1}%", accuracy * 100.0),
                    None => println!("accuracy:       n/a"),
                }
                println!("confidence:     {:.2}", number(data, "/current_confidence"));
                println!(
                    "agents:         {} live / {} total",
                    number(data, "/live_agents"),
                    number(data, "/total_agents")
                );
            }
        }
        Command::Log { .. } => {
            for entry in list(data, "/entries") {
                println!(
                    "[{}] {} {} ({}): {}",
                    text(entry, "/timestamp"),
                    text(entry, "/agent_id"),
                    text(entry, "/kind"),
                    text(entry, "/session_id"),
                    text(entry, "/content"),
                );
            }
        }
        Command::Sessions { .. } => {
            let sessions = list(data, "/sessions");
            if sessions.is_empty() {
                println!("no sessions");
                return;
            }
            for session in sessions {
                println!(
                    "{}  {} entries  {} .. {}",
                    text(session, "/session_id"),
                    number(session, "/entry_count"),
                    text(session, "/first_entry"),
                    text(session, "/last_entry"),
                );
            }
        }
        Command::Config { .. } => {
            if let Some(data) = data {
                println!("autonomy level:   {}", text(data, "/autonomy_level"));
                println!("evaluation model: {}", text(data, "/evaluation_model"));
            }
        }
        Command::Ping => println!("pong"),
        Command::Stop => println!("shutdown requested"),
        Command::Daemon => {}
    }
}

fn text<'a>(value: &'a Value, pointer: &str) -> &'a str {
    value.pointer(pointer).and_then(Value::as_str).unwrap_or("?")
}

fn number(value: &Value, pointer: &str) -> f64 {
    value.pointer(pointer).and_then(Value::as_f64).unwrap_or(0.0)
}

fn compact(value: &Value, pointer: &str) -> String {
    value
        .pointer(pointer)
        .map(|v| v.to_string())
        .unwrap_or_else(|| "?".to_string())
}

fn list<'a>(data: Option<&'a Value>, pointer: &str) -> Vec<&'a Value> {
    data.and_then(|d| d.pointer(pointer))
        .and_then(Value::as_array)
        .map(|a| a.iter().collect())
        .unwrap_or_default()
}

fn print_agent(agent: &Value) {
    println!("id:        {}", text(agent, "/id"));
    println!("status:    {}", text(agent, "/status"));
    println!("priority:  {}", text(agent, "/priority"));
    println!("task:      {}", text(agent, "/task"));
    println!("repo:      {}", text(agent, "/repo_path"));
    println!(
        "budget:    {:.2} spent of {:.2}",
        number(agent, "/budget/spent"),
        number(agent, "/budget/ceiling")
    );
    println!("created:   {}", text(agent, "/created_at"));
}

/// Resolve the socket path for client commands: explicit flag first, then
/// the config file, then the built-in default.
pub fn resolve_socket_path(
    socket: Option<PathBuf>,
    config: &overseer_infrastructure::FileConfig,
) -> PathBuf {
    socket.unwrap_or_else(|| config.socket_path())
}
