//! Command-line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "overseer", version, about = "Supervisor daemon for autonomous coding agents")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Explicit config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Skip config files and use built-in defaults
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Control socket path (overrides config)
    #[arg(long, global = true)]
    pub socket: Option<PathBuf>,

    /// Print raw JSON responses instead of formatted output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the supervisor daemon in the foreground
    Daemon,

    /// Submit a new agent task
    Add {
        /// What the agent should do
        task: String,
        /// Path to the repository workspace the agent works in
        #[arg(long)]
        repo: String,
        /// Scheduling priority: low, normal, high
        #[arg(long, default_value = "normal")]
        priority: String,
        /// Budget ceiling for the agent
        #[arg(long, default_value_t = 100.0)]
        budget: f64,
    },

    /// Show agents and their lifecycle status
    Status {
        /// A single agent id; omit for all agents
        agent_id: Option<String>,
        /// Include archived agents
        #[arg(long)]
        all: bool,
    },

    /// List pending approval requests
    Queue,

    /// Approve a pending request
    Approve { request_id: i64 },

    /// Deny a pending request
    Deny { request_id: i64 },

    /// Stop an agent and mark it failed
    Terminate { agent_id: String },

    /// Archive a completed or failed agent
    Archive { agent_id: String },

    /// Record feedback on a past decision: correct or incorrect
    Feedback { decision_id: i64, verdict: String },

    /// Show recent decisions
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Show aggregate decision statistics
    Stats,

    /// Query the interaction log
    Log {
        /// Filter by agent id
        #[arg(long)]
        agent: Option<String>,
        /// Filter by session id
        #[arg(long)]
        session: Option<String>,
        /// Filter by entry kind (agent_request, manager_response, agent_output, system_event)
        #[arg(long)]
        kind: Option<String>,
        /// Free-text search over entry content (matches are shown newest first)
        #[arg(long)]
        search: Option<String>,
        /// Keep only the most recent N entries
        #[arg(long)]
        limit: Option<usize>,
    },

    /// List an agent's sessions
    Sessions { agent_id: String },

    /// Show or change the engine configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Check that the daemon is alive
    Ping,

    /// Ask the daemon to shut down gracefully
    Stop,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the current engine configuration
    Show,
    /// Update the engine configuration
    Set {
        /// Autonomy level: conservative, balanced, aggressive
        #[arg(long)]
        autonomy: Option<String>,
        /// Evaluation model identifier
        #[arg(long)]
        model: Option<String>,
    },
}
