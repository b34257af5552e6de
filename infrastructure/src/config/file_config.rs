//! Raw TOML configuration data types.
//!
//! These structs mirror the exact structure of `overseer.toml`. Everything
//! has a default so an empty (or missing) file is a valid configuration.
//! The autonomy level and evaluation model are deliberately absent here:
//! they are runtime-mutable and live in the state store.

use crate::process::AgentCommand;
use overseer_application::SupervisorLimits;
use overseer_domain::{RiskCategory, RiskTable};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Complete file configuration (raw TOML structure).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Daemon runtime settings
    pub daemon: FileDaemonConfig,
    /// Approval engine settings that are not runtime-mutable
    pub engine: FileEngineConfig,
    /// Advisory risk service endpoint
    pub risk_service: FileRiskServiceConfig,
    /// Operator notification hook
    pub notify: FileNotifyConfig,
    /// How agent subprocesses are invoked
    pub agent: FileAgentConfig,
    /// Optional risk keyword table override
    pub risk: FileRiskConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDaemonConfig {
    /// State store path; defaults to the platform data dir
    pub db_path: Option<PathBuf>,
    /// Control socket path; defaults to the platform runtime dir
    pub socket_path: Option<PathBuf>,
    /// Daemon log file; unset logs to stderr
    pub log_file: Option<PathBuf>,
    pub max_concurrent_agents: usize,
    pub restart_budget: u32,
    pub approval_timeout_secs: u64,
    /// Terminal agents older than this are archived by the housekeeping tick
    pub archive_after_hours: u64,
    /// Scheduling/housekeeping tick interval
    pub tick_secs: u64,
}

impl Default for FileDaemonConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            socket_path: None,
            log_file: None,
            max_concurrent_agents: 8,
            restart_budget: 3,
            approval_timeout_secs: 3600,
            archive_after_hours: 24,
            tick_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEngineConfig {
    /// When true, an advisory `deny` verdict downgrades a rule approval
    pub advisory_overrides_rule: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRiskServiceConfig {
    /// Endpoint URL; unset disables the advisory entirely
    pub url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for FileRiskServiceConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileNotifyConfig {
    /// Shell command run for operator notifications; unset disables them
    pub command: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for FileAgentConfig {
    fn default() -> Self {
        let command = AgentCommand::default();
        Self {
            program: command.program,
            args: command.args,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRiskConfig {
    /// When non-empty, replaces the built-in risk keyword table
    pub categories: Vec<FileRiskCategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRiskCategory {
    pub name: String,
    pub severity: f64,
    pub keywords: Vec<String>,
}

impl FileConfig {
    pub fn db_path(&self) -> PathBuf {
        self.daemon.db_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("overseer")
                .join("overseer.db")
        })
    }

    pub fn socket_path(&self) -> PathBuf {
        self.daemon.socket_path.clone().unwrap_or_else(|| {
            dirs::runtime_dir()
                .or_else(dirs::data_dir)
                .unwrap_or_else(|| PathBuf::from("."))
                .join("overseer")
                .join("overseer.sock")
        })
    }

    pub fn supervisor_limits(&self) -> SupervisorLimits {
        SupervisorLimits {
            max_concurrent_agents: self.daemon.max_concurrent_agents,
            restart_budget: self.daemon.restart_budget,
            approval_timeout: Duration::from_secs(self.daemon.approval_timeout_secs),
        }
    }

    pub fn agent_command(&self) -> AgentCommand {
        AgentCommand {
            program: self.agent.program.clone(),
            args: self.agent.args.clone(),
        }
    }

    /// The risk table to use: the file override when present, otherwise
    /// the built-in one.
    pub fn risk_table(&self) -> RiskTable {
        if self.risk.categories.is_empty() {
            return RiskTable::default();
        }
        RiskTable::new(
            self.risk
                .categories
                .iter()
                .map(|c| RiskCategory::new(
                    c.name.clone(),
                    c.severity,
                    &c.keywords.iter().map(String::as_str).collect::<Vec<_>>(),
                ))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_valid() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config.daemon.max_concurrent_agents, 8);
        assert_eq!(config.daemon.restart_budget, 3);
        assert!(config.risk_service.url.is_none());
        assert_eq!(config.agent.program, "claude");
    }

    #[test]
    fn test_partial_override() {
        let config: FileConfig = toml::from_str(
            r#"
            [daemon]
            max_concurrent_agents = 2

            [risk_service]
            url = "http://localhost:9900/evaluate"
            "#,
        )
        .unwrap();
        assert_eq!(config.daemon.max_concurrent_agents, 2);
        assert_eq!(config.daemon.restart_budget, 3);
        assert_eq!(
            config.risk_service.url.as_deref(),
            Some("http://localhost:9900/evaluate")
        );
    }

    #[test]
    fn test_risk_table_override() {
        let config: FileConfig = toml::from_str(
            r#"
            [[risk.categories]]
            name = "forbidden"
            severity = 1.0
            keywords = ["drop table"]

            [[risk.categories]]
            name = "fine"
            severity = 0.1
            keywords = ["ls"]
            "#,
        )
        .unwrap();
        let table = config.risk_table();
        assert_eq!(table.categories().len(), 2);
        assert_eq!(table.classify("drop table users").score, 1.0);
        // Unmatched payloads keep the moderate default.
        assert_eq!(table.classify("curl example.com").score, 0.5);
    }
}
