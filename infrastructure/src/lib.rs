//! Infrastructure layer for overseer
//!
//! Adapters behind the application layer's ports: the SQLite state store,
//! the agent subprocess launcher, the Unix socket control plane, the HTTP
//! advisory client, the notify-command runner, and configuration loading.

pub mod config;
pub mod control;
pub mod notify;
pub mod probability;
pub mod process;
pub mod risk;
pub mod store;

pub use config::{ConfigLoader, FileConfig};
pub use control::{ControlClient, ControlErrorCode, ControlRequest, ControlResponse, ControlServer};
pub use notify::CommandNotifier;
pub use probability::StdRngProbability;
pub use process::ClaudeLauncher;
pub use risk::HttpRiskEvaluator;
pub use store::SqliteStore;
