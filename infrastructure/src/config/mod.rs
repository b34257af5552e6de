//! Daemon configuration: raw TOML types and the multi-source loader

mod file_config;
mod loader;

pub use file_config::{
    FileAgentConfig, FileConfig, FileDaemonConfig, FileEngineConfig, FileNotifyConfig,
    FileRiskCategory, FileRiskConfig, FileRiskServiceConfig,
};
pub use loader::ConfigLoader;
