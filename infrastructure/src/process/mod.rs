//! Agent subprocess adapters

mod claude;

pub use claude::{AgentCommand, ClaudeLauncher};
