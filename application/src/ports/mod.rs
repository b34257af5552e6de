//! Ports (interfaces) for infrastructure adapters

pub mod agent_process;
pub mod notifier;
pub mod probability;
pub mod risk_evaluator;
pub mod store;
