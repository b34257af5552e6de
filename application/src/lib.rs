//! Application layer for overseer
//!
//! Use cases (the approval engine and the agent supervisor) plus the ports
//! they depend on. Adapters for the ports live in the infrastructure layer.

pub mod interaction_log;
pub mod ports;
#[cfg(test)]
pub(crate) mod testing;
pub mod use_cases;

pub use interaction_log::InteractionLogger;
pub use ports::{
    agent_process::{AgentEvent, AgentLauncher, AgentProcessHandle, ProcessError},
    notifier::{Notification, Notifier, NullNotifier},
    probability::{FixedProbability, ProbabilitySource},
    risk_evaluator::{AdvisoryVerdict, RiskAdvisory, RiskContext, RiskEvaluator, RiskServiceError},
    store::{
        AgentStore, ApprovalStore, ConfigStore, DecisionStore, DecisionTally, EntryFilter,
        InteractionStore, Store, StoreError,
    },
};
pub use use_cases::{
    evaluate_request::{ApprovalEngine, EngineError},
    stats::{StatsReport, compute_stats},
    supervisor::{Supervisor, SupervisorError, SupervisorLimits},
};
