//! Domain layer for overseer
//!
//! This crate contains the core business logic for supervising autonomous
//! coding agents. It has no dependencies on infrastructure or I/O concerns.
//!
//! # Core Concepts
//!
//! ## Agent lifecycle
//!
//! Every supervised agent moves through an explicit finite-state machine
//! ([`agent::entities::AgentStatus`]) with an exhaustive transition table.
//! Transitions are monotonic except the `Working` <-> `WaitingApproval`
//! cycle that mediates escalated tool requests.
//!
//! ## Risk and confidence
//!
//! - **Risk score**: estimated severity of a requested action, classified
//!   against an ordered, data-driven category table.
//! - **Confidence score**: learned estimate of the engine's own decision
//!   accuracy, derived from user feedback on past decisions.
//! - **Autonomy level**: named threshold profile controlling how readily
//!   requests are auto-approved.

pub mod agent;
pub mod approval;
pub mod config;
pub mod core;
pub mod interaction;

// Re-export commonly used types
pub use agent::{
    entities::{Agent, AgentStatus, Priority},
    value_objects::{AgentId, Budget, SessionId},
};
pub use approval::{
    autonomy::{AutonomyLevel, Thresholds},
    confidence::{FeedbackSample, confidence_from_history},
    entities::{
        ApprovalRequest, Decision, DecisionOutcome, Feedback, NewDecision, RequestKind,
        RequestStatus,
    },
    risk::{RiskAssessment, RiskCategory, RiskTable},
    rule::{EscalationReason, RuleInput, RuleOutcome, decide},
};
pub use config::{EngineConfig, KNOWN_EVALUATION_MODELS};
pub use core::error::DomainError;
pub use interaction::entities::{
    Direction, InteractionEntry, InteractionType, NewEntry, SessionSummary,
};
