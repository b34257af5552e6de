//! Agent value objects

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Unique identifier for a supervised agent.
///
/// Short token form: the first 8 hex characters of a UUIDv4, which keeps
/// log lines and CLI output readable while staying unique enough for a
/// single-host daemon.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the short agent id from a full UUID string.
    pub fn from_uuid(uuid: &str) -> Self {
        Self(uuid.chars().take(8).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AgentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a time-bounded, agent-scoped group of interaction log
/// entries. Session boundaries are caller-determined: the supervisor mints
/// a new id whenever an agent enters a new major phase (spawn, restart).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monetary budget for one agent: a fixed ceiling plus the amount spent
/// so far. Both are non-negative by construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    ceiling: f64,
    spent: f64,
}

impl Budget {
    /// Fraction of the ceiling above which non-trivial spending escalates.
    pub const GUARD_RATIO: f64 = 0.8;

    pub fn new(ceiling: f64) -> Result<Self, DomainError> {
        if ceiling < 0.0 {
            return Err(DomainError::NegativeBudget(ceiling));
        }
        Ok(Self {
            ceiling,
            spent: 0.0,
        })
    }

    /// Restore a budget from persisted values.
    pub fn restore(ceiling: f64, spent: f64) -> Result<Self, DomainError> {
        if ceiling < 0.0 {
            return Err(DomainError::NegativeBudget(ceiling));
        }
        if spent < 0.0 {
            return Err(DomainError::NegativeBudget(spent));
        }
        Ok(Self { ceiling, spent })
    }

    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    pub fn spent(&self) -> f64 {
        self.spent
    }

    pub fn remaining(&self) -> f64 {
        (self.ceiling - self.spent).max(0.0)
    }

    /// Fraction of the ceiling consumed, in `[0, 1]`. A zero ceiling counts
    /// as fully consumed.
    pub fn spent_ratio(&self) -> f64 {
        if self.ceiling <= 0.0 {
            return 1.0;
        }
        (self.spent / self.ceiling).min(1.0)
    }

    /// Record spending. Saturates at zero remaining rather than going
    /// negative.
    pub fn record_spend(&mut self, amount: f64) {
        if amount > 0.0 {
            self.spent += amount;
        }
    }

    /// True once the budget-guard threshold (80% of ceiling) is crossed.
    pub fn guard_active(&self) -> bool {
        self.spent_ratio() >= Self::GUARD_RATIO
    }
}
